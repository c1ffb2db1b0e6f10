pub mod page_client;
pub mod url_list;

pub use page_client::PageClient;
pub use url_list::load_url_list;

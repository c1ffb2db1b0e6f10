pub mod batch;
pub mod worker;

pub use batch::BatchPool;

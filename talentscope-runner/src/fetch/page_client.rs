use anyhow::{anyhow, Result};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct PageSummary {
    pub url: String,
    pub status: u16,
    pub bytes: usize,
    pub elapsed: Duration,
}

/// Thin HTTP client for pulling candidate homepages and source pages.
#[derive(Clone)]
pub struct PageClient {
    client: Client,
}

impl PageClient {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &str) -> Result<PageSummary> {
        debug!("Fetching {}", url);
        let started = Instant::now();

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("HTTP error: {}", status));
        }

        let body = response.bytes().await?;

        Ok(PageSummary {
            url: url.to_string(),
            status: status.as_u16(),
            bytes: body.len(),
            elapsed: started.elapsed(),
        })
    }
}

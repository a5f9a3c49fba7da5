use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::debug;

use crate::error::FetchError;

/// Where notice pages come from. One request per call, no retries.
pub trait PageSource {
    fn fetch_page(&self, page: u32) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Fetches board pages over HTTP from a `{page}` URL template.
pub struct HttpFetcher {
    client: Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: &str, timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    pub fn page_url(&self, page: u32) -> String {
        self.base_url.replace("{page}", &page.to_string())
    }
}

impl PageSource for HttpFetcher {
    async fn fetch_page(&self, page: u32) -> Result<String, FetchError> {
        let url = self.page_url(page);
        debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

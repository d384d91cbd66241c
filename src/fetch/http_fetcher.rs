use std::time::Duration;

use tracing::{info, warn};

use crate::error::{ArchiveError, Result};
use crate::utils::constants::{
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_RETRY_COUNT, DEFAULT_RETRY_WAIT_SECS, SWISSMETNET_URL,
};

/// Downloads the current ten-minute values from the MeteoSwiss open data endpoint.
pub struct HttpFetcher {
    url: String,
    timeout: Duration,
    retry_count: u32,
    retry_wait: Duration,
}

impl HttpFetcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            retry_count: DEFAULT_RETRY_COUNT,
            retry_wait: Duration::from_secs(DEFAULT_RETRY_WAIT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Number of additional attempts after the first failure.
    pub fn with_retries(mut self, retry_count: u32, retry_wait: Duration) -> Self {
        self.retry_count = retry_count;
        self.retry_wait = retry_wait;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the response body, retrying failed attempts after a fixed wait.
    pub async fn fetch(&self) -> Result<Vec<u8>> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ArchiveError::UpstreamFetch {
                attempts: 0,
                message: e.to_string(),
            })?;

        let attempts = self.retry_count + 1;
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match self.fetch_once(&client).await {
                Ok(body) => {
                    info!("Downloaded {} bytes from {}", body.len(), self.url);
                    return Ok(body);
                }
                Err(e) => {
                    warn!(
                        "Download attempt {}/{} from {} failed: {}",
                        attempt, attempts, self.url, e
                    );
                    last_error = e.to_string();
                    if attempt < attempts {
                        tokio::time::sleep(self.retry_wait).await;
                    }
                }
            }
        }

        Err(ArchiveError::UpstreamFetch {
            attempts,
            message: last_error,
        })
    }

    async fn fetch_once(&self, client: &reqwest::Client) -> reqwest::Result<Vec<u8>> {
        let response = client.get(&self.url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(SWISSMETNET_URL)
    }
}

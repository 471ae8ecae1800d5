use std::time::Duration;

use {tracing::debug, url::Url};

use crate::error::Result;

/// Fetches page markup for the scraping strategies.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl PageFetcher {
    #[must_use]
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// The page body, or `None` when the server answers with anything other
    /// than 200. Transport failures are errors.
    pub async fn get(&self, url: &Url) -> Result<Option<String>> {
        let response = self
            .client
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            debug!(%url, %status, "page not available");
            return Ok(None);
        }
        let body = response.text().await?;
        debug!(%url, bytes = body.len(), "page fetched");
        Ok(Some(body))
    }
}

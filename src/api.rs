use std::time::Duration;

use anyhow::{Context, Result};

use crate::{config::NetworkConfig, error::LoadError, model::HistoricalData};

/// Client for a public JSON document holding occupancy data in the store's
/// own shape (`{ "YYYY-MM-DD": { "<category>": n } }`).
#[derive(Clone, Debug)]
pub struct PublicDataClient {
    client: reqwest::Client,
    url: String,
}

impl PublicDataClient {
    /// Create a new client with configurable timeouts.
    pub fn new(url: impl Into<String>, network_config: &NetworkConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(network_config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(network_config.connect_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the whole document. Single GET, no retry.
    pub async fn fetch_store(&self) -> Result<HistoricalData, LoadError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| LoadError::RemoteFetchFailed(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::RemoteFetchFailed(format!(
                "server returned status {status}"
            )));
        }

        let data = response
            .json::<HistoricalData>()
            .await
            .map_err(|e| LoadError::RemoteFetchFailed(format!("invalid document: {e}")))?;

        tracing::debug!("Fetched {} dates from {}", data.len(), self.url);
        Ok(data)
    }
}

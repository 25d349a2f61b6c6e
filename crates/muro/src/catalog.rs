//! # Catalog Client
//!
//! Fetches the remote catalog: a JSON array of records pointing at the
//! original image URLs. Transient failures (transport errors, 5xx) are
//! retried a bounded number of times with exponential delay; after the
//! budget is exhausted the error is surfaced to the caller rather than
//! masked as an empty catalog.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::DownloadError;

/// One catalog record. Only `original` matters for caching; it is the
/// cache key.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CatalogItem {
    pub id: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub category: String,
    /// URL of the full-resolution image
    pub original: String,
}

/// Configuration for catalog fetches
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Endpoint returning the JSON catalog
    pub url: String,
    /// Total attempts before giving up
    pub max_attempts: u32,
    /// Base delay, doubled after each failed attempt
    pub retry_delay_base: Duration,
}

impl CatalogConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_attempts: 3,
            retry_delay_base: Duration::from_millis(500),
        }
    }
}

pub struct CatalogClient {
    client: Client,
    config: CatalogConfig,
}

impl CatalogClient {
    pub fn new(client: Client, config: CatalogConfig) -> Self {
        Self { client, config }
    }

    /// Fetch the catalog with retry on transient failures.
    /// Client errors (4xx) fail fast; they will not improve on retry.
    pub async fn fetch(&self) -> Result<Vec<CatalogItem>, DownloadError> {
        let mut attempts = 0;
        loop {
            attempts += 1;

            let last_error = match self.client.get(&self.config.url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let items = response.json::<Vec<CatalogItem>>().await?;
                        debug!(count = items.len(), "Fetched catalog");
                        return Ok(items);
                    }
                    if status.is_client_error() {
                        return Err(DownloadError::StatusCode(status));
                    }
                    format!("server returned status {status}")
                }
                Err(e) => {
                    if !e.is_connect() && !e.is_timeout() && !e.is_request() {
                        return Err(DownloadError::HttpError(e));
                    }
                    e.to_string()
                }
            };

            if attempts >= self.config.max_attempts {
                return Err(DownloadError::CatalogExhausted {
                    attempts,
                    reason: last_error,
                });
            }

            let delay = self.config.retry_delay_base * 2_u32.pow(attempts - 1);
            warn!(
                attempt = attempts,
                max = self.config.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %last_error,
                "Catalog fetch failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

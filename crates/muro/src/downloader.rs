//! # Image Downloader
//!
//! Streams one remote image to local storage with a bounded timeout,
//! partial-file cleanup on failure, and a post-write integrity check.
//! The cache pre-check makes `download` idempotent: a fresh cached file
//! short-circuits the network entirely.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use reqwest::{Client, Url};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::DownloadError;
use crate::cache::CacheManager;
use crate::config::DownloaderConfig;

/// Create a reqwest Client with the provided configuration
pub fn create_client(config: &DownloaderConfig) -> Result<Client, DownloadError> {
    Client::builder()
        .pool_max_idle_per_host(5)
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .redirect(if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        })
        .build()
        .map_err(DownloadError::from)
}

/// Downloader for individual images, backed by the shared cache.
pub struct ImageDownloader {
    client: Client,
    cache: Arc<CacheManager>,
}

impl ImageDownloader {
    /// Create a new downloader with default configuration
    pub fn new(cache: Arc<CacheManager>) -> Result<Self, DownloadError> {
        Self::with_config(cache, DownloaderConfig::default())
    }

    /// Create a new downloader with custom configuration
    pub fn with_config(
        cache: Arc<CacheManager>,
        config: DownloaderConfig,
    ) -> Result<Self, DownloadError> {
        let client = create_client(&config)?;
        Ok(Self { client, cache })
    }

    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    /// Download a remote image to its fingerprinted local path.
    ///
    /// Returns the existing path without any network call when the cache
    /// holds a fresh copy. On any failure the fingerprinted path is left
    /// untouched and no partial artifact remains on disk.
    #[instrument(skip(self), level = "debug")]
    pub async fn download(&self, url_str: &str) -> Result<PathBuf, DownloadError> {
        if self.cache.exists(url_str).await {
            let path = self.cache.path_for(url_str);
            debug!(url = %url_str, path = ?path, "Cache hit, skipping download");
            return Ok(path);
        }

        let url = url_str
            .parse::<Url>()
            .map_err(|e| DownloadError::UrlError(format!("{url_str}: {e}")))?;

        let final_path = self.cache.path_for(url_str);
        let part_path = final_path.with_extension("part");

        let size = match self.stream_to_file(&url, &part_path).await {
            Ok(size) => size,
            Err(e) => {
                // Never leave a partial artifact behind.
                let _ = fs::remove_file(&part_path).await;
                return Err(e);
            }
        };

        // Guards against servers returning 200 with an empty body.
        if size == 0 {
            let _ = fs::remove_file(&part_path).await;
            return Err(DownloadError::EmptyDownload(final_path));
        }

        if let Err(e) = fs::rename(&part_path, &final_path).await {
            warn!(from = ?part_path, to = ?final_path, error = %e, "Failed to finalize download");
            let _ = fs::remove_file(&part_path).await;
            return Err(e.into());
        }

        self.cache
            .record_download(url_str, final_path.clone(), size)
            .await;

        info!(url = %url_str, path = ?final_path, size, "Downloaded image");
        Ok(final_path)
    }

    /// Issue the GET and pipe the response body to `path` chunk by chunk,
    /// never buffering the whole payload in memory.
    async fn stream_to_file(&self, url: &Url, path: &Path) -> Result<u64, DownloadError> {
        let response = self.client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(DownloadError::StatusCode(response.status()));
        }

        if let Some(content_length) = response.content_length() {
            debug!(url = %url, size = content_length, "Download size information available");
        }

        let mut stream = response.bytes_stream();
        let mut file = fs::File::create(path).await?;
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        Ok(written)
    }
}

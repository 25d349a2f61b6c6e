//! # Batch Orchestrator
//!
//! Drives the downloader over a list of items strictly sequentially,
//! pacing requests with a fixed inter-item delay and reporting progress
//! after every item. A failed item never aborts the batch; its failure is
//! captured in the per-item result.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::downloader::ImageDownloader;

/// One unit of work: a catalog id and the image it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub id: String,
    pub image_url: String,
}

impl BatchItem {
    pub fn new(id: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            image_url: image_url.into(),
        }
    }
}

/// Per-item outcome. Failure is encoded here, never thrown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub id: String,
    pub image_url: String,
    /// Local path of the cached file, present only on success
    pub local_path: Option<PathBuf>,
    pub cached: bool,
    pub error: Option<String>,
}

/// Progress snapshot fired synchronously from within the batch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}

/// Callback invoked after every item, success or failure.
pub type ProgressCallback = Arc<dyn Fn(BatchProgress) + Send + Sync>;

/// Configuration for a batch run
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Pause between two downloads (never after the last), to avoid
    /// hammering the origin server
    pub inter_item_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            inter_item_delay: Duration::from_secs(1),
        }
    }
}

/// Sequential batch pipeline over an [`ImageDownloader`].
pub struct BatchDownloader {
    downloader: Arc<ImageDownloader>,
    config: BatchConfig,
    cancel: CancellationToken,
}

impl BatchDownloader {
    pub fn new(downloader: Arc<ImageDownloader>) -> Self {
        Self::with_config(downloader, BatchConfig::default())
    }

    pub fn with_config(downloader: Arc<ImageDownloader>, config: BatchConfig) -> Self {
        Self {
            downloader,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops the batch before its next item when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the batch, one item at a time, in input order.
    ///
    /// Returns one result per input item in the same order. The progress
    /// callback fires after every attempted item with monotonically
    /// increasing `completed`. Items skipped by cancellation are returned
    /// as failures without a progress callback.
    pub async fn run(
        &self,
        items: Vec<BatchItem>,
        on_progress: Option<ProgressCallback>,
    ) -> Vec<BatchResult> {
        let total = items.len();
        let mut results = Vec::with_capacity(total);
        let mut cancelled = false;

        for (index, item) in items.into_iter().enumerate() {
            if cancelled || self.cancel.is_cancelled() {
                if !cancelled {
                    debug!(completed = index, total, "Batch cancelled, skipping remaining items");
                    cancelled = true;
                }
                results.push(BatchResult {
                    id: item.id,
                    image_url: item.image_url,
                    local_path: None,
                    cached: false,
                    error: Some("batch cancelled".to_string()),
                });
                continue;
            }

            // Pacing applies between downloads, not before the first one.
            if index > 0 {
                sleep(self.config.inter_item_delay).await;
            }

            let result = match self.downloader.download(&item.image_url).await {
                Ok(local_path) => BatchResult {
                    id: item.id,
                    image_url: item.image_url,
                    local_path: Some(local_path),
                    cached: true,
                    error: None,
                },
                Err(e) => {
                    warn!(
                        id = %item.id,
                        url = %item.image_url,
                        error = %e,
                        transient = e.is_transient(),
                        "Batch item failed"
                    );
                    BatchResult {
                        id: item.id,
                        image_url: item.image_url,
                        local_path: None,
                        cached: false,
                        error: Some(e.to_string()),
                    }
                }
            };

            results.push(result);

            if let Some(callback) = &on_progress {
                callback(BatchProgress {
                    completed: index + 1,
                    total,
                });
            }
        }

        results
    }
}

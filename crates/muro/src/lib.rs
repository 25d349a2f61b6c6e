//! # Muro
//!
//! A library for caching remote wallpaper images as durable, verified
//! local files. Downloads stream straight to disk, are validated and
//! named by a content-addressed fingerprint of their source URL, and
//! expire on a fixed TTL.
//!
//! ## Features
//!
//! - Content-addressed cache with a persisted JSON metadata store
//! - Streaming downloads with partial-file cleanup on failure
//! - TTL-based retention with explicit classify/reconcile steps
//! - Throttled sequential batch pipeline with progress reporting
//! - Catalog client with bounded retry

pub mod batch;
pub mod builder;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod downloader;
pub mod error;
pub mod fingerprint;

pub use builder::DownloaderConfigBuilder;
pub use cache::{CacheConfig, CacheEntry, CacheManager, CacheStats, Classification};
pub use config::DownloaderConfig;
pub use error::DownloadError;

// Re-export the batch pipeline types
pub use batch::{
    BatchConfig, BatchDownloader, BatchItem, BatchProgress, BatchResult, ProgressCallback,
};

// Re-export catalog types
pub use catalog::{CatalogClient, CatalogConfig, CatalogItem};

// Re-export downloader utilities
pub use downloader::{ImageDownloader, create_client};

// Re-export the fingerprint function
pub use fingerprint::fingerprint;

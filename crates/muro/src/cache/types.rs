//! # Cache Types
//!
//! Common types used across the caching system.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Name of the metadata snapshot file inside the cache directory.
pub const METADATA_FILE: &str = "metadata.json";

/// Classification of a cached resource, as a pure query.
///
/// Separated from the reconcile action so callers can ask about state
/// without triggering deletion as a side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// File present, non-empty, within its TTL
    Fresh,
    /// File present but older than the TTL (or its age is unknown)
    Stale,
    /// No file at the fingerprinted path
    Missing,
    /// Zero-byte file, left by an interrupted download
    Corrupt,
}

/// One persisted cache record, keyed by source URL in the metadata store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    /// The remote resource address, primary key
    pub source_url: String,
    /// Absolute path to the cached file on disk
    pub local_path: PathBuf,
    /// Unix epoch seconds of the last successful byte write
    pub downloaded_at: u64,
    /// Size of the cached file in bytes; zero is never valid
    pub size: u64,
}

impl CacheEntry {
    pub fn new(source_url: impl Into<String>, local_path: PathBuf, size: u64) -> Self {
        Self {
            source_url: source_url.into(),
            local_path,
            downloaded_at: unix_now(),
            size,
        }
    }

    /// Check expiry against an explicit clock value, so the boundary
    /// is testable without waiting out the TTL.
    pub fn is_expired_at(&self, now: u64, ttl: Duration) -> bool {
        now.saturating_sub(self.downloaded_at) > ttl.as_secs()
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.is_expired_at(unix_now(), ttl)
    }
}

/// Current wall clock as Unix epoch seconds.
pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Aggregate cache statistics, recomputed on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of cached image files (metadata file excluded)
    pub total_entries: u64,
    /// Sum of their sizes in bytes
    pub total_bytes: u64,
}

/// Configuration for the cache system
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory owning all cached files plus the metadata file.
    /// If None, a directory under the system temp dir is used.
    pub cache_dir: Option<PathBuf>,
    /// Maximum age before a cached entry is considered stale
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            ttl: Duration::from_secs(7 * 24 * 3600), // 7 days
        }
    }
}

//! # Cache Manager
//!
//! Owns the cache directory and the metadata store, and implements the
//! retention policy (classify / reconcile / purge) and the administrative
//! operations (stats / clear).

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs;
use tokio::io;
use tracing::{debug, warn};

use crate::cache::store::MetadataStore;
use crate::cache::types::{CacheConfig, CacheEntry, CacheStats, Classification, unix_now};
use crate::fingerprint::fingerprint;

pub struct CacheManager {
    cache_dir: PathBuf,
    ttl: Duration,
    store: MetadataStore,
}

impl CacheManager {
    /// Create a new cache manager, creating the cache directory if absent.
    pub async fn new(mut config: CacheConfig) -> io::Result<Self> {
        // If no cache path provided, use system temp
        if config.cache_dir.is_none() {
            config.cache_dir = Some(std::env::temp_dir().join("muro-cache"));
        }

        let cache_dir = config.cache_dir.unwrap();
        fs::create_dir_all(&cache_dir).await?;

        let store = MetadataStore::new(&cache_dir);

        Ok(Self {
            cache_dir,
            ttl: config.ttl,
            store,
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    /// The fingerprinted local path for a source URL. Side-effect-free.
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.cache_dir.join(fingerprint(url))
    }

    /// Classify the cache state for a URL without mutating anything.
    pub async fn classify(&self, url: &str) -> Classification {
        self.classify_at(url, unix_now()).await
    }

    /// Classification against an explicit clock, for deterministic tests.
    pub(crate) async fn classify_at(&self, url: &str, now: u64) -> Classification {
        let path = self.path_for(url);

        let meta = match fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(_) => return Classification::Missing,
        };

        if meta.len() == 0 {
            return Classification::Corrupt;
        }

        // A file with no metadata entry has unknown age; fail safe
        // toward re-fetching rather than trusting it.
        match self.store.get(url).await {
            Some(entry) if !entry.is_expired_at(now, self.ttl) => Classification::Fresh,
            _ => Classification::Stale,
        }
    }

    /// Apply the retention policy: delete stale or corrupt artifacts and
    /// drop their metadata. Returns the classification that was observed
    /// before any deletion.
    pub async fn reconcile(&self, url: &str) -> io::Result<Classification> {
        let state = self.classify(url).await;

        match state {
            Classification::Fresh | Classification::Missing => {}
            Classification::Stale | Classification::Corrupt => {
                let path = self.path_for(url);
                debug!(url = %url, state = ?state, path = ?path, "Removing invalid cache artifact");
                match fs::remove_file(&path).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e),
                }
                self.store.remove(url).await;
            }
        }

        Ok(state)
    }

    /// True only when a fresh cached file exists. Stale and corrupt
    /// artifacts are removed on the way, so a `true` answer always points
    /// at a usable file.
    pub async fn exists(&self, url: &str) -> bool {
        matches!(self.reconcile(url).await, Ok(Classification::Fresh))
    }

    /// Resolve a URL to its cached local path, if fresh. Pure query:
    /// never deletes anything.
    pub async fn resolve(&self, url: &str) -> Option<PathBuf> {
        match self.classify(url).await {
            Classification::Fresh => Some(self.path_for(url)),
            _ => None,
        }
    }

    /// Record a completed download in the metadata store.
    pub async fn record_download(&self, url: &str, path: PathBuf, size: u64) {
        self.store
            .insert(CacheEntry {
                source_url: url.to_string(),
                local_path: path,
                downloaded_at: unix_now(),
                size,
            })
            .await;
    }

    /// Sweep every known metadata entry, deleting expired or invalid ones.
    /// Returns how many entries were removed. Intended to run around batch
    /// sessions, not on every access.
    pub async fn purge_expired(&self) -> io::Result<usize> {
        let entries = self.store.read().await;
        let now = unix_now();
        let mut removed = Vec::new();

        for url in entries.keys() {
            let state = self.classify_at(url, now).await;
            match state {
                Classification::Fresh => {}
                Classification::Missing => {
                    // Dangling entry: file already gone, drop the record.
                    removed.push(url.clone());
                }
                Classification::Stale | Classification::Corrupt => {
                    let path = self.path_for(url);
                    match fs::remove_file(&path).await {
                        Ok(()) => {}
                        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                        Err(e) => {
                            warn!(url = %url, path = ?path, error = %e, "Failed to remove expired cache file");
                            continue;
                        }
                    }
                    removed.push(url.clone());
                }
            }
        }

        let count = removed.len();
        if count > 0 {
            self.store
                .update(|entries| {
                    for url in &removed {
                        entries.remove(url);
                    }
                })
                .await;
            debug!(count, "Purged expired cache entries");
        }

        Ok(count)
    }

    /// Aggregate statistics, recomputed by enumerating the cache directory.
    /// Files that cannot be stat'd are skipped rather than failing the call.
    pub async fn stats(&self) -> io::Result<CacheStats> {
        let mut stats = CacheStats::default();

        let mut entries = match fs::read_dir(&self.cache_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(stats),
            Err(e) => return Err(e),
        };

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name() == crate::cache::types::METADATA_FILE {
                continue;
            }
            match entry.metadata().await {
                Ok(meta) if meta.is_file() => {
                    stats.total_entries += 1;
                    stats.total_bytes += meta.len();
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(path = ?entry.path(), error = %e, "Skipping unreadable cache file in stats");
                }
            }
        }

        Ok(stats)
    }

    /// Delete every file in the cache directory individually, skipping
    /// files that refuse to go (e.g. locked by another process), then make
    /// sure the directory itself still exists. The metadata file is removed
    /// along with the rest, so a subsequent read yields an empty mapping.
    pub async fn clear_all(&self) -> io::Result<()> {
        let mut entries = match fs::read_dir(&self.cache_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return fs::create_dir_all(&self.cache_dir).await;
            }
            Err(e) => return Err(e),
        };

        let mut removed = 0u64;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let result = if path.is_dir() {
                fs::remove_dir_all(&path).await
            } else {
                fs::remove_file(&path).await
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) => {
                    warn!(path = ?path, error = %e, "Failed to remove cache entry, skipping");
                }
            }
        }

        debug!(count = removed, "Cleared cache entries");
        fs::create_dir_all(&self.cache_dir).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const WEEK_SECS: u64 = 7 * 24 * 3600;

    async fn manager(dir: &Path) -> CacheManager {
        CacheManager::new(CacheConfig {
            cache_dir: Some(dir.to_path_buf()),
            ..CacheConfig::default()
        })
        .await
        .unwrap()
    }

    /// Simulate a completed download: write bytes at the fingerprinted
    /// path and record the entry.
    async fn seed(cache: &CacheManager, url: &str, bytes: &[u8]) -> PathBuf {
        let path = cache.path_for(url);
        tokio::fs::write(&path, bytes).await.unwrap();
        cache
            .record_download(url, path.clone(), bytes.len() as u64)
            .await;
        path
    }

    #[tokio::test]
    async fn classify_missing_when_nothing_cached() {
        let dir = tempdir().unwrap();
        let cache = manager(dir.path()).await;
        let state = cache.classify("https://example.com/a.jpg").await;
        assert_eq!(state, Classification::Missing);
    }

    #[tokio::test]
    async fn classify_fresh_after_download() {
        let dir = tempdir().unwrap();
        let cache = manager(dir.path()).await;
        seed(&cache, "https://example.com/a.jpg", b"pixels").await;

        let state = cache.classify("https://example.com/a.jpg").await;
        assert_eq!(state, Classification::Fresh);
    }

    #[tokio::test]
    async fn classify_corrupt_for_zero_byte_file() {
        let dir = tempdir().unwrap();
        let cache = manager(dir.path()).await;
        let url = "https://example.com/a.jpg";
        seed(&cache, url, b"pixels").await;

        // Truncate in place, as an interrupted download would leave it.
        tokio::fs::write(cache.path_for(url), b"").await.unwrap();

        assert_eq!(cache.classify(url).await, Classification::Corrupt);
        // The pure query must not have removed anything.
        assert!(cache.path_for(url).exists());
    }

    #[tokio::test]
    async fn classify_stale_without_metadata_entry() {
        let dir = tempdir().unwrap();
        let cache = manager(dir.path()).await;
        let url = "https://example.com/a.jpg";
        // File on disk but never recorded: age unknown.
        tokio::fs::write(cache.path_for(url), b"pixels")
            .await
            .unwrap();

        assert_eq!(cache.classify(url).await, Classification::Stale);
    }

    #[tokio::test]
    async fn classify_stale_past_ttl_boundary() {
        let dir = tempdir().unwrap();
        let cache = manager(dir.path()).await;
        let url = "https://example.com/a.jpg";
        seed(&cache, url, b"pixels").await;

        let entry = cache.store().get(url).await.unwrap();
        let fresh_at = entry.downloaded_at + WEEK_SECS - 1;
        let stale_at = entry.downloaded_at + WEEK_SECS + 1;

        assert_eq!(cache.classify_at(url, fresh_at).await, Classification::Fresh);
        assert_eq!(cache.classify_at(url, stale_at).await, Classification::Stale);
    }

    #[tokio::test]
    async fn reconcile_removes_corrupt_file_and_entry() {
        let dir = tempdir().unwrap();
        let cache = manager(dir.path()).await;
        let url = "https://example.com/a.jpg";
        let path = seed(&cache, url, b"pixels").await;
        tokio::fs::write(&path, b"").await.unwrap();

        let observed = cache.reconcile(url).await.unwrap();
        assert_eq!(observed, Classification::Corrupt);
        assert!(!path.exists());
        assert!(cache.store().get(url).await.is_none());
        assert!(!cache.exists(url).await);
    }

    #[tokio::test]
    async fn exists_true_only_for_fresh() {
        let dir = tempdir().unwrap();
        let cache = manager(dir.path()).await;
        let url = "https://example.com/a.jpg";

        assert!(!cache.exists(url).await);
        seed(&cache, url, b"pixels").await;
        assert!(cache.exists(url).await);
    }

    #[tokio::test]
    async fn resolve_returns_path_for_fresh_and_none_otherwise() {
        let dir = tempdir().unwrap();
        let cache = manager(dir.path()).await;
        let url = "https://example.com/a.jpg";

        assert!(cache.resolve(url).await.is_none());
        let path = seed(&cache, url, b"pixels").await;
        assert_eq!(cache.resolve(url).await, Some(path));
    }

    #[tokio::test]
    async fn purge_removes_expired_and_dangling_entries() {
        let dir = tempdir().unwrap();
        let cache = manager(dir.path()).await;

        let fresh_url = "https://example.com/fresh.jpg";
        let old_url = "https://example.com/old.jpg";
        let gone_url = "https://example.com/gone.jpg";

        seed(&cache, fresh_url, b"fresh").await;
        let old_path = seed(&cache, old_url, b"old").await;
        let gone_path = seed(&cache, gone_url, b"gone").await;

        // Age the second entry past the TTL and delete the third file
        // out from under its entry.
        cache
            .store()
            .update(|entries| {
                let e = entries.get_mut(old_url).unwrap();
                e.downloaded_at -= WEEK_SECS + 60;
            })
            .await;
        tokio::fs::remove_file(&gone_path).await.unwrap();

        let removed = cache.purge_expired().await.unwrap();
        assert_eq!(removed, 2);
        assert!(!old_path.exists());
        assert!(cache.store().get(fresh_url).await.is_some());
        assert!(cache.store().get(old_url).await.is_none());
        assert!(cache.store().get(gone_url).await.is_none());
    }

    #[tokio::test]
    async fn stats_counts_files_excluding_metadata() {
        let dir = tempdir().unwrap();
        let cache = manager(dir.path()).await;
        seed(&cache, "https://example.com/a.jpg", b"12345").await;
        seed(&cache, "https://example.com/b.jpg", b"123").await;

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.total_bytes, 8);
    }

    #[tokio::test]
    async fn clear_all_empties_cache_and_metadata() {
        let dir = tempdir().unwrap();
        let cache = manager(dir.path()).await;
        let url = "https://example.com/a.jpg";
        seed(&cache, url, b"pixels").await;

        cache.clear_all().await.unwrap();

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.total_bytes, 0);
        assert!(!cache.exists(url).await);
        assert!(cache.store().read().await.is_empty());
        assert!(cache.cache_dir().exists());
    }
}

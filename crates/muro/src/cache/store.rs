//! # Metadata Store
//!
//! Durable mapping from source URL to [`CacheEntry`], backed by a single
//! JSON file with whole-file read/write semantics. Reads degrade to an
//! empty mapping when the file is absent or unparsable; writes go through
//! a temp file and rename. All mutations are read-modify-write snapshots
//! serialized through one mutex, so within a process the last write wins
//! by construction rather than by accident.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cache::types::{CacheEntry, METADATA_FILE};

pub struct MetadataStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles across tasks.
    write_lock: Mutex<()>,
}

impl MetadataStore {
    /// Create a store backed by `metadata.json` inside the cache directory.
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            path: cache_dir.join(METADATA_FILE),
            write_lock: Mutex::new(()),
        }
    }

    /// Read the full snapshot. An absent or corrupt file yields an empty
    /// mapping; the system degrades to "no metadata known" instead of
    /// failing the caller.
    pub async fn read(&self) -> HashMap<String, CacheEntry> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return HashMap::new(),
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Failed to read metadata file");
                return HashMap::new();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(map) => map,
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Failed to parse metadata file, treating as empty");
                HashMap::new()
            }
        }
    }

    /// Serialize the entire mapping, temp file first then rename.
    async fn write(&self, entries: &HashMap<String, CacheEntry>) -> io::Result<()> {
        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &json).await?;

        if let Err(e) = fs::rename(&temp_path, &self.path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        debug!(path = ?self.path, entries = entries.len(), "Wrote metadata snapshot");
        Ok(())
    }

    /// Read-modify-write the full snapshot under the store lock.
    /// Write failures are logged and absorbed: the next read simply will
    /// not see the update.
    pub async fn update<F>(&self, mutate: F)
    where
        F: FnOnce(&mut HashMap<String, CacheEntry>),
    {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.read().await;
        mutate(&mut entries);

        if let Err(e) = self.write(&entries).await {
            warn!(path = ?self.path, error = %e, "Failed to persist metadata update");
        }
    }

    /// Record a completed download.
    pub async fn insert(&self, entry: CacheEntry) {
        self.update(|entries| {
            entries.insert(entry.source_url.clone(), entry);
        })
        .await;
    }

    /// Look up a single entry.
    pub async fn get(&self, url: &str) -> Option<CacheEntry> {
        self.read().await.remove(url)
    }

    /// Drop a single entry.
    pub async fn remove(&self, url: &str) {
        self.update(|entries| {
            entries.remove(url);
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(url: &str, size: u64) -> CacheEntry {
        CacheEntry::new(url, PathBuf::from(format!("/cache/{size}.jpg")), size)
    }

    #[tokio::test]
    async fn read_missing_file_yields_empty_map() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::new(dir.path());
        assert!(store.read().await.is_empty());
    }

    #[tokio::test]
    async fn read_corrupt_file_yields_empty_map() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(METADATA_FILE), b"{not json!").unwrap();

        let store = MetadataStore::new(dir.path());
        assert!(store.read().await.is_empty());
    }

    #[tokio::test]
    async fn insert_then_get_roundtrips() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::new(dir.path());

        let e = entry("https://example.com/a.jpg", 1024);
        store.insert(e.clone()).await;

        let got = store.get("https://example.com/a.jpg").await.unwrap();
        assert_eq!(got, e);
    }

    #[tokio::test]
    async fn insert_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = MetadataStore::new(dir.path());
            store.insert(entry("https://example.com/a.jpg", 7)).await;
        }

        let reopened = MetadataStore::new(dir.path());
        assert!(reopened.get("https://example.com/a.jpg").await.is_some());
    }

    #[tokio::test]
    async fn remove_deletes_only_that_key() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::new(dir.path());
        store.insert(entry("https://example.com/a.jpg", 1)).await;
        store.insert(entry("https://example.com/b.jpg", 2)).await;

        store.remove("https://example.com/a.jpg").await;

        assert!(store.get("https://example.com/a.jpg").await.is_none());
        assert!(store.get("https://example.com/b.jpg").await.is_some());
    }

    #[tokio::test]
    async fn last_write_wins_on_same_key() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::new(dir.path());

        store.insert(entry("https://example.com/a.jpg", 1)).await;
        store.insert(entry("https://example.com/a.jpg", 2)).await;

        let got = store.get("https://example.com/a.jpg").await.unwrap();
        assert_eq!(got.size, 2);
    }

    #[tokio::test]
    async fn failed_write_is_absorbed_not_fatal() {
        let dir = tempdir().unwrap();
        // Parent directory does not exist, so every snapshot write fails.
        let store = MetadataStore::new(&dir.path().join("missing"));

        // Returns normally; the failure is logged and absorbed.
        store.insert(entry("https://example.com/a.jpg", 1)).await;

        // The update was lost, not applied: the next read sees nothing.
        assert!(store.get("https://example.com/a.jpg").await.is_none());
    }

    #[tokio::test]
    async fn no_temp_file_left_behind() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::new(dir.path());
        store.insert(entry("https://example.com/a.jpg", 1)).await;

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}

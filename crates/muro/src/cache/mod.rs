//! # Cache System
//!
//! Content-addressed on-disk cache for downloaded images: a metadata
//! store persisted as one JSON snapshot, a TTL-based retention policy,
//! and administrative stats/clear operations.

pub mod manager;
pub mod store;
pub mod types;

pub use manager::CacheManager;
pub use store::MetadataStore;
pub use types::{CacheConfig, CacheEntry, CacheStats, Classification};

//! Snapshot dataset cache
//!
//! A collection is keyed by the snapshot commit SHA, so a dataset for a
//! given SHA never goes stale. Entries live outside the repository under
//! `<cache root>/<repo-hash>/<sha>.bin.gz`.

pub mod paths;
pub mod store;

pub use paths::cache_root;
pub use store::{CacheError, DatasetCache, CACHE_VERSION};

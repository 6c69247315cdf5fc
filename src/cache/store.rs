//! Dataset cache store
//!
//! One file per snapshot commit: an 8-byte header (magic + format version)
//! followed by a gzip stream of the bitcode-encoded dataset. A cache entry
//! is only served when its snapshot SHA matches the key and its collection
//! date is set; anything else is treated as a miss.

use super::paths::{entry_file_name, repo_cache_dir};
use crate::models::AggregateDataset;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

/// Bump when the dataset layout changes.
pub const CACHE_VERSION: u32 = 1;

const MAGIC: &[u8; 4] = b"RCEN";
const HEADER_LEN: usize = 8;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode dataset: {0}")]
    Encode(String),

    #[error("failed to decode cache entry: {0}")]
    Decode(String),

    #[error("cache format version {found} does not match {expected}")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("invalid cache entry: {0}")]
    Invalid(String),
}

/// Per-repository dataset cache.
#[derive(Debug, Clone)]
pub struct DatasetCache {
    dir: PathBuf,
}

impl DatasetCache {
    /// Cache for `repo_path` under the given cache root.
    pub fn new(cache_root: &Path, repo_path: &Path) -> Self {
        Self {
            dir: repo_cache_dir(cache_root, repo_path),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the entry for a snapshot SHA.
    pub fn entry_path(&self, sha: &str) -> PathBuf {
        self.dir.join(entry_file_name(sha))
    }

    pub fn contains(&self, sha: &str) -> bool {
        self.entry_path(sha).is_file()
    }

    /// Load and validate the dataset cached for `sha`.
    pub fn load(&self, sha: &str) -> Result<AggregateDataset, CacheError> {
        let path = self.entry_path(sha);
        let bytes = fs::read(&path)?;
        let dataset = decode(&bytes)?;
        validate(&dataset, sha)?;
        debug!("Loaded cached dataset from {}", path.display());
        Ok(dataset)
    }

    /// Persist `dataset` under its snapshot SHA. Returns the entry path.
    ///
    /// Writes to a uniquely named temp file in the cache directory and
    /// renames it into place, so readers never see a partial entry and
    /// concurrent writers of the same snapshot never share a temp file.
    pub fn save(&self, dataset: &AggregateDataset) -> Result<PathBuf, CacheError> {
        let sha = &dataset.metadata.snapshot.sha;
        if sha.is_empty() {
            return Err(CacheError::Invalid("snapshot sha is empty".into()));
        }

        fs::create_dir_all(&self.dir)?;
        let path = self.entry_path(sha);

        let bytes = encode(dataset)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&bytes)?;
        tmp.persist(&path).map_err(|e| e.error)?;

        debug!("Cached dataset ({} bytes) at {}", bytes.len(), path.display());
        Ok(path)
    }

    /// Remove the entry for `sha`. Returns whether one existed.
    pub fn remove(&self, sha: &str) -> Result<bool, CacheError> {
        let path = self.entry_path(sha);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        Ok(true)
    }

    /// Every cache entry file for this repository.
    pub fn entries(&self) -> Result<Vec<PathBuf>, CacheError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && path.to_string_lossy().ends_with(".bin.gz") {
                entries.push(path);
            }
        }
        entries.sort();
        Ok(entries)
    }

    /// Delete this repository's whole cache directory.
    pub fn clear(&self) -> Result<(), CacheError> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)?;
        }
        Ok(())
    }
}

/// Serialize a dataset into the on-disk format.
pub fn encode(dataset: &AggregateDataset) -> Result<Vec<u8>, CacheError> {
    let payload = bitcode::serialize(dataset).map_err(|e| CacheError::Encode(e.to_string()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len() / 2);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&CACHE_VERSION.to_le_bytes());

    let mut encoder = GzEncoder::new(out, Compression::default());
    encoder.write_all(&payload)?;
    Ok(encoder.finish()?)
}

/// Parse the on-disk format back into a dataset.
pub fn decode(bytes: &[u8]) -> Result<AggregateDataset, CacheError> {
    if bytes.len() < HEADER_LEN || &bytes[..4] != MAGIC {
        return Err(CacheError::Decode("missing cache header".into()));
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[4..HEADER_LEN]);
    let found = u32::from_le_bytes(version);
    if found != CACHE_VERSION {
        return Err(CacheError::VersionMismatch {
            found,
            expected: CACHE_VERSION,
        });
    }

    let mut payload = Vec::new();
    GzDecoder::new(&bytes[HEADER_LEN..])
        .read_to_end(&mut payload)
        .map_err(|e| CacheError::Decode(e.to_string()))?;

    bitcode::deserialize(&payload).map_err(|e| CacheError::Decode(e.to_string()))
}

/// Check a loaded dataset against the key it was looked up by.
pub fn validate(dataset: &AggregateDataset, expected_sha: &str) -> Result<(), CacheError> {
    let sha = &dataset.metadata.snapshot.sha;
    if sha.is_empty() {
        return Err(CacheError::Invalid("snapshot sha is empty".into()));
    }
    if sha != expected_sha {
        return Err(CacheError::Invalid(format!(
            "snapshot sha {} does not match {}",
            sha, expected_sha
        )));
    }
    if dataset.metadata.collector.date_collected.timestamp() == 0 {
        return Err(CacheError::Invalid("collection date is unset".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::sample_dataset;
    use chrono::{DateTime, Utc};
    use tempfile::TempDir;

    fn cache_in(tmp: &TempDir) -> DatasetCache {
        DatasetCache::new(&tmp.path().join("cache"), &tmp.path().join("repo"))
    }

    #[test]
    fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let cache = cache_in(&tmp);
        let dataset = sample_dataset();
        let sha = dataset.metadata.snapshot.sha.clone();

        assert!(!cache.contains(&sha));
        let path = cache.save(&dataset).unwrap();
        assert!(path.ends_with(format!("{}.bin.gz", sha)));
        assert!(cache.contains(&sha));

        let loaded = cache.load(&sha).unwrap();
        assert_eq!(loaded, dataset);
        assert_eq!(fs::read_dir(cache.dir()).unwrap().count(), 1);
    }

    #[test]
    fn test_concurrent_saves_of_same_snapshot() {
        let tmp = TempDir::new().unwrap();
        let cache = cache_in(&tmp);
        let dataset = sample_dataset();
        let sha = dataset.metadata.snapshot.sha.clone();

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| cache.save(&dataset))).collect();
            for handle in handles {
                handle.join().unwrap().unwrap();
            }
        });

        assert_eq!(cache.load(&sha).unwrap(), dataset);
        assert_eq!(cache.entries().unwrap().len(), 1);
        assert_eq!(fs::read_dir(cache.dir()).unwrap().count(), 1);
    }

    #[test]
    fn test_load_missing_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let cache = cache_in(&tmp);
        assert!(matches!(cache.load("deadbeef"), Err(CacheError::Io(_))));
    }

    #[test]
    fn test_corrupt_entry_rejected() {
        let tmp = TempDir::new().unwrap();
        let cache = cache_in(&tmp);
        fs::create_dir_all(cache.dir()).unwrap();
        fs::write(cache.entry_path("abc"), b"not a cache entry").unwrap();
        assert!(matches!(cache.load("abc"), Err(CacheError::Decode(_))));

        let mut truncated = encode(&sample_dataset()).unwrap();
        truncated.truncate(truncated.len() / 2);
        fs::write(cache.entry_path("abc"), truncated).unwrap();
        assert!(cache.load("abc").is_err());
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut bytes = encode(&sample_dataset()).unwrap();
        bytes[4..8].copy_from_slice(&(CACHE_VERSION + 1).to_le_bytes());
        assert!(matches!(
            decode(&bytes),
            Err(CacheError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_mismatched_sha() {
        let dataset = sample_dataset();
        assert!(validate(&dataset, &dataset.metadata.snapshot.sha).is_ok());
        assert!(matches!(
            validate(&dataset, "0000"),
            Err(CacheError::Invalid(_))
        ));

        let tmp = TempDir::new().unwrap();
        let cache = cache_in(&tmp);
        let path = cache.save(&dataset).unwrap();
        fs::copy(&path, cache.entry_path("other")).unwrap();
        assert!(cache.load("other").is_err());
    }

    #[test]
    fn test_validate_rejects_unset_date() {
        let mut dataset = sample_dataset();
        dataset.metadata.collector.date_collected = DateTime::<Utc>::default();
        let sha = dataset.metadata.snapshot.sha.clone();
        assert!(validate(&dataset, &sha).is_err());

        dataset.metadata.snapshot.sha.clear();
        assert!(validate(&dataset, "").is_err());
    }

    #[test]
    fn test_entries_and_clear() {
        let tmp = TempDir::new().unwrap();
        let cache = cache_in(&tmp);
        assert!(cache.entries().unwrap().is_empty());

        let mut dataset = sample_dataset();
        cache.save(&dataset).unwrap();
        dataset.metadata.snapshot.sha = "feedface".into();
        cache.save(&dataset).unwrap();
        assert_eq!(cache.entries().unwrap().len(), 2);

        assert!(cache.remove("feedface").unwrap());
        assert!(!cache.remove("feedface").unwrap());
        assert_eq!(cache.entries().unwrap().len(), 1);

        cache.clear().unwrap();
        assert!(!cache.dir().exists());
        cache.clear().unwrap();
    }
}

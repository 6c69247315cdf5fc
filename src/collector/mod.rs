//! Repository snapshot collection
//!
//! The [`Collector`] pins one commit (HEAD at open time) and produces the
//! [`AggregateDataset`] for it, either from the cache or by walking the
//! history and blaming every tracked file:
//!
//! ```text
//! Uninitialized ─► SnapshotResolved ─┬─► CacheHit ────────────────────────────► Done
//!                                    └─► Walking ─► Blaming ─► Reducing ─► Cached ─► Done
//! ```
//!
//! Only setup failures are fatal. Skipped commits, failed blames and cache
//! problems are logged and the collection carries on.

use crate::cache::{cache_root, CacheError, DatasetCache};
use crate::git::{BlameAggregator, GitRepo, HistoryWalker};
use crate::models::{AggregateDataset, CollectorMetadata, CommitSnapshot, Metadata};
use git2::Oid;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Fatal collection errors.
#[derive(Error, Debug)]
pub enum CollectError {
    #[error("path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("not a git repository (no .git or HEAD found): {}", .0.display())]
    NotARepository(PathBuf),

    #[error("could not resolve HEAD to a commit: {0}")]
    HeadUnresolved(git2::Error),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),
}

/// Where a collector is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectPhase {
    #[default]
    Uninitialized,
    SnapshotResolved,
    CacheHit,
    Walking,
    Blaming,
    Reducing,
    Cached,
    Done,
}

/// Resolved collection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectOptions {
    /// Blame worker count (defaults to available parallelism)
    pub workers: Option<usize>,
    /// Cache root override
    pub cache_dir: Option<PathBuf>,
    /// Read and write the dataset cache
    pub use_cache: bool,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            workers: None,
            cache_dir: None,
            use_cache: true,
        }
    }
}

/// How a dataset was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Cache,
    Fresh,
}

/// Result of [`Collector::collect`].
#[derive(Debug)]
pub struct CollectOutcome {
    pub dataset: AggregateDataset,
    pub source: DataSource,
    /// Set when a fresh dataset could not be written to the cache
    pub cache_write_error: Option<String>,
}

/// Check that `path` exists, is a directory and looks like a repository.
pub fn validate_repo_path(path: &Path) -> Result<(), CollectError> {
    if !path.exists() {
        return Err(CollectError::PathNotFound(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(CollectError::NotADirectory(path.to_path_buf()));
    }
    if !GitRepo::is_repository_dir(path) {
        return Err(CollectError::NotARepository(path.to_path_buf()));
    }
    Ok(())
}

/// The dataset cache for the repository at `path`, without resolving HEAD.
pub fn repository_cache(path: &Path, options: &CollectOptions) -> Result<DatasetCache, CollectError> {
    validate_repo_path(path)?;
    let repo = GitRepo::open(path)?;
    Ok(DatasetCache::new(
        &cache_root(options.cache_dir.as_deref()),
        repo.root(),
    ))
}

/// Collects the aggregate dataset for one repository snapshot.
pub struct Collector {
    repo: GitRepo,
    head: Oid,
    snapshot: CommitSnapshot,
    options: CollectOptions,
    cache: DatasetCache,
    phase: CollectPhase,
    trail: Vec<CollectPhase>,
}

impl Collector {
    /// Validate `path`, open the repository and pin HEAD as the snapshot.
    pub fn open(path: &Path, options: CollectOptions) -> Result<Self, CollectError> {
        validate_repo_path(path)?;

        let repo = GitRepo::open(path)?;
        let head = repo.head().map_err(CollectError::HeadUnresolved)?;
        let snapshot = repo.commit_snapshot(head)?;
        let cache = DatasetCache::new(&cache_root(options.cache_dir.as_deref()), repo.root());

        info!(
            "Snapshot {} on {} ({})",
            snapshot.sha, snapshot.branch, snapshot.remote_url
        );

        Ok(Self {
            repo,
            head,
            snapshot,
            options,
            cache,
            phase: CollectPhase::SnapshotResolved,
            trail: vec![CollectPhase::SnapshotResolved],
        })
    }

    /// Current phase. `Done` once [`Collector::collect`] has returned
    /// successfully, whichever path it took.
    pub fn phase(&self) -> CollectPhase {
        self.phase
    }

    /// Every phase entered so far, in order.
    pub fn trail(&self) -> &[CollectPhase] {
        &self.trail
    }

    fn enter(&mut self, phase: CollectPhase) {
        debug!("Collector phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
        self.trail.push(phase);
    }

    pub fn snapshot(&self) -> &CommitSnapshot {
        &self.snapshot
    }

    pub fn cache(&self) -> &DatasetCache {
        &self.cache
    }

    /// Produce the dataset for the snapshot.
    ///
    /// A valid cache entry is returned as is. Otherwise the dataset is
    /// collected from scratch and written back to the cache; a failed write
    /// is reported in [`CollectOutcome::cache_write_error`] and does not
    /// fail the run.
    pub fn collect(
        &mut self,
        progress: Option<&(dyn Fn(usize, usize) + Sync)>,
    ) -> Result<CollectOutcome, CollectError> {
        if self.options.use_cache {
            if let Some(dataset) = self.load_cached() {
                self.enter(CollectPhase::CacheHit);
                info!("Using cached dataset for {}", self.snapshot.sha);
                self.enter(CollectPhase::Done);
                return Ok(CollectOutcome {
                    dataset,
                    source: DataSource::Cache,
                    cache_write_error: None,
                });
            }
        }

        let dataset = self.collect_fresh(progress)?;

        let mut cache_write_error = None;
        if self.options.use_cache {
            self.enter(CollectPhase::Cached);
            match self.cache.save(&dataset) {
                Ok(path) => debug!("Dataset cached at {}", path.display()),
                Err(e) => {
                    warn!("Failed to cache dataset for {}: {}", self.snapshot.sha, e);
                    cache_write_error = Some(e.to_string());
                }
            }
        }

        self.enter(CollectPhase::Done);
        Ok(CollectOutcome {
            dataset,
            source: DataSource::Fresh,
            cache_write_error,
        })
    }

    /// Remove the cache entry for the snapshot. Returns whether one existed.
    pub fn clear_cache(&self) -> Result<bool, CacheError> {
        self.cache.remove(&self.snapshot.sha)
    }

    fn load_cached(&self) -> Option<AggregateDataset> {
        match self.cache.load(&self.snapshot.sha) {
            Ok(dataset) => Some(dataset),
            Err(CacheError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No cached dataset for {}", self.snapshot.sha);
                None
            }
            Err(e) => {
                warn!("Ignoring cached dataset for {}: {}", self.snapshot.sha, e);
                None
            }
        }
    }

    fn collect_fresh(
        &mut self,
        progress: Option<&(dyn Fn(usize, usize) + Sync)>,
    ) -> Result<AggregateDataset, CollectError> {
        let mut dataset = AggregateDataset::new(Metadata {
            collector: CollectorMetadata::capture(),
            snapshot: self.snapshot.clone(),
        });

        self.enter(CollectPhase::Walking);
        let walk = HistoryWalker::new(&self.repo).walk(self.head)?;
        if !walk.skipped.is_empty() {
            warn!("Skipped {} commits with unreadable stats", walk.skipped.len());
        }
        info!(
            "Walked {} commits by {} contributors",
            walk.commits.len(),
            walk.contributors.len()
        );
        dataset.history = walk.commits;
        dataset.contributors = walk.contributors;

        self.enter(CollectPhase::Blaming);
        let files = self.repo.list_files(self.head)?;
        let blame = BlameAggregator::new(self.repo.root(), self.head)
            .with_workers(self.options.workers)
            .run(files, progress);
        if !blame.failed.is_empty() {
            warn!("{} files could not be blamed", blame.failed.len());
        }
        dataset.files = blame.files;

        self.enter(CollectPhase::Reducing);
        dataset.reduce_active_lines();

        Ok(dataset)
    }
}

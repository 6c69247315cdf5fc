//! Parallel blame aggregation
//!
//! Blames every tracked file at the snapshot commit and reduces each blame
//! to a [`FileSummary`]. Blame is the slow part of a collection, so files
//! are spread over a pool of worker threads:
//!
//! ```text
//! file queue (prefilled, closed) ──► N workers (own repo handle each)
//!                                          │
//!                                          ▼
//!                          result channel ──► single consumer
//! ```
//!
//! The consumer is the only writer of the output map. It stops once every
//! worker has dropped its sender, and the workers are joined before the
//! outcome is returned.

use super::GitRepo;
use crate::models::FileSummary;
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender};
use git2::Oid;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::thread;
use thiserror::Error;
use tracing::{debug, warn};

/// One contiguous run of lines attributed to the same commit.
#[derive(Debug, Clone, PartialEq)]
pub struct BlameHunk {
    /// Author display name (email stripped)
    pub author: String,
    /// Commit id, `None` for uncommitted lines
    pub commit: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub lines: usize,
}

/// Per-file blame failure. Never fatal to a collection.
#[derive(Error, Debug)]
pub enum BlameError {
    #[error("failed to blame {path}: {source}")]
    Blame {
        path: String,
        #[source]
        source: git2::Error,
    },

    #[error("blame worker could not open repository: {0}")]
    Open(String),
}

/// Everything the pool produced.
#[derive(Debug, Default)]
pub struct BlameOutcome {
    /// Path -> summary, only for files with at least one attributed line
    pub files: BTreeMap<String, FileSummary>,
    /// Files whose blame failed
    pub failed: Vec<(String, BlameError)>,
}

/// Reduce a file's blame hunks to a summary.
///
/// Returns `None` when no line is attributed to anyone. The top
/// contributor is the one with the most lines; ties go to the
/// lexicographically smallest name.
pub fn summarize_blame(hunks: &[BlameHunk]) -> Option<FileSummary> {
    let mut lines_by_contributor: BTreeMap<String, usize> = BTreeMap::new();
    let mut commits: HashSet<&str> = HashSet::new();
    let mut original_author: Option<&str> = None;
    let mut latest: Option<DateTime<Utc>> = None;
    let mut total_lines = 0;

    for hunk in hunks {
        if hunk.lines == 0 || hunk.author.is_empty() {
            continue;
        }
        *lines_by_contributor.entry(hunk.author.clone()).or_default() += hunk.lines;
        total_lines += hunk.lines;

        original_author.get_or_insert(hunk.author.as_str());
        latest = Some(latest.map_or(hunk.timestamp, |t| t.max(hunk.timestamp)));
        if let Some(commit) = &hunk.commit {
            commits.insert(commit);
        }
    }

    if total_lines == 0 {
        return None;
    }

    // BTreeMap iterates by name, so keeping the first maximum breaks ties
    let (top_name, top_lines) = lines_by_contributor.iter().fold(
        None::<(&String, usize)>,
        |best, (name, &lines)| match best {
            Some((_, best_lines)) if best_lines >= lines => best,
            _ => Some((name, lines)),
        },
    )?;
    let share = top_lines as f64 / total_lines as f64 * 100.0;

    Some(FileSummary {
        date_introduced: latest.unwrap_or_default(),
        original_author: original_author.unwrap_or_default().to_string(),
        total_commits: commits.len(),
        total_lines,
        top_contributor: format!("{} ({:.2}%)", top_name, share),
        top_contributor_share: share,
        lines_by_contributor,
    })
}

type BlameResult = (String, Result<Option<FileSummary>, BlameError>);

/// Worker pool that blames files at a fixed snapshot commit.
pub struct BlameAggregator {
    repo_root: PathBuf,
    snapshot: Oid,
    workers: Option<usize>,
}

impl BlameAggregator {
    pub fn new(repo_root: &Path, snapshot: Oid) -> Self {
        Self {
            repo_root: repo_root.to_path_buf(),
            snapshot,
            workers: None,
        }
    }

    /// Override the worker count (defaults to available parallelism).
    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        self.workers = workers;
        self
    }

    /// Pool size for `file_count` files: never more workers than files,
    /// never fewer than one.
    pub fn worker_count(&self, file_count: usize) -> usize {
        let requested = self.workers.unwrap_or_else(|| {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        });
        requested.min(file_count).max(1)
    }

    /// Blame `files` and collect the summaries.
    ///
    /// Individual failures are logged and listed in
    /// [`BlameOutcome::failed`]; the rest of the files still complete.
    pub fn run(
        &self,
        files: Vec<String>,
        progress: Option<&(dyn Fn(usize, usize) + Sync)>,
    ) -> BlameOutcome {
        let total = files.len();
        let mut outcome = BlameOutcome::default();
        if total == 0 {
            return outcome;
        }

        let num_workers = self.worker_count(total);
        debug!("Blaming {} files with {} workers", total, num_workers);

        // Sized to hold every job and every result, so no send ever blocks
        let (job_tx, job_rx) = bounded::<String>(total);
        let (result_tx, result_rx) = bounded::<BlameResult>(total);

        for file in files {
            if job_tx.send(file).is_err() {
                break;
            }
        }
        drop(job_tx);

        let mut workers = Vec::with_capacity(num_workers);
        for id in 0..num_workers {
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            let root = self.repo_root.clone();
            let snapshot = self.snapshot;
            workers.push(thread::spawn(move || {
                blame_worker(id, &root, snapshot, jobs, results)
            }));
        }

        // Drop our copies so the consumer sees completion
        drop(job_rx);
        drop(result_tx);

        let mut done = 0;
        for (path, result) in result_rx {
            done += 1;
            if let Some(cb) = progress {
                cb(done, total);
            }

            match result {
                Ok(Some(summary)) => {
                    outcome.files.insert(path, summary);
                }
                Ok(None) => debug!("No attributed lines in {}", path),
                Err(e) => {
                    warn!("{}", e);
                    outcome.failed.push((path, e));
                }
            }
        }

        for (id, worker) in workers.into_iter().enumerate() {
            if worker.join().is_err() {
                warn!("Blame worker {} panicked", id);
            }
        }

        outcome
    }
}

fn blame_worker(
    id: usize,
    root: &Path,
    snapshot: Oid,
    jobs: Receiver<String>,
    results: Sender<BlameResult>,
) {
    let repo = GitRepo::open(root).map_err(|e| e.to_string());
    if let Err(e) = &repo {
        warn!("Blame worker {} could not open {}: {}", id, root.display(), e);
    }

    for path in jobs {
        let result = match &repo {
            Ok(repo) => repo
                .blame(snapshot, &path)
                .map(|hunks| summarize_blame(&hunks))
                .map_err(|source| BlameError::Blame {
                    path: path.clone(),
                    source,
                }),
            Err(e) => Err(BlameError::Open(e.clone())),
        };
        if results.send((path, result)).is_err() {
            break;
        }
    }
}

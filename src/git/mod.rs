//! Git access layer
//!
//! Thin wrapper over libgit2 (via the git2 crate) exposing the read
//! operations the collector needs: HEAD resolution, the commit log,
//! the tracked file list, per-commit diff stats and line blame.
//!
//! # Example
//!
//! ```no_run
//! use repocensus::git::{GitRepo, HistoryWalker};
//! use std::path::Path;
//!
//! let repo = GitRepo::open(Path::new("/path/to/repo")).unwrap();
//! let head = repo.head().unwrap();
//! let walk = HistoryWalker::new(&repo).walk(head).unwrap();
//! println!("{} commits", walk.commits.len());
//! ```

pub mod blame;
pub mod history;

pub use blame::{summarize_blame, BlameAggregator, BlameError, BlameHunk, BlameOutcome};
pub use history::{HistoryWalk, HistoryWalker};

use crate::models::{CommitSnapshot, FileChange};
use chrono::{DateTime, TimeZone, Utc};
use git2::{
    BlameOptions, Commit, Delta, FileMode, ObjectType, Oid, Patch, Repository, Sort,
    TreeWalkMode, TreeWalkResult,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Insertions, deletions and per-file stats for one commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub insertions: usize,
    pub deletions: usize,
    pub files: BTreeMap<String, FileChange>,
}

impl DiffStats {
    fn add(&mut self, path: String, change: FileChange) {
        self.insertions += change.insertions;
        self.deletions += change.deletions;
        self.files.insert(path, change);
    }
}

/// A git repository opened for analysis.
pub struct GitRepo {
    repo: Repository,
    root: PathBuf,
}

impl GitRepo {
    /// Open the repository rooted at `path` (work tree or bare repository).
    pub fn open(path: &Path) -> Result<Self, git2::Error> {
        let repo = Repository::open(path)?;
        let root = repo.workdir().unwrap_or(repo.path()).to_path_buf();
        debug!("Opened git repository at {:?}", repo.path());
        Ok(Self { repo, root })
    }

    /// Check whether `path` looks like a repository root: a `.git` entry
    /// (directory or gitfile) or a bare-repository `HEAD` file.
    pub fn is_repository_dir(path: &Path) -> bool {
        path.join(".git").exists() || path.join("HEAD").is_file()
    }

    /// Work tree root, or the git directory for bare repositories.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve HEAD to a commit id.
    pub fn head(&self) -> Result<Oid, git2::Error> {
        Ok(self.repo.head()?.peel_to_commit()?.id())
    }

    pub fn find_commit(&self, oid: Oid) -> Result<Commit<'_>, git2::Error> {
        self.repo.find_commit(oid)
    }

    /// Every commit reachable from `start`, oldest first.
    ///
    /// The revwalk order is reversed and then stable-sorted by committer
    /// time, so the result is non-decreasing in time whatever order the
    /// walk produced.
    pub fn log_from(&self, start: Oid) -> Result<Vec<Oid>, git2::Error> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME)?;
        revwalk.push(start)?;

        let mut commits = Vec::new();
        for oid in revwalk {
            let oid = oid?;
            let time = self.repo.find_commit(oid)?.time().seconds();
            commits.push((oid, time));
        }
        commits.reverse();
        commits.sort_by_key(|&(_, time)| time);

        Ok(commits.into_iter().map(|(oid, _)| oid).collect())
    }

    /// Non-binary file paths tracked at `commit`, sorted.
    ///
    /// Submodules (gitlink entries) and symlinks are skipped.
    pub fn list_files(&self, commit: Oid) -> Result<Vec<String>, git2::Error> {
        let mut files = Vec::new();
        for (path, blob_id) in self.tree_blobs(commit)? {
            if !self.repo.find_blob(blob_id)?.is_binary() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Line stats for `commit` against its first parent.
    ///
    /// A root commit counts every line of every non-binary file as inserted.
    /// Merge commits are only diffed against their first parent. Binary
    /// files, symlinks and submodule bumps never contribute.
    pub fn diff_stats(&self, commit: &Commit<'_>) -> Result<DiffStats, git2::Error> {
        if commit.parent_count() == 0 {
            return self.initial_commit_stats(commit.id());
        }

        let parent_tree = commit.parent(0)?.tree()?;
        let tree = commit.tree()?;
        let diff = self
            .repo
            .diff_tree_to_tree(Some(&parent_tree), Some(&tree), None)?;

        let mut stats = DiffStats::default();
        for (idx, entry) in diff.deltas().enumerate() {
            let new_is_file = is_file_mode(entry.new_file().mode());
            if !new_is_file && !is_file_mode(entry.old_file().mode()) {
                continue;
            }
            // None for binary or unchanged entries
            let Some(patch) = Patch::from_diff(&diff, idx)? else {
                continue;
            };
            let delta = patch.delta();
            if delta.flags().is_binary() || delta.new_file().is_binary() {
                continue;
            }
            let Some(path) = delta
                .new_file()
                .path()
                .or_else(|| delta.old_file().path())
                .map(|p| p.to_string_lossy().to_string())
            else {
                continue;
            };

            let lines = if delta.status() == Delta::Deleted || !new_is_file {
                0
            } else {
                self.blob_line_count(delta.new_file().id()).unwrap_or(0)
            };
            let (_, insertions, deletions) = patch.line_stats()?;

            stats.add(
                path,
                FileChange {
                    insertions,
                    deletions,
                    lines,
                },
            );
        }

        Ok(stats)
    }

    fn initial_commit_stats(&self, commit: Oid) -> Result<DiffStats, git2::Error> {
        let mut stats = DiffStats::default();
        for (path, blob_id) in self.tree_blobs(commit)? {
            let Some(lines) = self.blob_line_count(blob_id) else {
                continue;
            };
            stats.add(
                path,
                FileChange {
                    insertions: lines,
                    deletions: 0,
                    lines,
                },
            );
        }
        Ok(stats)
    }

    /// Line count of a blob, or `None` when it is binary or missing.
    fn blob_line_count(&self, blob_id: Oid) -> Option<usize> {
        let blob = self.repo.find_blob(blob_id).ok()?;
        if blob.is_binary() {
            return None;
        }
        Some(count_lines(blob.content()))
    }

    /// Regular file entries in the tree of `commit` as (path, blob id).
    /// Symlinks and submodules are left out.
    fn tree_blobs(&self, commit: Oid) -> Result<Vec<(String, Oid)>, git2::Error> {
        let tree = self.repo.find_commit(commit)?.tree()?;

        let mut blobs = Vec::new();
        tree.walk(TreeWalkMode::PreOrder, |dir, entry| {
            if entry.kind() == Some(ObjectType::Blob) && entry.filemode() != SYMLINK_MODE {
                let name = String::from_utf8_lossy(entry.name_bytes());
                blobs.push((format!("{}{}", dir, name), entry.id()));
            }
            TreeWalkResult::Ok
        })?;

        Ok(blobs)
    }

    /// Line blame of `path` as of `commit`, one entry per blame hunk in
    /// file order.
    pub fn blame(&self, commit: Oid, path: &str) -> Result<Vec<BlameHunk>, git2::Error> {
        let mut opts = BlameOptions::new();
        opts.newest_commit(commit);

        let blame = self.repo.blame_file(Path::new(path), Some(&mut opts))?;

        let mut hunks = Vec::with_capacity(blame.len());
        for hunk in blame.iter() {
            let commit_id = hunk.final_commit_id();
            let sig = hunk.final_signature();
            hunks.push(BlameHunk {
                author: contributor_name(&String::from_utf8_lossy(sig.name_bytes())),
                commit: (!commit_id.is_zero()).then(|| commit_id.to_string()),
                timestamp: to_utc(&sig.when()),
                lines: hunk.lines_in_hunk(),
            });
        }

        Ok(hunks)
    }

    /// URL of `origin`, falling back to the first remote with a URL.
    pub fn remote_url(&self) -> Result<String, git2::Error> {
        if let Ok(origin) = self.repo.find_remote("origin") {
            if let Some(url) = origin.url() {
                return Ok(url.to_string());
            }
        }

        let remotes = self.repo.remotes()?;
        for name in remotes.iter().flatten() {
            let remote = self.repo.find_remote(name)?;
            if let Some(url) = remote.url() {
                return Ok(url.to_string());
            }
        }

        Err(git2::Error::from_str("repository has no remote with a URL"))
    }

    /// Current branch name, or `<sha> (detached)` when HEAD is detached.
    pub fn branch_label(&self, head: Oid) -> Result<String, git2::Error> {
        let reference = self.repo.head()?;
        if reference.is_branch() {
            if let Some(name) = reference.shorthand() {
                return Ok(name.to_string());
            }
        }
        Ok(format!("{} (detached)", head))
    }

    /// Describe the snapshot commit.
    ///
    /// An unknown branch or remote is logged and replaced with a
    /// placeholder; only a missing commit is an error.
    pub fn commit_snapshot(&self, head: Oid) -> Result<CommitSnapshot, git2::Error> {
        let commit = self.repo.find_commit(head)?;

        let branch = self.branch_label(head).unwrap_or_else(|e| {
            warn!("Could not determine branch: {}", e);
            format!("{} (error determining branch)", head)
        });
        let remote_url = self.remote_url().unwrap_or_else(|e| {
            warn!("Could not determine remote URL: {}", e);
            "unknown".to_string()
        });
        let message = String::from_utf8_lossy(commit.message_bytes())
            .lines()
            .next()
            .unwrap_or("")
            .to_string();
        let committer = commit.committer();

        Ok(CommitSnapshot {
            sha: head.to_string(),
            tree: commit.tree_id().to_string(),
            date: to_utc(&commit.time()),
            contributor: signature_label(&committer),
            message,
            branch,
            remote_url,
        })
    }
}

const SYMLINK_MODE: i32 = 0o120000;

/// Regular or executable file. Symlinks, submodules and trees carry no
/// countable lines.
fn is_file_mode(mode: FileMode) -> bool {
    matches!(mode, FileMode::Blob | FileMode::BlobExecutable)
}

/// Strip an email-bracket suffix from a raw author string.
///
/// `"Ann Smith <ann@example.com>"` becomes `"Ann Smith"`.
pub fn contributor_name(raw: &str) -> String {
    raw.split('<').next().unwrap_or("").trim().to_string()
}

/// `Name (email)` label for a signature.
pub fn signature_label(sig: &git2::Signature<'_>) -> String {
    format!(
        "{} ({})",
        String::from_utf8_lossy(sig.name_bytes()),
        String::from_utf8_lossy(sig.email_bytes())
    )
}

/// Count lines the way git does: a trailing fragment without a newline
/// still counts, empty content has zero lines.
pub fn count_lines(content: &[u8]) -> usize {
    let newlines = memchr::memchr_iter(b'\n', content).count();
    match content.last() {
        Some(b'\n') | None => newlines,
        Some(_) => newlines + 1,
    }
}

/// Convert a git timestamp to UTC.
pub fn to_utc(time: &git2::Time) -> DateTime<Utc> {
    Utc.timestamp_opt(time.seconds(), 0)
        .single()
        .unwrap_or_default()
}

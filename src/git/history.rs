//! Commit history walking
//!
//! Walks every commit reachable from the snapshot, oldest first, and folds
//! each one into a [`CommitRecord`] plus the running per-contributor
//! totals. Contributors are keyed by committer display name, so the same
//! person committing under several emails collapses into one profile.

use super::{contributor_name, signature_label, to_utc, GitRepo};
use crate::models::{CommitRecord, ContributorProfile};
use git2::Oid;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Result of a history walk.
#[derive(Debug, Default)]
pub struct HistoryWalk {
    /// Commits, oldest first
    pub commits: Vec<CommitRecord>,
    /// Committer display name -> running totals
    pub contributors: BTreeMap<String, ContributorProfile>,
    /// Commits whose stats could not be computed
    pub skipped: Vec<String>,
}

/// Walks the commit log of a repository.
pub struct HistoryWalker<'a> {
    repo: &'a GitRepo,
}

impl<'a> HistoryWalker<'a> {
    pub fn new(repo: &'a GitRepo) -> Self {
        Self { repo }
    }

    /// Walk all commits reachable from `start`.
    ///
    /// Failing to list the log is fatal. A commit whose stats cannot be
    /// computed is logged, skipped and reported in [`HistoryWalk::skipped`].
    pub fn walk(&self, start: Oid) -> Result<HistoryWalk, git2::Error> {
        let oids = self.repo.log_from(start)?;
        debug!("Walking {} commits from {}", oids.len(), start);

        let mut walk = HistoryWalk {
            commits: Vec::with_capacity(oids.len()),
            ..Default::default()
        };

        for oid in oids {
            match self.record(oid) {
                Ok((record, name, email)) => {
                    walk.contributors.entry(name).or_default().record_commit(
                        &email,
                        record.insertions,
                        record.deletions,
                    );
                    walk.commits.push(record);
                }
                Err(e) => {
                    warn!("Skipping commit {}: {}", oid, e);
                    walk.skipped.push(oid.to_string());
                }
            }
        }

        Ok(walk)
    }

    /// Build the record for one commit, returning it with the committer
    /// display name and email.
    fn record(&self, oid: Oid) -> Result<(CommitRecord, String, String), git2::Error> {
        let commit = self.repo.find_commit(oid)?;
        let stats = self.repo.diff_stats(&commit)?;

        let committer = commit.committer();
        let name = contributor_name(&String::from_utf8_lossy(committer.name_bytes()));
        let email = String::from_utf8_lossy(committer.email_bytes()).to_string();

        let record = CommitRecord {
            sha: oid.to_string(),
            parents: commit.parent_ids().map(|p| p.to_string()).collect(),
            tree: commit.tree_id().to_string(),
            contributor: signature_label(&committer),
            date: to_utc(&commit.time()),
            message: String::from_utf8_lossy(commit.message_bytes()).to_string(),
            insertions: stats.insertions,
            deletions: stats.deletions,
            files: stats.files,
        };

        Ok((record, name, email))
    }
}

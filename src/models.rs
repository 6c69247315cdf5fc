//! Core data models for repocensus
//!
//! These models describe one collected snapshot of a repository: the
//! commit history, per-file blame summaries and per-contributor totals.
//! The whole tree is serialized to the cache and to JSON reports, so every
//! map is a `BTreeMap` to keep output ordering reproducible.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Tool version recorded in collector metadata.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The root entity produced by one collection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateDataset {
    pub metadata: Metadata,
    /// Contributor display name -> profile
    pub contributors: BTreeMap<String, ContributorProfile>,
    /// Repository-relative path -> blame summary
    pub files: BTreeMap<String, FileSummary>,
    /// Commits, oldest first
    pub history: Vec<CommitRecord>,
}

impl AggregateDataset {
    /// Start an empty dataset for the given snapshot.
    pub fn new(metadata: Metadata) -> Self {
        Self {
            metadata,
            contributors: BTreeMap::new(),
            files: BTreeMap::new(),
            history: Vec::new(),
        }
    }

    /// Recompute every contributor's active line count from the file summaries.
    ///
    /// Must only run once all file summaries are in place; before that the
    /// counts are partial.
    pub fn reduce_active_lines(&mut self) {
        for (name, profile) in self.contributors.iter_mut() {
            profile.active_lines = self
                .files
                .values()
                .filter_map(|f| f.lines_by_contributor.get(name))
                .sum();
        }
    }

    /// Sum of insertions across the whole history.
    pub fn total_insertions(&self) -> usize {
        self.history.iter().map(|c| c.insertions).sum()
    }

    /// Sum of deletions across the whole history.
    pub fn total_deletions(&self) -> usize {
        self.history.iter().map(|c| c.deletions).sum()
    }

    /// Sum of blamed lines across all tracked files.
    pub fn total_lines(&self) -> usize {
        self.files.values().map(|f| f.total_lines).sum()
    }
}

/// Information about the collection run and the analyzed snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub collector: CollectorMetadata,
    pub snapshot: CommitSnapshot,
}

/// Details about the environment that produced the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorMetadata {
    pub version: String,
    /// Wall-clock time of collection (UTC)
    pub date_collected: DateTime<Utc>,
    pub user: String,
    pub hostname: String,
    /// `os/arch`
    pub platform: String,
    pub git_version: String,
}

impl CollectorMetadata {
    /// Capture metadata for the current process.
    pub fn capture() -> Self {
        let (major, minor, patch) = git2::Version::get().libgit2_version();
        Self {
            version: TOOL_VERSION.to_string(),
            date_collected: Utc::now(),
            user: whoami::fallible::username().unwrap_or_else(|_| "unknown".to_string()),
            hostname: whoami::fallible::hostname().unwrap_or_else(|_| "unknown".to_string()),
            platform: format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH),
            git_version: format!("libgit2 {}.{}.{}", major, minor, patch),
        }
    }
}

/// The exact repository state analyzed. Captured once per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitSnapshot {
    pub sha: String,
    pub tree: String,
    pub date: DateTime<Utc>,
    /// `Name (email)`
    pub contributor: String,
    /// First line of the commit message
    pub message: String,
    /// Branch name, or `<sha> (detached)` / `<sha> (error determining branch)`
    pub branch: String,
    /// Remote URL, or `unknown`
    pub remote_url: String,
}

/// One historical commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub sha: String,
    pub parents: Vec<String>,
    pub tree: String,
    /// `Name (email)` of the committer
    pub contributor: String,
    pub date: DateTime<Utc>,
    /// Full commit message
    pub message: String,
    pub insertions: usize,
    pub deletions: usize,
    /// Changed path -> stats for that path in this commit
    pub files: BTreeMap<String, FileChange>,
}

impl CommitRecord {
    /// First line of the message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Short hash for display.
    pub fn short_sha(&self) -> &str {
        &self.sha[..self.sha.len().min(8)]
    }
}

/// Per-file change stats within a single commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub insertions: usize,
    pub deletions: usize,
    /// Line count of the file after the commit (0 when deleted)
    pub lines: usize,
}

/// Blame summary for a single tracked file at the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSummary {
    /// Latest commit timestamp among the blamed lines.
    ///
    /// Despite the name this is not the creation date of the file.
    pub date_introduced: DateTime<Utc>,
    /// Author of the first blamed line
    pub original_author: String,
    /// Distinct commits among the blamed lines
    pub total_commits: usize,
    pub total_lines: usize,
    /// `Name (NN.NN%)`
    pub top_contributor: String,
    /// Percentage of lines owned by the top contributor
    pub top_contributor_share: f64,
    pub lines_by_contributor: BTreeMap<String, usize>,
}

/// Statistics for one contributor, keyed by display name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorProfile {
    /// Known email addresses for this display name
    pub identities: BTreeSet<String>,
    pub commit_count: usize,
    pub insertions: usize,
    pub deletions: usize,
    /// Lines currently attributed to this contributor by blame
    pub active_lines: usize,
}

impl ContributorProfile {
    /// Fold one commit into the running totals.
    pub fn record_commit(&mut self, email: &str, insertions: usize, deletions: usize) {
        if !email.is_empty() {
            self.identities.insert(email.to_string());
        }
        self.commit_count += 1;
        self.insertions += insertions;
        self.deletions += deletions;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    /// Minimal dataset used by cache and reporter tests
    pub(crate) fn sample_dataset() -> AggregateDataset {
        let when = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_default();
        let mut dataset = AggregateDataset::new(Metadata {
            collector: CollectorMetadata {
                version: "test".into(),
                date_collected: when,
                user: "tester".into(),
                hostname: "host".into(),
                platform: "linux/x86_64".into(),
                git_version: "libgit2 1.9.0".into(),
            },
            snapshot: CommitSnapshot {
                sha: "abcdef1234567890abcdef1234567890abcdef12".into(),
                tree: "1111111111111111111111111111111111111111".into(),
                date: when,
                contributor: "Ann (ann@example.com)".into(),
                message: "Add <main> & tests".into(),
                branch: "main".into(),
                remote_url: "unknown".into(),
            },
        });

        let mut ann = ContributorProfile::default();
        ann.record_commit("ann@example.com", 12, 0);
        let mut bob = ContributorProfile::default();
        bob.record_commit("bob@example.com", 3, 1);
        dataset.contributors.insert("Ann".into(), ann);
        dataset.contributors.insert("Bob".into(), bob);

        dataset.files.insert(
            "src/main.rs".into(),
            FileSummary {
                date_introduced: when,
                original_author: "Ann".into(),
                total_commits: 2,
                total_lines: 10,
                top_contributor: "Ann (80.00%)".into(),
                top_contributor_share: 80.0,
                lines_by_contributor: BTreeMap::from([("Ann".into(), 8), ("Bob".into(), 2)]),
            },
        );
        dataset.files.insert(
            "README.md".into(),
            FileSummary {
                date_introduced: when,
                original_author: "Ann".into(),
                total_commits: 1,
                total_lines: 4,
                top_contributor: "Ann (100.00%)".into(),
                top_contributor_share: 100.0,
                lines_by_contributor: BTreeMap::from([("Ann".into(), 4)]),
            },
        );

        dataset.history.push(CommitRecord {
            sha: "0123456789012345678901234567890123456789".into(),
            parents: vec![],
            tree: "2222222222222222222222222222222222222222".into(),
            contributor: "Ann (ann@example.com)".into(),
            date: when,
            message: "Initial commit\n\nWith body".into(),
            insertions: 12,
            deletions: 0,
            files: BTreeMap::from([(
                "src/main.rs".into(),
                FileChange {
                    insertions: 12,
                    deletions: 0,
                    lines: 12,
                },
            )]),
        });
        dataset.reduce_active_lines();
        dataset
    }

    #[test]
    fn test_reduce_active_lines_sums_across_files() {
        let dataset = sample_dataset();
        assert_eq!(dataset.contributors["Ann"].active_lines, 12);
        assert_eq!(dataset.contributors["Bob"].active_lines, 2);
    }

    #[test]
    fn test_reduce_ignores_blame_only_authors() {
        let mut dataset = sample_dataset();
        dataset
            .files
            .get_mut("README.md")
            .unwrap()
            .lines_by_contributor
            .insert("Carol".into(), 5);
        dataset.reduce_active_lines();
        assert!(!dataset.contributors.contains_key("Carol"));
        assert_eq!(dataset.contributors["Ann"].active_lines, 12);
    }

    #[test]
    fn test_collector_metadata_capture() {
        let meta = CollectorMetadata::capture();
        assert_eq!(meta.version, TOOL_VERSION);
        assert!(!meta.user.is_empty());
        assert!(!meta.hostname.is_empty());
        assert!(meta.platform.contains(std::env::consts::OS));
        assert!(meta.git_version.starts_with("libgit2 "));
        assert_ne!(meta.date_collected.timestamp(), 0);
    }

    #[test]
    fn test_record_commit_merges_identities() {
        let mut profile = ContributorProfile::default();
        profile.record_commit("a@x.com", 5, 1);
        profile.record_commit("a@y.com", 2, 2);
        profile.record_commit("a@x.com", 0, 0);
        assert_eq!(profile.commit_count, 3);
        assert_eq!(profile.insertions, 7);
        assert_eq!(profile.deletions, 3);
        assert_eq!(profile.identities.len(), 2);
    }

    #[test]
    fn test_commit_record_helpers() {
        let dataset = sample_dataset();
        let commit = &dataset.history[0];
        assert_eq!(commit.summary(), "Initial commit");
        assert_eq!(commit.short_sha(), "01234567");
        assert_eq!(dataset.total_insertions(), 12);
        assert_eq!(dataset.total_lines(), 14);
    }
}

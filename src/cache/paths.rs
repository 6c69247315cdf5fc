//! Cache path utilities - datasets live under ~/.cache/repocensus/<repo-hash>/

use std::path::{Path, PathBuf};

/// Root directory holding every repository's cache.
///
/// `override_dir` wins when given; otherwise ~/.cache/repocensus on Unix,
/// %LOCALAPPDATA%/repocensus on Windows.
pub fn cache_root(override_dir: Option<&Path>) -> PathBuf {
    if let Some(dir) = override_dir {
        return dir.to_path_buf();
    }

    let base = if cfg!(windows) {
        std::env::var("LOCALAPPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".")))
    } else {
        dirs::cache_dir().unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".cache"))
                .unwrap_or_else(|| PathBuf::from("."))
        })
    };

    base.join("repocensus")
}

/// Cache directory for one repository under `root`.
pub fn repo_cache_dir(root: &Path, repo_path: &Path) -> PathBuf {
    root.join(hash_path(repo_path))
}

/// File name of the cached dataset for a snapshot SHA.
pub fn entry_file_name(sha: &str) -> String {
    format!("{}.bin.gz", sha)
}

/// Hash a path to create a unique but deterministic directory name.
/// Uses the canonical path so `.` and an absolute path agree.
fn hash_path(path: &Path) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

    let mut hasher = DefaultHasher::new();
    canonical.to_string_lossy().hash(&mut hasher);
    let hash = hasher.finish();

    let repo_name = canonical
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("repo")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .take(20)
        .collect::<String>();

    format!("{}-{:012x}", repo_name, hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_path_deterministic() {
        let path = Path::new("/tmp/some-repo");
        assert_eq!(hash_path(path), hash_path(path));
        assert_ne!(hash_path(path), hash_path(Path::new("/tmp/other-repo")));
    }

    #[test]
    fn test_repo_cache_dir_format() {
        let dir = repo_cache_dir(Path::new("/cache"), Path::new("/home/user/my-project"));
        assert!(dir.starts_with("/cache"));
        assert!(dir.to_string_lossy().contains("my-project-"));
    }

    #[test]
    fn test_cache_root_override() {
        assert_eq!(cache_root(Some(Path::new("/x/y"))), PathBuf::from("/x/y"));
        assert!(cache_root(None).ends_with("repocensus"));
    }

    #[test]
    fn test_entry_file_name() {
        assert_eq!(entry_file_name("abc123"), "abc123.bin.gz");
    }
}

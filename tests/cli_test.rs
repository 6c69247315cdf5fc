//! CLI contract tests
//!
//! Runs the built binary against throwaway repositories and checks exit
//! codes, output files and cache handling.

use git2::{IndexAddOption, Repository, Signature, Time};
use std::path::Path;
use std::process::{Command, Output};

fn repocensus_bin() -> String {
    env!("CARGO_BIN_EXE_repocensus").to_string()
}

fn setup_test_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.rs"), "fn main() {\n    println!(\"hi\");\n}\n").unwrap();
    std::fs::write(dir.path().join("README.md"), "# Demo\n").unwrap();

    let repo = Repository::init(dir.path()).unwrap();
    let mut index = repo.index().unwrap();
    index.add_all(["*"], IndexAddOption::DEFAULT, None).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::new("Ann", "ann@example.com", &Time::new(1_700_000_000, 0)).unwrap();
    repo.commit(Some("HEAD"), &sig, &sig, "init", &tree, &[])
        .unwrap();

    dir
}

fn run(cwd: &Path, cache: &Path, args: &[&str]) -> Output {
    Command::new(repocensus_bin())
        .args(args)
        .arg("--cache-dir")
        .arg(cache)
        .current_dir(cwd)
        .env_remove("REPOCENSUS_NO_CACHE")
        .env_remove("REPOCENSUS_WORKERS")
        .env_remove("REPOCENSUS_CACHE_DIR")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run repocensus")
}

fn cache_entries(cache: &Path) -> usize {
    walk_files(cache)
        .iter()
        .filter(|p| p.to_string_lossy().ends_with(".bin.gz"))
        .count()
}

fn walk_files(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(walk_files(&path));
            } else {
                files.push(path);
            }
        }
    }
    files
}

#[test]
fn collect_succeeds_and_caches() {
    let repo = setup_test_repo();
    let cache = tempfile::tempdir().unwrap();
    let repo_arg = repo.path().to_str().unwrap();

    let output = run(repo.path(), cache.path(), &["collect", repo_arg]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("fresh"));
    assert_eq!(cache_entries(cache.path()), 1);

    let output = run(repo.path(), cache.path(), &["collect", repo_arg]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("from cache"));
}

#[test]
fn collect_rejects_invalid_paths() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let file = tmp.path().join("file.txt");
    std::fs::write(&file, "x").unwrap();
    let missing = tmp.path().join("missing");

    for path in [missing.as_path(), file.as_path(), tmp.path()] {
        let output = run(tmp.path(), cache.path(), &["collect", path.to_str().unwrap()]);
        assert!(!output.status.success(), "accepted {}", path.display());
    }
}

#[test]
fn report_json_to_custom_path() {
    let repo = setup_test_repo();
    let cache = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("nested/stats.json");

    let output = run(
        repo.path(),
        cache.path(),
        &[
            "report",
            repo.path().to_str().unwrap(),
            "json",
            "--output-file-path",
            target.to_str().unwrap(),
        ],
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&target).unwrap()).unwrap();
    assert_eq!(json["history"].as_array().unwrap().len(), 1);
    assert_eq!(json["contributors"]["Ann"]["active_lines"], 4);
    assert!(json["files"]["main.rs"].is_object());
}

#[test]
fn report_html_default_path() {
    let repo = setup_test_repo();
    let cache = tempfile::tempdir().unwrap();
    let cwd = tempfile::tempdir().unwrap();

    let output = run(cwd.path(), cache.path(), &["report", repo.path().to_str().unwrap(), "html"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let html = std::fs::read_to_string(cwd.path().join("repocensus-report.html")).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("README.md"));
}

// dirs only reads XDG_CONFIG_HOME on Linux
#[cfg(target_os = "linux")]
#[test]
fn invalid_config_format_falls_back_to_html() {
    let repo = setup_test_repo();
    let cache = tempfile::tempdir().unwrap();
    let cwd = tempfile::tempdir().unwrap();
    let xdg = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(xdg.path().join("repocensus")).unwrap();
    std::fs::write(
        xdg.path().join("repocensus/config.toml"),
        "[report]\nformat = \"pdf\"\n",
    )
    .unwrap();

    let output = Command::new(repocensus_bin())
        .args(["report", repo.path().to_str().unwrap(), "--cache-dir"])
        .arg(cache.path())
        .current_dir(cwd.path())
        .env("XDG_CONFIG_HOME", xdg.path())
        .env_remove("REPOCENSUS_NO_CACHE")
        .env_remove("REPOCENSUS_WORKERS")
        .env_remove("REPOCENSUS_CACHE_DIR")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run repocensus");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Ignoring [report] format"));
    assert!(cwd.path().join("repocensus-report.html").is_file());
}

#[test]
fn report_rejects_unknown_format() {
    let repo = setup_test_repo();
    let cache = tempfile::tempdir().unwrap();
    let output = run(repo.path(), cache.path(), &["report", repo.path().to_str().unwrap(), "pdf"]);
    assert!(!output.status.success());
}

#[test]
fn no_cache_writes_nothing() {
    let repo = setup_test_repo();
    let cache = tempfile::tempdir().unwrap();
    let output = run(
        repo.path(),
        cache.path(),
        &["--no-cache", "collect", repo.path().to_str().unwrap()],
    );
    assert!(output.status.success());
    assert_eq!(cache_entries(cache.path()), 0);
}

#[test]
fn clean_respects_dry_run() {
    let repo = setup_test_repo();
    let cache = tempfile::tempdir().unwrap();
    let repo_arg = repo.path().to_str().unwrap();

    assert!(run(repo.path(), cache.path(), &["collect", repo_arg]).status.success());
    assert_eq!(cache_entries(cache.path()), 1);

    let output = run(repo.path(), cache.path(), &["clean", repo_arg, "--dry-run"]);
    assert!(output.status.success());
    assert_eq!(cache_entries(cache.path()), 1);

    let output = run(repo.path(), cache.path(), &["clean", repo_arg]);
    assert!(output.status.success());
    assert_eq!(cache_entries(cache.path()), 0);

    assert!(run(repo.path(), cache.path(), &["collect", repo_arg]).status.success());
    let output = run(repo.path(), cache.path(), &["clean", repo_arg, "--all"]);
    assert!(output.status.success());
    assert_eq!(cache_entries(cache.path()), 0);
}

#[test]
fn version_prints_package_version() {
    let tmp = tempfile::tempdir().unwrap();
    let output = run(tmp.path(), tmp.path(), &["version"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(env!("CARGO_PKG_VERSION")));
}

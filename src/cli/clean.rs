//! Clean command - remove cached datasets

use crate::collector::{repository_cache, CollectOptions, Collector};
use anyhow::{Context, Result};
use console::style;
use std::path::Path;

pub fn run(path: &Path, all: bool, dry_run: bool, options: &CollectOptions) -> Result<()> {
    if all {
        clean_all(path, dry_run, options)
    } else {
        clean_head(path, dry_run, options)
    }
}

fn clean_head(path: &Path, dry_run: bool, options: &CollectOptions) -> Result<()> {
    let collector = Collector::open(path, options.clone())
        .with_context(|| format!("Cannot open {}", path.display()))?;
    let sha = &collector.snapshot().sha;
    let entry = collector.cache().entry_path(sha);

    if !entry.exists() {
        println!("No cached dataset for HEAD ({}).", sha);
        return Ok(());
    }

    println!("Found cached dataset for HEAD:");
    println!("  {}", entry.display());

    if dry_run {
        println!("\nDry run - nothing removed. Run without --dry-run to delete.");
        return Ok(());
    }

    collector.clear_cache()?;
    println!("\n{} Removed: {}", style("✓").green(), entry.display());
    Ok(())
}

fn clean_all(path: &Path, dry_run: bool, options: &CollectOptions) -> Result<()> {
    let cache = repository_cache(path, options)
        .with_context(|| format!("Cannot open {}", path.display()))?;
    let found = cache.entries()?;

    if found.is_empty() {
        println!("No cached datasets found.");
        return Ok(());
    }

    println!(
        "Found {} cached dataset{}:",
        found.len(),
        if found.len() == 1 { "" } else { "s" }
    );
    for entry in &found {
        println!("  {}", entry.display());
    }

    if dry_run {
        println!("\nDry run - nothing removed. Run without --dry-run to delete.");
        return Ok(());
    }

    cache.clear()?;
    println!(
        "\n{} Cleaned {} dataset{}.",
        style("✓").green(),
        found.len(),
        if found.len() == 1 { "" } else { "s" }
    );
    Ok(())
}

//! Collect command - gather and cache statistics for HEAD

use crate::collector::{CollectOptions, CollectOutcome, Collector, DataSource};
use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::{Duration, Instant};

/// Run the collect command
pub fn run(path: &Path, options: CollectOptions) -> Result<()> {
    let start = Instant::now();
    let outcome = collect_dataset(path, options)?;
    let dataset = &outcome.dataset;
    let snapshot = &dataset.metadata.snapshot;

    let source = match outcome.source {
        DataSource::Cache => "from cache",
        DataSource::Fresh => "fresh",
    };
    println!(
        "{} Collected {} ({}) {} in {:.1}s",
        style("✓").green(),
        style(&snapshot.sha[..snapshot.sha.len().min(12)]).cyan(),
        snapshot.branch,
        source,
        start.elapsed().as_secs_f64()
    );
    println!(
        "  {} commits, {} contributors, {} files, {} lines",
        style(dataset.history.len()).cyan(),
        style(dataset.contributors.len()).cyan(),
        style(dataset.files.len()).cyan(),
        style(dataset.total_lines()).cyan()
    );
    Ok(())
}

/// Open the repository and collect its dataset, with terminal progress.
pub(super) fn collect_dataset(path: &Path, options: CollectOptions) -> Result<CollectOutcome> {
    let mut collector = Collector::open(path, options)
        .with_context(|| format!("Cannot collect statistics for {}", path.display()))?;

    let bar = ProgressBar::new_spinner();
    bar.set_style(create_spinner_style());
    bar.set_message("Walking history...");
    bar.enable_steady_tick(Duration::from_millis(100));

    let progress = |done: usize, total: usize| {
        if done == 1 {
            bar.set_style(create_bar_style());
            bar.set_length(total as u64);
            bar.set_message("blaming files");
        }
        bar.set_position(done as u64);
    };

    let result = collector.collect(Some(&progress));
    bar.finish_and_clear();
    let outcome = result.context("Collection failed")?;

    if let Some(err) = &outcome.cache_write_error {
        eprintln!(
            "{} could not cache dataset: {}",
            style("warning:").yellow().bold(),
            err
        );
    }

    Ok(outcome)
}

/// Create spinner progress style
fn create_spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Create bar progress style
fn create_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░  ")
}

//! Report command - render a dataset to HTML or JSON

use super::collect::collect_dataset;
use crate::collector::CollectOptions;
use crate::reporters::{self, OutputFormat};
use anyhow::{Context, Result};
use console::style;
use std::path::{Path, PathBuf};

/// Run the report command
pub fn run(
    path: &Path,
    format: OutputFormat,
    output: Option<PathBuf>,
    options: CollectOptions,
) -> Result<()> {
    let outcome = collect_dataset(path, options)?;
    let rendered = reporters::report_with_format(&outcome.dataset, format)
        .with_context(|| format!("Failed to render {} report", format))?;

    let output = output.unwrap_or_else(|| reporters::default_output_path(format));
    write_report(&output, &rendered)?;

    println!(
        "{} {} report written to {}",
        style("✓").green(),
        format,
        style(output.display()).cyan()
    );
    Ok(())
}

fn write_report(output: &Path, content: &str) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(output, content)
        .with_context(|| format!("Failed to write report to {}", output.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_report_creates_parents() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("nested/dir/report.json");
        write_report(&out, "{}").unwrap();
        assert_eq!(std::fs::read_to_string(out).unwrap(), "{}");
    }
}

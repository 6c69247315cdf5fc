//! Output reporters for collected datasets
//!
//! Supports two output formats:
//! - `html` - Standalone HTML report with tables and charts
//! - `json` - Machine-readable JSON of the full dataset

mod html;
mod json;

use crate::models::AggregateDataset;
use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Html,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "html" | "htm" => Ok(OutputFormat::Html),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!("Unknown format '{}'. Valid formats: html, json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Html => write!(f, "html"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Render a dataset in the specified format
pub fn report(dataset: &AggregateDataset, format: &str) -> Result<String> {
    report_with_format(dataset, OutputFormat::from_str(format)?)
}

/// Render a dataset using an OutputFormat enum
pub fn report_with_format(dataset: &AggregateDataset, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Html => html::render(dataset),
        OutputFormat::Json => json::render(dataset),
    }
}

/// Get the file extension for a format
pub fn file_extension(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Html => "html",
        OutputFormat::Json => "json",
    }
}

/// Report path used when none is given: `repocensus-report.<ext>`
pub fn default_output_path(format: OutputFormat) -> PathBuf {
    PathBuf::from(format!("repocensus-report.{}", file_extension(format)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::sample_dataset;

    #[test]
    fn test_format_parsing() {
        assert_eq!(OutputFormat::from_str("html").unwrap(), OutputFormat::Html);
        assert_eq!(OutputFormat::from_str("JSON").unwrap(), OutputFormat::Json);
        assert!(OutputFormat::from_str("sarif").is_err());
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(OutputFormat::Html),
            PathBuf::from("repocensus-report.html")
        );
        assert_eq!(
            default_output_path(OutputFormat::Json),
            PathBuf::from("repocensus-report.json")
        );
    }

    #[test]
    fn test_report_dispatch() {
        let dataset = sample_dataset();
        assert!(report(&dataset, "json").unwrap().trim_start().starts_with('{'));
        assert!(report(&dataset, "html").unwrap().starts_with("<!DOCTYPE html>"));
        assert!(report(&dataset, "xml").is_err());
    }
}

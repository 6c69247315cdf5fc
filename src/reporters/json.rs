//! JSON reporter
//!
//! Outputs the full AggregateDataset as pretty-printed JSON.

use crate::models::AggregateDataset;
use anyhow::Result;

/// Render dataset as JSON
pub fn render(dataset: &AggregateDataset) -> Result<String> {
    Ok(serde_json::to_string_pretty(dataset)?)
}

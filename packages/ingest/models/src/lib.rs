#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Extraction run configuration and result types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for an extraction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Directory the per-table delimited files are written to.
    pub output_dir: PathBuf,
    /// Output field delimiter.
    pub delimiter: u8,
    /// Only extract these format ids. `None` extracts every configured
    /// format.
    pub formats: Option<Vec<String>>,
    /// Use reading-order PDF extraction instead of the layout-preserving
    /// collaborator.
    pub reading_order: bool,
    /// Also write the per-document JSON diagnostics report.
    pub report: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            delimiter: b',',
            formats: None,
            reading_order: false,
            report: false,
        }
    }
}

/// Per-table outcome of one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSummary {
    /// The format id.
    pub format_id: String,
    /// Surviving records emitted for this table.
    pub records: u64,
    /// Where the table was written, when it had records.
    pub output: Option<PathBuf>,
}

/// Result of extracting one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractResult {
    /// The source document.
    pub document: PathBuf,
    /// Per-table outcomes, in registry order.
    pub tables: Vec<TableSummary>,
    /// Blocks dropped whole.
    pub blocks_skipped: u64,
    /// Data rows dropped.
    pub rows_rejected: u64,
    /// Repeated blocks consumed and discarded.
    pub duplicate_blocks: u64,
    /// Records replaced by later same-key records.
    pub replaced_records: u64,
    /// How long extraction and parsing took.
    pub duration: Duration,
}

impl ExtractResult {
    /// Total records across all tables.
    #[must_use]
    pub fn record_count(&self) -> u64 {
        self.tables.iter().map(|t| t.records).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_extracts_everything_with_commas() {
        let config = ExtractConfig::default();
        assert_eq!(config.delimiter, b',');
        assert!(config.formats.is_none());
        assert!(!config.reading_order);
    }

    #[test]
    fn record_count_sums_tables() {
        let result = ExtractResult {
            document: PathBuf::from("report.pdf"),
            tables: vec![
                TableSummary {
                    format_id: "a".to_owned(),
                    records: 3,
                    output: None,
                },
                TableSummary {
                    format_id: "b".to_owned(),
                    records: 4,
                    output: None,
                },
            ],
            blocks_skipped: 0,
            rows_rejected: 0,
            duplicate_blocks: 0,
            replaced_records: 0,
            duration: Duration::from_secs(1),
        };
        assert_eq!(result.record_count(), 7);
    }
}

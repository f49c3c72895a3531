//! Per-document diagnostics: what was skipped, rejected, or silently
//! repaired while parsing.
//!
//! Partial success is the default outcome — block- and row-level problems
//! never abort a document. They are recorded here and reported alongside
//! the successfully emitted records.

use ledger_lift_report_models::Period;
use serde::Serialize;
use strum_macros::{AsRefStr, Display};

/// How severe a recorded diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// A whole block was dropped (missing header, missing period).
    BlockSkip,
    /// A single data row was dropped (bad key, failed required parse).
    RowReject,
}

/// One recorded skip or reject.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// Skip or reject.
    pub severity: Severity,
    /// The format the problem occurred in, when known.
    pub table_type: Option<String>,
    /// The period in force, rendered as its `Mon-YY` tag.
    pub period: Option<String>,
    /// 1-based document line number, when the problem is line-scoped.
    pub line: Option<usize>,
    /// What went wrong.
    pub message: String,
}

/// Counters for corrective actions that are not errors but should still be
/// auditable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairCounts {
    /// Numeric/date tokens whose digit-lookalike characters were replaced.
    pub ocr_repairs: u64,
    /// Columns placed by equal-width division because their header label
    /// could not be located.
    pub layout_fallbacks: u64,
    /// Wrapped lines merged into their preceding row.
    pub continuation_merges: u64,
}

/// Everything the engine counted and recorded while parsing one document.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    /// Blocks dropped whole.
    pub blocks_skipped: u64,
    /// Data rows dropped.
    pub rows_rejected: u64,
    /// Blocks consumed but discarded because their `(table_type, period)`
    /// was already processed.
    pub duplicate_blocks: u64,
    /// Records replaced by a later record with the same dedup key.
    pub replaced_records: u64,
    /// Silent-repair counters.
    pub repairs: RepairCounts,
    /// The recorded skips and rejects, in document order.
    pub entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Records a block-level skip.
    pub fn block_skip(
        &mut self,
        table_type: &str,
        period: Option<Period>,
        line: Option<usize>,
        message: impl Into<String>,
    ) {
        let message = message.into();
        log::warn!("[{table_type}] block skipped: {message}");
        self.blocks_skipped += 1;
        self.entries.push(Diagnostic {
            severity: Severity::BlockSkip,
            table_type: Some(table_type.to_owned()),
            period: period.map(|p| p.to_string()),
            line,
            message,
        });
    }

    /// Records a row-level reject.
    pub fn row_reject(
        &mut self,
        table_type: &str,
        period: Option<Period>,
        line: usize,
        message: impl Into<String>,
    ) {
        let message = message.into();
        log::debug!("[{table_type}] line {line} rejected: {message}");
        self.rows_rejected += 1;
        self.entries.push(Diagnostic {
            severity: Severity::RowReject,
            table_type: Some(table_type.to_owned()),
            period: period.map(|p| p.to_string()),
            line: Some(line),
            message,
        });
    }

    /// Counts a duplicate block consumed and discarded by the scanner.
    pub fn duplicate_block(&mut self, table_type: &str, period: Option<Period>) {
        log::debug!(
            "[{table_type}] discarding repeated block for {}",
            period.map_or_else(|| "<no period>".to_owned(), |p| p.to_string())
        );
        self.duplicate_blocks += 1;
    }

    /// Counts an OCR digit-lookalike repair.
    pub const fn ocr_repair(&mut self) {
        self.repairs.ocr_repairs += 1;
    }

    /// Counts `columns` placed by the equal-width layout fallback.
    pub fn layout_fallback(&mut self, table_type: &str, columns: u64) {
        log::warn!("[{table_type}] {columns} column(s) placed by equal-width fallback");
        self.repairs.layout_fallbacks += columns;
    }

    /// Counts a continuation line merged into its preceding row.
    pub const fn continuation_merge(&mut self) {
        self.repairs.continuation_merges += 1;
    }

    /// Counts a record replaced by a later one with the same key.
    pub const fn replaced_record(&mut self) {
        self.replaced_records += 1;
    }

    /// Whether any skip or reject was recorded.
    #[must_use]
    pub fn has_problems(&self) -> bool {
        !self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_skip_records_entry_and_counter() {
        let mut diags = Diagnostics::default();
        diags.block_skip("site_status", None, Some(12), "header not located");
        assert_eq!(diags.blocks_skipped, 1);
        assert_eq!(diags.entries.len(), 1);
        assert_eq!(diags.entries[0].severity, Severity::BlockSkip);
        assert_eq!(diags.entries[0].line, Some(12));
    }

    #[test]
    fn repair_counters_do_not_create_entries() {
        let mut diags = Diagnostics::default();
        diags.ocr_repair();
        diags.continuation_merge();
        diags.layout_fallback("site_status", 3);
        assert_eq!(diags.repairs.ocr_repairs, 1);
        assert_eq!(diags.repairs.continuation_merges, 1);
        assert_eq!(diags.repairs.layout_fallbacks, 3);
        assert!(!diags.has_problems());
    }

    #[test]
    fn period_renders_as_tag() {
        let mut diags = Diagnostics::default();
        let period: Period = "Mar-22".parse().unwrap();
        diags.row_reject("site_status", Some(period), 40, "bad key");
        assert_eq!(diags.entries[0].period.as_deref(), Some("Mar-22"));
    }
}

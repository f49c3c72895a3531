#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Layout table extraction engine.
//!
//! Recovers structured tabular records from positionally-laid-out plain
//! text extracted from government PDF reports. One generic pipeline —
//! page segmentation, section scanning, column-layout inference, row
//! slicing, token classification, record assembly, deduplication — is
//! parameterized entirely by [`ledger_lift_format`] definitions; there is
//! no per-report code.
//!
//! Parsing one document is a single synchronous pass in page order:
//! period context, the block ledger, and the dedup maps are document-
//! scoped state created fresh by [`parse_document`], so independent
//! documents can be parsed on separate threads with no shared state.

pub mod assemble;
pub mod dedup;
pub mod diagnostics;
pub mod layout;
pub mod page;
pub mod scan;
pub mod slice;
pub mod token;

use ledger_lift_format::FormatDefinition;
use ledger_lift_report_models::Record;
use regex::RegexBuilder;

use crate::assemble::assemble_block;
use crate::dedup::{BlockLedger, Deduper};
use crate::diagnostics::Diagnostics;
use crate::page::{PeriodPatterns, pages};
use crate::scan::{CompiledFormat, SectionScanner};

/// Errors that can occur while preparing the engine for a document.
///
/// Parsing itself never fails: block- and row-level problems are recorded
/// as [`Diagnostics`] and partial success is the default outcome.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A configured pattern failed to compile.
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Section titles that bound blocks but are not parsed as tables
/// themselves (report parts outside the configured formats).
const DEFAULT_STOP_PATTERNS: &[&str] = &[
    r"^Installed\s+Assets\s+by\s+Location\b",
    r"^REGION\s+FONUM\s+FOSHORT\b",
    r"^Years\s+in\s+Storage\b",
    r"^Monthly\s+Summary\s+by\s+Location\b",
    r"^Loc\s+PLACE\s+REGION\s+SVC\b",
];

/// Document-level parse options.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Extra period announcement patterns (must expose `month` and
    /// `year` capture groups), tried after the built-in ones.
    pub period_patterns: Vec<String>,
    /// Extra next-section stop patterns, in addition to the built-in
    /// catch-all titles.
    pub stop_patterns: Vec<String>,
}

/// The records recovered for one table type, in output order.
#[derive(Debug, Clone)]
pub struct TableOutput {
    /// The format id, doubling as the output table name.
    pub format_id: String,
    /// Surviving records, ordered per the format's sort contract.
    pub records: Vec<Record>,
}

/// Everything one document yields: per-table records plus diagnostics.
#[derive(Debug, Clone, Default)]
pub struct DocumentOutput {
    /// One entry per configured format, in registry order. Formats the
    /// document never mentioned have empty record lists.
    pub tables: Vec<TableOutput>,
    /// Skips, rejects, and repair counters recorded during the pass.
    pub diagnostics: Diagnostics,
}

impl DocumentOutput {
    /// The output for a given format id, if it was configured.
    #[must_use]
    pub fn table(&self, format_id: &str) -> Option<&TableOutput> {
        self.tables.iter().find(|t| t.format_id == format_id)
    }

    /// Total surviving records across all tables.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.tables.iter().map(|t| t.records.len()).sum()
    }
}

/// Parses one document's extracted text against the given formats.
///
/// # Errors
///
/// Returns [`EngineError`] only for configuration problems (a pattern
/// that fails to compile). Content problems never fail the document —
/// they are aggregated into [`DocumentOutput::diagnostics`].
pub fn parse_document(
    text: &str,
    formats: &[FormatDefinition],
    options: &ParseOptions,
) -> Result<DocumentOutput, EngineError> {
    let compiled: Vec<CompiledFormat> = formats
        .iter()
        .map(CompiledFormat::compile)
        .collect::<Result<_, _>>()?;
    let period_patterns = PeriodPatterns::compile(&options.period_patterns)?;

    let mut stops = Vec::new();
    for pattern in DEFAULT_STOP_PATTERNS
        .iter()
        .copied()
        .chain(options.stop_patterns.iter().map(String::as_str))
    {
        stops.push(RegexBuilder::new(pattern).case_insensitive(true).build()?);
    }

    let mut ledger = BlockLedger::default();
    let mut diagnostics = Diagnostics::default();
    let mut scanner = SectionScanner::new(&compiled, stops);
    for page in pages(text, &period_patterns) {
        scanner.push_page(&page, &mut ledger, &mut diagnostics);
    }
    let blocks = scanner.finish(&mut ledger);
    log::info!(
        "scanned {} block(s) across {} format(s)",
        blocks.len(),
        compiled.len()
    );

    let mut dedupers: Vec<Deduper> = compiled.iter().map(|_| Deduper::default()).collect();
    for block in &blocks {
        for record in assemble_block(block, &compiled[block.format], &mut diagnostics) {
            if dedupers[block.format].insert(record) {
                diagnostics.replaced_record();
            }
        }
    }

    let tables = compiled
        .iter()
        .zip(dedupers)
        .map(|(format, deduper)| TableOutput {
            format_id: format.def.id.clone(),
            records: deduper.into_records(format.def.sort),
        })
        .collect();

    Ok(DocumentOutput {
        tables,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use ledger_lift_format::all_formats;

    use super::*;

    fn parse(text: &str) -> DocumentOutput {
        parse_document(text, &all_formats(), &ParseOptions::default()).unwrap()
    }

    #[test]
    fn full_document_yields_tables_and_diagnostics() {
        let text = "\
EGMs by Region, Service for month of March 2022
Europe   10   100   200   300   55%
Japan    5    50    60    110   45%
EGMs by Field Office
Europe
1   HEIDELBERG   120  10  5  3  138
";
        let output = parse(text);
        assert_eq!(output.table("egms_by_region_service").unwrap().records.len(), 2);
        assert_eq!(output.table("egms_by_field_office").unwrap().records.len(), 1);
        assert_eq!(output.record_count(), 3);
    }

    #[test]
    fn repeated_month_block_contributes_zero_records() {
        // Two Mar-22 blocks for the same table: the second one's rows must
        // not produce records; the first block's records stand.
        let text = "\
EGMs by Region, Service for month of March 2022
Europe   10   100   200   300   55%
\u{000C}EGMs by Region, Service
Europe   99   999   999   999   99%
Japan    99   999   999   999   99%
Korea    99   999   999   999   99%
";
        let output = parse(text);
        let table = output.table("egms_by_region_service").unwrap();
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0].canonical("locations"), "10");
        assert_eq!(output.diagnostics.duplicate_blocks, 1);
    }

    #[test]
    fn later_rows_replace_earlier_within_a_period() {
        // The same location printed twice in one block: the later row is
        // the correction and wins, keeping first-seen position.
        let text = "\
Statement of Financial Condition
For the Month Ended January 31, 2021
                                     Balance
CURRENT ASSETS
CASH IN BANK                         1,000
CASH IN BANK                         2,000
";
        let output = parse(text);
        let table = output.table("financial_statement").unwrap();
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0].canonical("balance"), "20");
        assert_eq!(output.diagnostics.replaced_records, 1);
    }

    #[test]
    fn unconfigured_sections_are_ignored() {
        let text = "\
Years in Storage (EGMs Only) for month of March 2022
0   1  2  3
1   4  5  6
";
        let output = parse(text);
        assert_eq!(output.record_count(), 0);
    }

    #[test]
    fn pattern_errors_surface_as_engine_errors() {
        let options = ParseOptions {
            stop_patterns: vec!["](".to_owned()],
            ..ParseOptions::default()
        };
        assert!(parse_document("", &all_formats(), &options).is_err());
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Delimited-text emission for recovered records.
//!
//! One table per format: a header row matching the schema's visible field
//! names (plus a trailing `month` column for the record's period tag),
//! then one row per record in the order the engine produced them.

use std::io::Write;
use std::path::Path;

use ledger_lift_format::FormatDefinition;
use ledger_lift_report_models::Record;

/// Errors writing a table.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// The trailing column carrying each record's period tag.
const PERIOD_COLUMN: &str = "month";

/// Writes one format's records to a delimited-text file. Returns the
/// number of data rows written.
///
/// # Errors
///
/// Returns [`EmitError`] if the file cannot be created or written.
pub fn write_table(
    path: &Path,
    def: &FormatDefinition,
    records: &[Record],
    delimiter: u8,
) -> Result<usize, EmitError> {
    let file = std::fs::File::create(path)?;
    let rows = write_to(file, def, records, delimiter)?;
    log::info!(
        "[{}] wrote {rows} record(s) to {}",
        def.id,
        path.display()
    );
    Ok(rows)
}

/// Writes one format's records to any writer (the testable core of
/// [`write_table`]).
///
/// # Errors
///
/// Returns [`EmitError`] if serialization or the underlying writer fails.
pub fn write_to<W: Write>(
    writer: W,
    def: &FormatDefinition,
    records: &[Record],
    delimiter: u8,
) -> Result<usize, EmitError> {
    let mut csv = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);

    let visible: Vec<&str> = def
        .fields
        .iter()
        .filter(|f| !f.hidden)
        .map(|f| f.name.as_str())
        .collect();

    let mut header: Vec<&str> = visible.clone();
    header.push(PERIOD_COLUMN);
    csv.write_record(&header)?;

    for record in records {
        let mut row: Vec<String> = visible
            .iter()
            .map(|field| record.canonical(field))
            .collect();
        row.push(
            record
                .period
                .map(|p| p.to_string())
                .unwrap_or_default(),
        );
        csv.write_record(&row)?;
    }
    csv.flush()?;
    Ok(records.len())
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Library for extracting structured tables from government report
//! documents into delimited-text files.
//!
//! One document is one independent unit of work: text acquisition, a
//! single synchronous parse pass, and emission share no state with any
//! other document, so [`process_documents`] runs them on parallel
//! blocking workers and streams results back as they complete.

use std::path::{Path, PathBuf};
use std::time::Instant;

use ledger_lift_engine::{EngineError, ParseOptions, parse_document};
use ledger_lift_extract::{ExtractError, ExtractionMode, extract_text};
use ledger_lift_format::FormatDefinition;
use ledger_lift_ingest_models::{ExtractConfig, ExtractResult, TableSummary};

/// Errors that abort processing of one document.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Text acquisition failed (fatal for the document by contract).
    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// Engine configuration failed (bad pattern).
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Writing an output table failed.
    #[error("Emit error: {0}")]
    Emit(#[from] ledger_lift_emit::EmitError),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing the diagnostics report failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Returns all configured table formats from the TOML registry.
#[must_use]
pub fn all_table_formats() -> Vec<FormatDefinition> {
    ledger_lift_format::registry::all_formats()
}

/// Returns the formats to extract, filtered by the `--formats` CLI flag
/// or the `LEDGER_LIFT_FORMATS` environment variable. If neither is set,
/// all formats are returned.
#[must_use]
pub fn selected_formats(cli_filter: Option<String>) -> Vec<FormatDefinition> {
    let filter = cli_filter.or_else(|| std::env::var("LEDGER_LIFT_FORMATS").ok());

    let all = all_table_formats();

    let Some(filter_str) = filter else {
        return all;
    };

    let ids: Vec<&str> = filter_str.split(',').map(str::trim).collect();

    let filtered: Vec<FormatDefinition> = all
        .into_iter()
        .filter(|f| ids.contains(&f.id.as_str()))
        .collect();

    if filtered.is_empty() {
        log::warn!(
            "No matching formats found for filter {:?}. Available: {}",
            ids,
            all_table_formats()
                .iter()
                .map(|f| f.id.clone())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    filtered
}

/// Finds the report documents (`.pdf` / `.txt`) in a directory, sorted
/// by name.
///
/// # Errors
///
/// Returns [`IngestError::Io`] if the directory cannot be read.
pub fn discover_documents(dir: &Path) -> Result<Vec<PathBuf>, IngestError> {
    let mut documents = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_document = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf") || ext.eq_ignore_ascii_case("txt"));
        if is_document {
            documents.push(path);
        }
    }
    documents.sort();
    Ok(documents)
}

/// Extracts, parses, and emits one document.
///
/// # Errors
///
/// Returns [`IngestError`] for fatal problems only (acquisition, I/O,
/// configuration). Content problems are diagnostics: the document still
/// succeeds with whatever records survived.
pub fn process_document(path: &Path, config: &ExtractConfig) -> Result<ExtractResult, IngestError> {
    let start = Instant::now();
    let mode = if config.reading_order {
        ExtractionMode::ReadingOrder
    } else {
        ExtractionMode::Layout
    };
    let text = extract_text(path, mode)?;
    let formats = selected_formats(config.formats.as_ref().map(|ids| ids.join(",")));
    let output = parse_document(&text, &formats, &ParseOptions::default())?;

    std::fs::create_dir_all(&config.output_dir)?;
    let stem = path.file_stem().map_or_else(
        || "document".to_owned(),
        |s| s.to_string_lossy().into_owned(),
    );

    let mut tables = Vec::with_capacity(output.tables.len());
    for table in &output.tables {
        let out_path = if table.records.is_empty() {
            None
        } else {
            let Some(def) = formats.iter().find(|f| f.id == table.format_id) else {
                continue;
            };
            let out_path = config
                .output_dir
                .join(format!("{stem}_{}.csv", table.format_id));
            ledger_lift_emit::write_table(&out_path, def, &table.records, config.delimiter)?;
            Some(out_path)
        };
        tables.push(TableSummary {
            format_id: table.format_id.clone(),
            records: table.records.len() as u64,
            output: out_path,
        });
    }

    if config.report {
        let report_path = config.output_dir.join(format!("{stem}_report.json"));
        let file = std::fs::File::create(&report_path)?;
        serde_json::to_writer_pretty(file, &output.diagnostics)?;
        log::info!("wrote diagnostics report to {}", report_path.display());
    }

    let diagnostics = &output.diagnostics;
    Ok(ExtractResult {
        document: path.to_owned(),
        tables,
        blocks_skipped: diagnostics.blocks_skipped,
        rows_rejected: diagnostics.rows_rejected,
        duplicate_blocks: diagnostics.duplicate_blocks,
        replaced_records: diagnostics.replaced_records,
        duration: start.elapsed(),
    })
}

/// Processes independent documents on parallel blocking workers,
/// streaming results back as each completes. Returns the successful
/// results (sorted by document path) and the number of failed documents.
pub async fn process_documents(
    paths: Vec<PathBuf>,
    config: &ExtractConfig,
) -> (Vec<ExtractResult>, usize) {
    let (tx, mut rx) =
        tokio::sync::mpsc::channel::<(PathBuf, Result<ExtractResult, IngestError>)>(
            paths.len().max(1),
        );

    for path in paths {
        let tx = tx.clone();
        let config = config.clone();
        tokio::task::spawn_blocking(move || {
            let result = process_document(&path, &config);
            tx.blocking_send((path, result)).ok();
        });
    }
    drop(tx);

    let mut results = Vec::new();
    let mut failures = 0;
    while let Some((path, result)) = rx.recv().await {
        match result {
            Ok(result) => {
                log::info!(
                    "[{}] {} record(s) in {:.1?}",
                    path.display(),
                    result.record_count(),
                    result.duration
                );
                results.push(result);
            }
            Err(e) => {
                failures += 1;
                log::error!("[{}] failed: {e}", path.display());
            }
        }
    }
    results.sort_by(|a, b| a.document.cmp(&b.document));
    (results, failures)
}

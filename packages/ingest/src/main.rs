#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the report table extraction tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ledger_lift_ingest::{
    all_table_formats, discover_documents, process_document, process_documents,
};
use ledger_lift_ingest_models::ExtractConfig;

#[derive(Parser)]
#[command(name = "ledger_lift", about = "Table extraction from government report documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract all recognized tables from one document
    Extract {
        /// Source document (`.pdf`, or `.txt` with pre-extracted text)
        document: PathBuf,
        /// Directory for the output tables
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Comma-separated list of format ids to extract (default: all)
        #[arg(long)]
        formats: Option<String>,
        /// Use reading-order PDF extraction instead of `pdftotext -layout`
        #[arg(long)]
        reading_order: bool,
        /// Write tab-separated output instead of commas
        #[arg(long)]
        tsv: bool,
        /// Also write the per-document JSON diagnostics report
        #[arg(long)]
        report: bool,
    },
    /// Extract every document (`.pdf` / `.txt`) in a directory
    ExtractAll {
        /// Directory containing the source documents
        dir: PathBuf,
        /// Directory for the output tables
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Comma-separated list of format ids to extract (default: all)
        #[arg(long)]
        formats: Option<String>,
        /// Use reading-order PDF extraction instead of `pdftotext -layout`
        #[arg(long)]
        reading_order: bool,
        /// Write tab-separated output instead of commas
        #[arg(long)]
        tsv: bool,
        /// Also write per-document JSON diagnostics reports
        #[arg(long)]
        report: bool,
    },
    /// List all configured table formats
    Formats,
}

fn config(
    out_dir: PathBuf,
    formats: Option<String>,
    reading_order: bool,
    tsv: bool,
    report: bool,
) -> ExtractConfig {
    ExtractConfig {
        output_dir: out_dir,
        delimiter: if tsv { b'\t' } else { b',' },
        formats: formats.map(|s| s.split(',').map(|id| id.trim().to_owned()).collect()),
        reading_order,
        report,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            document,
            out_dir,
            formats,
            reading_order,
            tsv,
            report,
        } => {
            let config = config(out_dir, formats, reading_order, tsv, report);
            let result = process_document(&document, &config)?;
            log::info!(
                "{} record(s) across {} table(s) in {:.1?}",
                result.record_count(),
                result.tables.iter().filter(|t| t.records > 0).count(),
                result.duration
            );
            for table in result.tables.iter().filter(|t| t.records > 0) {
                println!(
                    "{:<28} {:>6}  {}",
                    table.format_id,
                    table.records,
                    table
                        .output
                        .as_ref()
                        .map_or_else(String::new, |p| p.display().to_string())
                );
            }
            if result.rows_rejected > 0 || result.blocks_skipped > 0 {
                log::warn!(
                    "{} block(s) skipped, {} row(s) rejected; run with --report for details",
                    result.blocks_skipped,
                    result.rows_rejected
                );
            }
        }
        Commands::ExtractAll {
            dir,
            out_dir,
            formats,
            reading_order,
            tsv,
            report,
        } => {
            let documents = discover_documents(&dir)?;
            if documents.is_empty() {
                log::warn!("no documents found in {}", dir.display());
                return Ok(());
            }
            log::info!("extracting {} document(s)", documents.len());
            let config = config(out_dir, formats, reading_order, tsv, report);
            let (results, failures) = process_documents(documents, &config).await;
            let total: u64 = results.iter().map(|r| r.record_count()).sum();
            log::info!(
                "{} document(s) done, {failures} failed, {total} record(s) total",
                results.len()
            );
            if failures > 0 {
                return Err(format!("{failures} document(s) failed").into());
            }
        }
        Commands::Formats => {
            println!("{:<28} TITLE", "ID");
            println!("{}", "-".repeat(60));
            for format in all_table_formats() {
                println!("{:<28} {}", format.id, format.title);
            }
        }
    }

    Ok(())
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Text acquisition for report documents.
//!
//! The engine operates purely on already-extracted monospaced text; this
//! crate is the bridge to the extraction collaborator. Three acquisition
//! paths:
//!
//! - **Layout mode** (default for PDFs): shells out to Poppler's
//!   `pdftotext -layout`, which preserves the character-grid column
//!   alignment the engine's offset slicing depends on.
//! - **Reading-order mode**: pure-Rust extraction via [`pdf_extract`],
//!   for environments without Poppler. Column offsets are not preserved,
//!   so only token-split formats parse reliably from it.
//! - **Plain text**: `.txt` input produced by an earlier extraction run
//!   is passed through untouched.
//!
//! Extraction failure is fatal for the document — no partial text is
//! ever handed to the engine.

use std::path::Path;
use std::process::Command;

/// Errors from the extraction collaborator. All of them abort the
/// document.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The source document could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The `pdftotext` binary is not on the PATH.
    #[error("pdftotext not found; install Poppler or use reading-order extraction")]
    MissingBinary,

    /// The extraction collaborator ran but failed.
    #[error("Extraction failed: {0}")]
    Extraction(String),
}

/// How to turn a PDF into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionMode {
    /// `pdftotext -layout`: preserves column alignment.
    #[default]
    Layout,
    /// [`pdf_extract`] reading order: no external binary required.
    ReadingOrder,
}

/// Extracts a document's text, with form feeds between pages.
///
/// `.txt` paths are read as-is (pre-extracted text); anything else goes
/// through the PDF collaborator selected by `mode`.
///
/// # Errors
///
/// Returns [`ExtractError`] if the file cannot be read or the
/// collaborator fails. Fatal for the document by contract.
pub fn extract_text(path: &Path, mode: ExtractionMode) -> Result<String, ExtractError> {
    if path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
    {
        log::debug!("reading pre-extracted text from {}", path.display());
        return Ok(std::fs::read_to_string(path)?);
    }
    match mode {
        ExtractionMode::Layout => pdftotext_layout(path),
        ExtractionMode::ReadingOrder => reading_order(path),
    }
}

/// Runs `pdftotext -layout <path> -` and captures the text.
fn pdftotext_layout(path: &Path) -> Result<String, ExtractError> {
    let output = Command::new("pdftotext")
        .arg("-layout")
        .arg("-enc")
        .arg("UTF-8")
        .arg(path)
        .arg("-")
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ExtractError::MissingBinary
            } else {
                ExtractError::Io(e)
            }
        })?;

    if !output.status.success() {
        return Err(ExtractError::Extraction(format!(
            "pdftotext exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let text = String::from_utf8_lossy(&output.stdout).into_owned();
    log::debug!(
        "extracted {} characters from {} (layout mode)",
        text.len(),
        path.display()
    );
    Ok(text)
}

/// Pure-Rust reading-order extraction.
fn reading_order(path: &Path) -> Result<String, ExtractError> {
    let text = pdf_extract::extract_text(path)
        .map_err(|e| ExtractError::Extraction(format!("failed to extract text: {e}")))?;
    log::debug!(
        "extracted {} characters from {} (reading order)",
        text.len(),
        path.display()
    );
    Ok(text)
}

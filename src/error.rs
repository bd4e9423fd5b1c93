//! Error types for the labsheet library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`LabSheetError`]: **Fatal**: the run cannot produce a spreadsheet
//!   (bad input file, wrong password, no text in the PDF, no test lines
//!   found). Returned as `Err(LabSheetError)` from the top-level `process*`
//!   functions.
//!
//! * [`CandidateError`]: **Non-fatal**: a single line matched the line rule
//!   but one of its numbers did not parse. The line contributes no record;
//!   the error is stored in [`crate::pipeline::extract::Extraction`] so
//!   callers can report what was skipped instead of losing it silently.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the labsheet library.
///
/// Per-line parse failures use [`CandidateError`] and never surface here.
#[derive(Debug, Error)]
pub enum LabSheetError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The supplied upload name or bytes cannot be used as a report.
    #[error("Invalid input '{input}': {reason}")]
    InvalidInput { input: String, reason: String },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The page selection matched no page of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium returned an error while reading the text layer of a page.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    // ── Pipeline outcomes ─────────────────────────────────────────────────
    /// The PDF has no usable text layer (typically a scanned image).
    #[error("No text could be extracted from '{path}'.\nScanned reports need OCR before they can be read.")]
    NoTextExtracted { path: PathBuf },

    /// Text was extracted but no line matched the lab-result rule.
    #[error("No valid test data found in {chars} characters of extracted text (rule '{rule}')")]
    NoValidTestData { chars: usize, rule: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// A line rule failed to compile or lacks a required capture group.
    #[error("Invalid line rule '{name}': {reason}")]
    InvalidRule { name: String, reason: String },

    /// The prior-results file could not be read or parsed.
    #[error("Invalid reference data in '{path}': {detail}")]
    InvalidReferenceData { path: PathBuf, detail: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not copy the uploaded report into the reports directory.
    #[error("Failed to archive upload to '{path}': {source}")]
    ArchiveWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the output workbook.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// rust_xlsxwriter rejected a cell or failed to assemble the workbook.
    #[error("Failed to build spreadsheet: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium system-wide, or point labsheet at an existing copy:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium\n\
  • Or pass --pdfium-lib /path/to/libpdfium\n\
Prebuilt binaries: https://github.com/bblanchon/pdfium-binaries\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Numeric field of a candidate line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    Result,
    ReferenceLow,
    ReferenceHigh,
}

impl fmt::Display for NumericField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NumericField::Result => "result",
            NumericField::ReferenceLow => "reference low",
            NumericField::ReferenceHigh => "reference high",
        };
        f.write_str(name)
    }
}

/// A non-fatal error for a single candidate line.
///
/// The line matched the rule, so it looked like a test result, but a number
/// in it could not be parsed. It yields no record.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum CandidateError {
    /// One of the numeric captures is not a valid float (e.g. `1.2.3`).
    #[error("'{test_name}' at byte {offset}: {field} '{raw}' is not a number")]
    InvalidNumber {
        test_name: String,
        field: NumericField,
        raw: String,
        offset: usize,
    },
}

impl CandidateError {
    /// Trimmed test name of the rejected line.
    pub fn test_name(&self) -> &str {
        match self {
            CandidateError::InvalidNumber { test_name, .. } => test_name,
        }
    }
}

//! # labsheet
//!
//! Turn a laboratory-report PDF into a colour-coded `.xlsx` summary.
//!
//! The crate reads the PDF's text layer, finds lines of the form
//! `<test name> <result> <unit> <low> - <high>`, classifies each result as
//! `Low`, `Normal` or `High` against its printed reference range, attaches
//! the previous value for the same test from a reference store, and writes
//! one workbook row per result with abnormal values highlighted.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      validate %PDF magic, archive under reports_dir
//!  ├─ 2. Text       read the text layer of selected pages (pdfium)
//!  ├─ 3. Normalise  CRLF, invisible characters, trailing whitespace
//!  ├─ 4. Extract    line rule → candidates → records (+ rejected lines)
//!  └─ 5. Render     report_summary_<timestamp>.xlsx under outputs_dir
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use labsheet::{process_file, ReportConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ReportConfig::default();
//!     let output = process_file("blood_test.pdf", &config)?;
//!     for record in output.abnormal() {
//!         println!("{} {} ({})", record.test_name(), record.current_value(), record.status());
//!     }
//!     println!("saved {}", output.workbook_path.display());
//!     Ok(())
//! }
//! ```
//!
//! Parsing alone needs no PDF at all:
//!
//! ```rust
//! use labsheet::{extract, InMemoryReferenceStore, Status};
//!
//! let store = InMemoryReferenceStore::seeded();
//! let records = extract("Hemoglobin 11.0 g/dL 13.0-17.0", &store);
//! assert_eq!(records[0].status(), Status::Low);
//! assert_eq!(records[0].previous_value(), Some(13.2));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `labsheet` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! labsheet = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod reference;
pub mod report;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PageSelection, ReportConfig, ReportConfigBuilder};
pub use error::{CandidateError, LabSheetError, NumericField};
pub use output::{DocumentMetadata, PageText, ReportOutput, ReportStats};
pub use pipeline::extract::{extract, Extraction, Extractor};
pub use pipeline::grammar::{LineRule, ReportLayout};
pub use pipeline::text::{PdfiumTextSupplier, TextSupplier};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use record::{format_value, LabResultRecord, Status};
pub use reference::{InMemoryReferenceStore, PriorResult, ReferenceStore};
pub use report::{inspect, process_bytes, process_file};

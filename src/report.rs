//! Report processing entry points.
//!
//! One call runs the whole pipeline for one uploaded report:
//!
//! ```text
//! archive ──▶ inspect ──▶ text ──▶ normalise ──▶ extract ──▶ render
//! (reports/)  (pages)    (pdfium)               (line rule)  (outputs/*.xlsx)
//! ```
//!
//! Two outcomes end a run early without a workbook, each with its own error
//! so a caller can show a distinct message: [`LabSheetError::NoTextExtracted`]
//! when the PDF has no text layer, and [`LabSheetError::NoValidTestData`]
//! when the text holds no result line.

use crate::config::ReportConfig;
use crate::error::LabSheetError;
use crate::output::{DocumentMetadata, ReportOutput, ReportStats};
use crate::pipeline::extract::Extractor;
use crate::pipeline::{input, normalise, render, text};
use crate::progress::{ExtractionProgressCallback, NoopProgressCallback};
use crate::record::Status;
use chrono::{Local, NaiveDateTime};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Process a local PDF report.
///
/// # Errors
/// - File not found, unreadable, or not a PDF
/// - PDF cannot be opened (corrupt, password)
/// - [`LabSheetError::NoTextExtracted`] / [`LabSheetError::NoValidTestData`]
/// - The workbook cannot be written
pub fn process_file(
    input_path: impl AsRef<Path>,
    config: &ReportConfig,
) -> Result<ReportOutput, LabSheetError> {
    process_file_at(input_path.as_ref(), config, Local::now().naive_local())
}

/// Process an uploaded report held in memory.
///
/// `file_name` is the name the upload arrived with; only its final path
/// component is used. With archiving enabled the bytes are saved as
/// `reports_dir/<file_name>` and read from there; otherwise they go to a
/// managed temp file that is removed when the call returns.
pub fn process_bytes(
    bytes: &[u8],
    file_name: &str,
    config: &ReportConfig,
) -> Result<ReportOutput, LabSheetError> {
    process_bytes_at(bytes, file_name, config, Local::now().naive_local())
}

/// Read PDF metadata without extracting any results.
pub fn inspect(
    input_path: impl AsRef<Path>,
    config: &ReportConfig,
) -> Result<DocumentMetadata, LabSheetError> {
    let path = input::resolve_local(input_path)?;
    config
        .text_supplier()
        .inspect(&path, config.password.as_deref())
}

/// Variant of [`process_file`] with an explicit clock, for deterministic file names.
pub fn process_file_at(
    input_path: &Path,
    config: &ReportConfig,
    now: NaiveDateTime,
) -> Result<ReportOutput, LabSheetError> {
    let pdf_path = input::resolve_local(input_path)?;
    info!("Processing report: {}", pdf_path.display());

    let archived = if config.archive_uploads {
        Some(input::archive_file(&pdf_path, &config.reports_dir)?)
    } else {
        None
    };
    let source = archived.clone().unwrap_or(pdf_path);
    run(&source, archived, config, now)
}

/// Variant of [`process_bytes`] with an explicit clock, for deterministic file names.
pub fn process_bytes_at(
    bytes: &[u8],
    file_name: &str,
    config: &ReportConfig,
    now: NaiveDateTime,
) -> Result<ReportOutput, LabSheetError> {
    let name = input::upload_file_name(file_name)?;
    input::check_pdf_bytes(bytes, &name)?;
    info!("Processing upload: {} ({} bytes)", name, bytes.len());

    if config.archive_uploads {
        let archived = input::archive_bytes(bytes, &name, &config.reports_dir)?;
        return run(&archived.clone(), Some(archived), config, now);
    }

    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| LabSheetError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| LabSheetError::Internal(format!("tempfile write: {e}")))?;
    // `tmp` is dropped (and the file deleted) when `run` returns
    run(tmp.path(), None, config, now)
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn run(
    pdf_path: &Path,
    archived_path: Option<PathBuf>,
    config: &ReportConfig,
    now: NaiveDateTime,
) -> Result<ReportOutput, LabSheetError> {
    let total_start = Instant::now();
    let rule = config.line_rule()?;
    let supplier = config.text_supplier();
    let password = config.password.as_deref();

    // ── Step 1: Inspect document ─────────────────────────────────────────
    let metadata = supplier.inspect(pdf_path, password)?;
    let total_pages = metadata.page_count;

    // ── Step 2: Compute page indices ─────────────────────────────────────
    let page_indices = config.pages.to_indices(total_pages);
    if page_indices.is_empty() {
        return Err(LabSheetError::PageOutOfRange {
            page: config.pages.first_requested(),
            total: total_pages,
        });
    }
    debug!("Selected {} of {} pages", page_indices.len(), total_pages);

    // ── Step 3: Extract and join page text ───────────────────────────────
    let noop = NoopProgressCallback;
    let progress: &dyn ExtractionProgressCallback = match &config.progress_callback {
        Some(cb) => cb.as_ref(),
        None => &noop,
    };
    let pages = supplier.extract_pages(pdf_path, password, &page_indices, progress)?;
    let pages_with_text = pages.iter().filter(|p| !p.is_blank()).count();
    let raw_text = text::join_pages(&pages);
    let clean_text = normalise::normalise_text(&raw_text);

    if clean_text.trim().is_empty() {
        return Err(LabSheetError::NoTextExtracted {
            path: pdf_path.to_path_buf(),
        });
    }
    let text_chars = clean_text.chars().count();
    info!(
        "Extracted {} characters from {}/{} pages",
        text_chars,
        pages_with_text,
        page_indices.len()
    );

    // ── Step 4: Parse records ────────────────────────────────────────────
    let preview: String = raw_text.chars().take(config.preview_chars).collect();
    let extractor = Extractor::new(rule);
    let extraction = extractor.extract(&clean_text, config.reference_store.as_ref());
    if extraction.is_empty() {
        return Err(LabSheetError::NoValidTestData {
            chars: text_chars,
            rule: extractor.rule().name().to_string(),
        });
    }

    // ── Step 5: Render workbook ──────────────────────────────────────────
    let timestamp = render::timestamp_label(now);
    let workbook_path = config
        .outputs_dir
        .join(render::summary_file_name(&timestamp));
    render::write_workbook(&extraction.records, &config.sheet_name, &workbook_path)?;

    // ── Step 6: Compute stats ────────────────────────────────────────────
    let count = |status: Status| {
        extraction
            .records
            .iter()
            .filter(|r| r.status() == status)
            .count()
    };
    let stats = ReportStats {
        total_pages,
        selected_pages: page_indices.len(),
        pages_with_text,
        text_chars,
        candidates: extraction.candidates,
        records: extraction.records.len(),
        rejected: extraction.rejected.len(),
        low: count(Status::Low),
        high: count(Status::High),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Report complete: {} records ({} low, {} high, {} rejected) in {}ms",
        stats.records, stats.low, stats.high, stats.rejected, stats.total_duration_ms
    );

    Ok(ReportOutput {
        records: extraction.records,
        rejected: extraction.rejected,
        preview,
        archived_path,
        workbook_path,
        download_name: render::download_file_name(&timestamp),
        timestamp,
        metadata,
        stats,
    })
}

//! End-to-end tests against a real PDF and a real pdfium library.
//!
//! Gated behind `E2E_ENABLED` so they do not run in CI unless explicitly
//! requested. The report under test is `LABSHEET_E2E_PDF` or, if unset,
//! `./test_cases/blood_test.pdf`; it must contain a text layer with lines like
//! `Hemoglobin 11.0 g/dL 13.0-17.0`.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=./libpdfium.so cargo test --test e2e -- --nocapture

use labsheet::{inspect, process_file, LabSheetError, PageSelection, ReportConfig};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn report_pdf() -> PathBuf {
    std::env::var_os("LABSHEET_E2E_PDF")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/blood_test.pdf")
        })
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            return;
        }
        p
    }};
}

fn config_in(dir: &std::path::Path) -> labsheet::ReportConfigBuilder {
    ReportConfig::builder()
        .reports_dir(dir.join("sample_reports"))
        .outputs_dir(dir.join("excel_outputs"))
}

// ── Inspect ──────────────────────────────────────────────────────────────────

#[test]
fn test_inspect_report() {
    let path = e2e_skip_unless_ready!(report_pdf());
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path()).build().unwrap();

    let meta = inspect(&path, &config).expect("inspect() should succeed");
    assert!(meta.page_count >= 1);
    assert!(!meta.pdf_version.is_empty());
    println!("Metadata: {:?}", meta);
}

// ── Full pipeline ────────────────────────────────────────────────────────────

#[test]
fn test_process_report() {
    let path = e2e_skip_unless_ready!(report_pdf());
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path()).build().unwrap();

    let output = process_file(&path, &config).expect("process_file() should succeed");

    assert!(!output.records.is_empty());
    assert!(output.workbook_path.exists());
    assert!(output
        .workbook_path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("report_summary_") && n.ends_with(".xlsx")));
    assert!(output.download_name.starts_with("Medical_Report_"));

    let archived = output.archived_path.clone().expect("report is archived");
    assert_eq!(
        std::fs::read(&archived).unwrap(),
        std::fs::read(&path).unwrap()
    );

    assert_eq!(
        output.stats.records + output.stats.rejected,
        output.stats.candidates
    );
    for record in &output.records {
        println!(
            "{:<30} {:>10} {:<8} {:<20} {}",
            record.test_name(),
            record.current_value(),
            record.unit(),
            record.reference_range(),
            record.status()
        );
    }
}

#[test]
fn test_page_past_end_is_rejected() {
    let path = e2e_skip_unless_ready!(report_pdf());
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path())
        .archive_uploads(false)
        .pages(PageSelection::Single(10_000))
        .build()
        .unwrap();

    let err = process_file(&path, &config).unwrap_err();
    assert!(
        matches!(err, LabSheetError::PageOutOfRange { page: 10_000, .. }),
        "got: {err:?}"
    );
}

#[test]
fn test_wrong_password_on_plain_pdf_is_ignored() {
    let path = e2e_skip_unless_ready!(report_pdf());
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path())
        .archive_uploads(false)
        .password("not-needed")
        .build()
        .unwrap();

    // pdfium ignores a password on an unencrypted document.
    assert!(inspect(&path, &config).is_ok());
}

//! Result types returned by the pipeline.

use crate::error::CandidateError;
use crate::record::{LabResultRecord, Status};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Document-level information read from the PDF without extracting text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// Text layer of one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    /// 1-indexed page number.
    pub page_num: usize,
    pub text: String,
}

impl PageText {
    pub fn new(page_num: usize, text: impl Into<String>) -> Self {
        Self {
            page_num,
            text: text.into(),
        }
    }

    /// `true` when the page has no visible characters.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Counters for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportStats {
    /// Pages in the document.
    pub total_pages: usize,
    /// Pages chosen by the page selection.
    pub selected_pages: usize,
    /// Selected pages that yielded text.
    pub pages_with_text: usize,
    /// Characters of normalised text scanned by the line rule.
    pub text_chars: usize,
    /// Raw line-rule matches.
    pub candidates: usize,
    pub records: usize,
    pub rejected: usize,
    pub low: usize,
    pub high: usize,
    pub total_duration_ms: u64,
}

/// Everything one run of [`crate::report::process_file`] produces.
#[derive(Debug, Clone, Serialize)]
pub struct ReportOutput {
    /// Parsed records in report order.
    pub records: Vec<LabResultRecord>,
    /// Lines that looked like results but had unparsable numbers.
    pub rejected: Vec<CandidateError>,
    /// The first `preview_chars` characters of the extracted text, before
    /// normalisation.
    pub preview: String,
    /// Copy of the upload in the reports directory, when archiving is on.
    pub archived_path: Option<PathBuf>,
    /// Where the workbook was written.
    pub workbook_path: PathBuf,
    /// File name to offer for download, e.g. `Medical_Report_2025-01-31_09-15.xlsx`.
    pub download_name: String,
    /// Minute-granularity timestamp shared by both file names.
    pub timestamp: String,
    pub metadata: DocumentMetadata,
    pub stats: ReportStats,
}

impl ReportOutput {
    /// Records flagged `Low` or `High`.
    pub fn abnormal(&self) -> impl Iterator<Item = &LabResultRecord> {
        self.records.iter().filter(|r| r.status().is_abnormal())
    }

    /// Number of records with the given status.
    pub fn count(&self, status: Status) -> usize {
        self.records.iter().filter(|r| r.status() == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_page_detection() {
        assert!(PageText::new(1, "").is_blank());
        assert!(PageText::new(1, " \n\t").is_blank());
        assert!(!PageText::new(1, "Hemoglobin").is_blank());
    }

    #[test]
    fn output_counts_statuses() {
        let output = ReportOutput {
            records: vec![
                LabResultRecord::new("A", "u", 1.0, 2.0, 3.0, None),
                LabResultRecord::new("B", "u", 2.5, 2.0, 3.0, None),
                LabResultRecord::new("C", "u", 9.0, 2.0, 3.0, None),
            ],
            rejected: vec![],
            preview: String::new(),
            archived_path: None,
            workbook_path: PathBuf::from("out.xlsx"),
            download_name: "Medical_Report_x.xlsx".into(),
            timestamp: "x".into(),
            metadata: DocumentMetadata::default(),
            stats: ReportStats::default(),
        };
        assert_eq!(output.count(Status::Low), 1);
        assert_eq!(output.count(Status::High), 1);
        let abnormal: Vec<_> = output.abnormal().map(|r| r.test_name()).collect();
        assert_eq!(abnormal, vec!["A", "C"]);
    }
}

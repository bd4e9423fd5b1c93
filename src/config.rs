//! Configuration types for report processing.
//!
//! All pipeline behaviour is controlled through [`ReportConfig`], built via
//! its [`ReportConfigBuilder`]. Collaborators (the reference store, the text
//! supplier, the progress callback) are injected here as trait objects so a
//! host application can swap any of them without touching the pipeline.

use crate::error::LabSheetError;
use crate::pipeline::grammar::{LineRule, ReportLayout};
use crate::pipeline::text::{PdfiumTextSupplier, TextSupplier};
use crate::progress::ProgressCallback;
use crate::reference::{InMemoryReferenceStore, ReferenceStore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for processing one lab report.
///
/// Built via [`ReportConfig::builder()`] or using [`ReportConfig::default()`].
///
/// # Example
/// ```rust
/// use labsheet::{ReportConfig, ReportLayout};
///
/// let config = ReportConfig::builder()
///     .outputs_dir("out")
///     .layout(ReportLayout::SingleLine)
///     .preview_chars(500)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ReportConfig {
    /// Directory uploads are archived in. Default: `sample_reports`.
    pub reports_dir: PathBuf,

    /// Directory workbooks are written to. Default: `excel_outputs`.
    pub outputs_dir: PathBuf,

    /// Copy each upload into `reports_dir` before reading it. Default: true.
    pub archive_uploads: bool,

    /// Characters of raw text kept in [`crate::output::ReportOutput::preview`]. Default: 3000.
    pub preview_chars: usize,

    /// Worksheet name inside the workbook. Default: `Report`.
    pub sheet_name: String,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// Line rule used to find results. Default: [`ReportLayout::Tabular`].
    pub layout: ReportLayout,

    /// Prior results used for the "Previous" and "Change" columns.
    /// Default: [`InMemoryReferenceStore::seeded`].
    pub reference_store: Arc<dyn ReferenceStore>,

    /// Pre-constructed text supplier. If None, pdfium is bound via
    /// [`PdfiumTextSupplier::from_env`].
    pub text_supplier: Option<Arc<dyn TextSupplier>>,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            reports_dir: PathBuf::from("sample_reports"),
            outputs_dir: PathBuf::from("excel_outputs"),
            archive_uploads: true,
            preview_chars: 3000,
            sheet_name: "Report".to_string(),
            password: None,
            pages: PageSelection::default(),
            layout: ReportLayout::default(),
            reference_store: Arc::new(InMemoryReferenceStore::seeded()),
            text_supplier: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ReportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportConfig")
            .field("reports_dir", &self.reports_dir)
            .field("outputs_dir", &self.outputs_dir)
            .field("archive_uploads", &self.archive_uploads)
            .field("preview_chars", &self.preview_chars)
            .field("sheet_name", &self.sheet_name)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pages", &self.pages)
            .field("layout", &self.layout)
            .field("reference_store", &"<dyn ReferenceStore>")
            .field(
                "text_supplier",
                &self.text_supplier.as_ref().map(|_| "<dyn TextSupplier>"),
            )
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ReportConfig {
    /// Create a new builder for `ReportConfig`.
    pub fn builder() -> ReportConfigBuilder {
        ReportConfigBuilder {
            config: Self::default(),
        }
    }

    /// The configured text supplier, or pdfium bound from the environment.
    pub fn text_supplier(&self) -> Arc<dyn TextSupplier> {
        match &self.text_supplier {
            Some(supplier) => Arc::clone(supplier),
            None => Arc::new(PdfiumTextSupplier::from_env()),
        }
    }

    /// Compile [`Self::layout`] into a line rule.
    pub fn line_rule(&self) -> Result<LineRule, LabSheetError> {
        self.layout.to_rule()
    }
}

/// Builder for [`ReportConfig`].
pub struct ReportConfigBuilder {
    config: ReportConfig,
}

impl fmt::Debug for ReportConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ReportConfigBuilder {
    pub fn reports_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.reports_dir = dir.into();
        self
    }

    pub fn outputs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.outputs_dir = dir.into();
        self
    }

    pub fn archive_uploads(mut self, v: bool) -> Self {
        self.config.archive_uploads = v;
        self
    }

    pub fn preview_chars(mut self, n: usize) -> Self {
        self.config.preview_chars = n;
        self
    }

    pub fn sheet_name(mut self, name: impl Into<String>) -> Self {
        self.config.sheet_name = name.into();
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn layout(mut self, layout: ReportLayout) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn reference_store(mut self, store: Arc<dyn ReferenceStore>) -> Self {
        self.config.reference_store = store;
        self
    }

    pub fn text_supplier(mut self, supplier: Arc<dyn TextSupplier>) -> Self {
        self.config.text_supplier = Some(supplier);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ReportConfig, LabSheetError> {
        let c = &self.config;
        if c.outputs_dir.as_os_str().is_empty() {
            return Err(LabSheetError::InvalidConfig(
                "Outputs directory must not be empty".into(),
            ));
        }
        if c.archive_uploads && c.reports_dir.as_os_str().is_empty() {
            return Err(LabSheetError::InvalidConfig(
                "Reports directory must not be empty when archiving uploads".into(),
            ));
        }
        if c.sheet_name.trim().is_empty() || c.sheet_name.chars().count() > 31 {
            return Err(LabSheetError::InvalidConfig(format!(
                "Sheet name must be 1–31 characters, got {:?}",
                c.sheet_name
            )));
        }
        // Surface a broken custom pattern now rather than mid-run.
        c.layout.to_rule()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of the PDF to read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Read all pages (default).
    #[default]
    All,
    /// Read a single page (1-indexed).
    Single(usize),
    /// Read a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Read specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// First page the selection names, for error reporting.
    pub fn first_requested(&self) -> usize {
        match self {
            PageSelection::All => 1,
            PageSelection::Single(p) => *p,
            PageSelection::Range(start, _) => *start,
            PageSelection::Set(pages) => pages.iter().copied().min().unwrap_or(0),
        }
    }
}

impl std::str::FromStr for PageSelection {
    type Err = LabSheetError;

    /// Parse `all`, `5`, `3-15` or `1,3,5`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let invalid = |reason: String| {
            LabSheetError::InvalidConfig(format!("Invalid page selection '{s}': {reason}"))
        };
        let page = |p: &str| -> Result<usize, LabSheetError> {
            let n: usize = p
                .trim()
                .parse()
                .map_err(|_| invalid(format!("'{}' is not a page number", p.trim())))?;
            if n < 1 {
                return Err(invalid("pages are 1-indexed".into()));
            }
            Ok(n)
        };

        if s == "all" {
            return Ok(PageSelection::All);
        }

        if let Some((start, end)) = s.split_once('-') {
            let (start, end) = (page(start)?, page(end)?);
            if start > end {
                return Err(invalid("start must be <= end".into()));
            }
            return Ok(PageSelection::Range(start, end));
        }

        if s.contains(',') {
            let pages = s.split(',').map(page).collect::<Result<Vec<_>, _>>()?;
            return Ok(PageSelection::Set(pages));
        }

        Ok(PageSelection::Single(page(s.as_str())?))
    }
}

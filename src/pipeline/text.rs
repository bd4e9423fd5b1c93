//! Text supply: read the text layer of selected PDF pages.
//!
//! [`TextSupplier`] is the seam between the pipeline and the PDF engine.
//! The production implementation, [`PdfiumTextSupplier`], reads the text
//! layer through `pdfium-render`; tests and host applications can plug in
//! their own supplier through [`crate::config::ReportConfigBuilder::text_supplier`].
//!
//! No OCR happens here. A scanned report without a text layer yields blank
//! pages, which the pipeline reports as "no text extracted".

use crate::error::LabSheetError;
use crate::output::{DocumentMetadata, PageText};
use crate::progress::ExtractionProgressCallback;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming an existing pdfium shared library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Source of page text for the pipeline.
pub trait TextSupplier: Send + Sync {
    /// Read document metadata, including the page count.
    fn inspect(
        &self,
        pdf_path: &Path,
        password: Option<&str>,
    ) -> Result<DocumentMetadata, LabSheetError>;

    /// Read the text of the given 0-indexed pages, in the given order.
    ///
    /// Indices past the end of the document are skipped with a warning.
    fn extract_pages(
        &self,
        pdf_path: &Path,
        password: Option<&str>,
        page_indices: &[usize],
        progress: &dyn ExtractionProgressCallback,
    ) -> Result<Vec<PageText>, LabSheetError>;
}

/// Reads page text with pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumTextSupplier {
    library_path: Option<PathBuf>,
}

impl PdfiumTextSupplier {
    /// Bind to the library at `PDFIUM_LIB_PATH`, or the system library when
    /// the variable is unset.
    pub fn from_env() -> Self {
        Self {
            library_path: std::env::var_os(PDFIUM_LIB_PATH_ENV).map(PathBuf::from),
        }
    }

    /// Bind to the pdfium library at an explicit path.
    pub fn with_library(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }

    pub fn library_path(&self) -> Option<&Path> {
        self.library_path.as_deref()
    }

    fn bind(&self) -> Result<Pdfium, LabSheetError> {
        let bindings = match &self.library_path {
            Some(path) => {
                debug!("Binding pdfium from {}", path.display());
                Pdfium::bind_to_library(path)
            }
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| LabSheetError::PdfiumBindingFailed(format!("{:?}", e)))?;

        Ok(Pdfium::new(bindings))
    }
}

impl TextSupplier for PdfiumTextSupplier {
    fn inspect(
        &self,
        pdf_path: &Path,
        password: Option<&str>,
    ) -> Result<DocumentMetadata, LabSheetError> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_file(pdf_path, password)
            .map_err(|e| load_error(pdf_path, password, e))?;

        let metadata = document.metadata();
        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata.get(tag).and_then(|t| {
                let v = t.value().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            })
        };

        Ok(DocumentMetadata {
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            subject: get_meta(PdfDocumentMetadataTagType::Subject),
            creator: get_meta(PdfDocumentMetadataTagType::Creator),
            producer: get_meta(PdfDocumentMetadataTagType::Producer),
            creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
            modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
            page_count: document.pages().len() as usize,
            pdf_version: format!("{:?}", document.version()),
        })
    }

    fn extract_pages(
        &self,
        pdf_path: &Path,
        password: Option<&str>,
        page_indices: &[usize],
        progress: &dyn ExtractionProgressCallback,
    ) -> Result<Vec<PageText>, LabSheetError> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_file(pdf_path, password)
            .map_err(|e| load_error(pdf_path, password, e))?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        let selected = page_indices.len();
        info!("PDF loaded: {} pages, reading {}", total_pages, selected);
        progress.on_extraction_start(selected);

        let mut results = Vec::with_capacity(selected);
        let mut with_text = 0usize;

        for &idx in page_indices {
            let page_num = idx + 1;
            if idx >= total_pages {
                warn!(
                    "Skipping page {} (out of range, total={})",
                    page_num, total_pages
                );
                continue;
            }

            let page = pages
                .get(idx as u16)
                .map_err(|e| LabSheetError::TextExtractionFailed {
                    page: page_num,
                    detail: format!("{:?}", e),
                })?;

            let text = page
                .text()
                .map_err(|e| LabSheetError::TextExtractionFailed {
                    page: page_num,
                    detail: format!("{:?}", e),
                })?
                .all();

            let page_text = PageText::new(page_num, text);
            if page_text.is_blank() {
                warn!("Page {} has no text layer", page_num);
                progress.on_page_blank(page_num, selected);
            } else {
                with_text += 1;
                let chars = page_text.text.chars().count();
                debug!("Page {} → {} chars", page_num, chars);
                progress.on_page_extracted(page_num, selected, chars);
            }
            results.push(page_text);
        }

        progress.on_extraction_complete(selected, with_text);
        Ok(results)
    }
}

/// Map a pdfium load failure to the most specific error.
fn load_error(pdf_path: &Path, password: Option<&str>, e: PdfiumError) -> LabSheetError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if password.is_some() {
            LabSheetError::WrongPassword {
                path: pdf_path.to_path_buf(),
            }
        } else {
            LabSheetError::PasswordRequired {
                path: pdf_path.to_path_buf(),
            }
        }
    } else {
        LabSheetError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: err_str,
        }
    }
}

/// Join the non-blank pages with `"\n"`, in the order given.
pub fn join_pages(pages: &[PageText]) -> String {
    pages
        .iter()
        .filter(|p| !p.is_blank())
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

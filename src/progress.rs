//! Progress-callback trait for per-page text extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ReportConfigBuilder::progress_callback`] to receive
//! events while the text supplier reads each page. Reports are usually a
//! handful of pages, but PDFium can take noticeable time on large scanned
//! documents and a caller deserves to know which page is blank.
//!
//! # Example
//!
//! ```rust
//! use labsheet::{ExtractionProgressCallback, ReportConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct BlankPageCounter {
//!     blank: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for BlankPageCounter {
//!     fn on_page_blank(&self, page_num: usize, _total_pages: usize) {
//!         self.blank.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page_num} has no text layer");
//!     }
//! }
//!
//! let counter = Arc::new(BlankPageCounter { blank: AtomicUsize::new(0) });
//!
//! let config = ReportConfig::builder()
//!     .progress_callback(counter as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the text supplier as it reads each selected page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events arrive in page order on the calling thread.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once before the first page is read.
    ///
    /// # Arguments
    /// * `total_pages`: number of selected pages that will be read
    fn on_extraction_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called when a page yielded text.
    ///
    /// # Arguments
    /// * `page_num`: 1-indexed page number
    /// * `total_pages`: selected pages
    /// * `chars`: number of characters extracted from the page
    fn on_page_extracted(&self, page_num: usize, total_pages: usize, chars: usize) {
        let _ = (page_num, total_pages, chars);
    }

    /// Called when a page has no text layer (e.g. a scanned image).
    fn on_page_blank(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called once after all selected pages were read.
    ///
    /// # Arguments
    /// * `total_pages`: selected pages
    /// * `pages_with_text`: pages that yielded non-blank text
    fn on_extraction_complete(&self, total_pages: usize, pages_with_text: usize) {
        let _ = (total_pages, pages_with_text);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ReportConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

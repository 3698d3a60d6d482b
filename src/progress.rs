//! Progress-callback trait for per-page run events.
//!
//! Inject an [`Arc<dyn NotesProgressCallback>`] via
//! [`crate::config::NotesConfigBuilder::progress_callback`] to receive events
//! as the pipeline processes each page.
//!
//! # Example
//!
//! ```rust
//! use pdf2notes::{NotesConfig, NotesProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     noted: AtomicUsize,
//! }
//!
//! impl NotesProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, html_len: usize) {
//!         self.noted.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{} done ({} bytes)", page_num, total_pages, html_len);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { noted: AtomicUsize::new(0) });
//!
//! let config = NotesConfig::builder()
//!     .progress_callback(counter as Arc<dyn NotesProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. With `concurrency > 1`, `on_page_start` may fire for
/// several pages before the first of them completes.
pub trait NotesProgressCallback: Send + Sync {
    /// Called once, after the document is loaded and before any page starts.
    fn on_run_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before a page is rendered.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page produced notes.
    ///
    /// `html_len` is the byte length of the page's notes fragment.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, html_len: usize) {
        let _ = (page_num, total_pages, html_len);
    }

    /// Called when OCR found no text on a page, so no notes were generated.
    fn on_page_skipped(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page fails.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after the last page, only when the run did not abort.
    fn on_run_complete(&self, total_pages: usize, noted_pages: usize) {
        let _ = (total_pages, noted_pages);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl NotesProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::NotesConfig`].
pub type ProgressCallback = Arc<dyn NotesProgressCallback>;

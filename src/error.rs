//! Error types for the pdf2notes library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`NotesError`]: the operation cannot proceed (bad input, upstream
//!   rejected the call, response had the wrong shape). Returned as
//!   `Err(NotesError)` from every public entry point. Wrapper variants
//!   ([`NotesError::GenerationFailed`], [`NotesError::PageFailed`]) keep the
//!   originating error reachable through [`std::error::Error::source`] and
//!   [`NotesError::root_cause`].
//!
//! * [`PageError`]: a serialisable record of one page's failure, stored in
//!   [`crate::output::PageNotes`] when the run is configured to skip failed
//!   pages instead of aborting.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdf2notes library.
#[derive(Debug, Error)]
pub enum NotesError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Caller-supplied input was rejected before any upstream call.
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes do not start with the `%PDF` magic.
    #[error("Input is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The document could not be parsed.
    #[error("PDF is corrupt: {detail}")]
    CorruptPdf { detail: String },

    /// The document is encrypted and no (or a wrong) password was given.
    #[error("PDF is encrypted and requires a password")]
    PasswordRequired,

    /// Selected page numbers exceed the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The rendered page could not be encoded as PNG.
    #[error("Image encoding failed for page {page}: {detail}")]
    EncodeFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH to the directory containing libpdfium, or install it system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Upstream errors ───────────────────────────────────────────────────
    /// An external API answered with a non-success status, or reported an
    /// error object inside a success response.
    #[error("{service} error: {reason}")]
    Upstream {
        service: String,
        status: Option<u16>,
        reason: String,
    },

    /// Success status, but the body is missing the expected fields.
    #[error("Invalid response from {service}: {detail}")]
    MalformedResponse { service: String, detail: String },

    /// The request never produced an HTTP response (DNS, TLS, timeout, …).
    #[error("{service} request failed: {detail}")]
    Transport { service: String, detail: String },

    /// The response body was not valid JSON.
    #[error("{service} returned an unreadable body: {detail}")]
    Decode { service: String, detail: String },

    /// Anything that went wrong while generating notes, after the input check.
    #[error("Failed to generate notes: {source}")]
    GenerationFailed {
        #[source]
        source: Box<NotesError>,
    },

    // ── Run errors ────────────────────────────────────────────────────────
    /// A page failed and the run was aborted.
    #[error("Page {page} failed: {source}")]
    PageFailed {
        page: usize,
        #[source]
        source: Box<NotesError>,
    },

    /// Every selected page failed while skipping failed pages.
    #[error("All {total} pages failed.\nFirst error: {first_error}")]
    AllPagesFailed { total: usize, first_error: String },

    /// The run was cancelled before the given page started.
    #[error("Cancelled before page {page}")]
    Cancelled { page: usize },

    // ── Session errors ────────────────────────────────────────────────────
    /// The session is not in a state that allows the requested step.
    #[error("Cannot move from the {from} view to the {to} view")]
    InvalidTransition { from: String, to: String },

    /// A step needs a loaded document and none is loaded.
    #[error("No PDF loaded; upload a document first")]
    NoDocument,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the exported notes file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NotesError {
    pub(crate) fn invalid_input(reason: impl Into<String>) -> Self {
        NotesError::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Follow wrapper variants down to the error that started the failure.
    pub fn root_cause(&self) -> &NotesError {
        match self {
            NotesError::GenerationFailed { source } | NotesError::PageFailed { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }

    /// Page number attached by [`NotesError::PageFailed`] or
    /// [`NotesError::Cancelled`], if any.
    pub fn page(&self) -> Option<usize> {
        match self {
            NotesError::PageFailed { page, .. } | NotesError::Cancelled { page } => Some(*page),
            NotesError::RasterisationFailed { page, .. } | NotesError::EncodeFailed { page, .. } => {
                Some(*page)
            }
            _ => None,
        }
    }

    /// True for failures a retry may fix: transport errors, HTTP 429 and 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            NotesError::Transport { .. } => true,
            NotesError::Upstream {
                status: Some(code), ..
            } => *code == 429 || (500..600).contains(code),
            _ => false,
        }
    }
}

/// A non-fatal error for a single page.
///
/// Stored in [`crate::output::PageNotes`] when the run skips failed pages.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Page rasterisation or PNG encoding failed.
    #[error("Page {page}: rendering failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The OCR call failed.
    #[error("Page {page}: text recognition failed: {detail}")]
    OcrFailed { page: usize, detail: String },

    /// The note-generation call failed.
    #[error("Page {page}: note generation failed: {detail}")]
    GenerationFailed { page: usize, detail: String },
}

impl PageError {
    pub fn page(&self) -> usize {
        match self {
            PageError::RenderFailed { page, .. }
            | PageError::OcrFailed { page, .. }
            | PageError::GenerationFailed { page, .. } => *page,
        }
    }
}

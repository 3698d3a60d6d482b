//! Pipeline stages for PDF-to-notes processing.
//!
//! Each submodule implements one step, so each is testable alone and the
//! external services can be swapped behind their seams.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ ocr ──▶ notes ──▶ format
//! (path/URL) (pdfium)  (base64)  (Vision) (chat)   (HTML)
//! ```
//!
//! 1. [`input`]: read the user-supplied path or URL into bytes
//! 2. [`render`]: load the document and rasterise one page at a time; pdfium
//!    runs in `spawn_blocking`
//! 3. [`encode`]: PNG-encode and base64-wrap a page image
//! 4. [`ocr`]: one text-detection request per page image
//! 5. [`notes`]: one chat-completion request per page of text
//! 6. [`format`]: deterministic rewrite of the answer into HTML

pub mod encode;
pub mod format;
pub mod input;
pub mod notes;
pub mod ocr;
pub mod render;

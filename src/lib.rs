//! # pdf2notes
//!
//! Turn PDF documents into structured study notes.
//!
//! Each page is rasterised, its text is read by an OCR web service, and a
//! generative-text service rewrites that text as HTML notes. The combined
//! notes go to a rich-text editor for refinement and export.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input   local file or URL → bytes (%PDF magic checked)
//!  ├─ 2. Render  rasterise one page via pdfium (spawn_blocking)
//!  ├─ 3. Encode  PNG → base64
//!  ├─ 4. OCR     one Vision API call per page
//!  ├─ 5. Notes   one chat-completion call per non-empty page
//!  ├─ 6. Format  markdown-ish answer → HTML
//!  └─ 7. Output  `<h2>Page N</h2>…` blocks in page order
//! ```
//!
//! Pages run one at a time by default. Empty pages (no recognized text) are
//! skipped. The first failing page aborts the run unless
//! [`FailurePolicy::SkipFailedPages`] is set.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2notes::{NotesConfig, NotesPipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NotesConfig::builder()
//!         .vision_api_key(std::env::var("VISION_API_KEY")?)
//!         .generation_api_key(std::env::var("GROQ_API_KEY")?)
//!         .build()?;
//!     let pipeline = NotesPipeline::new(config)?;
//!     let html = pipeline
//!         .process_page_by_page(std::fs::read("lecture.pdf")?)
//!         .await?;
//!     println!("{html}");
//!     Ok(())
//! }
//! ```
//!
//! ## Step-by-step sessions
//!
//! [`Session`] drives the interactive flow (load → pick pages → OCR →
//! generate → edit → export) and rejects steps taken out of order.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2notes` binary (clap + indicatif + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2notes = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod editor;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod prompts;
pub mod session;
pub mod stream;
pub mod transport;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    FailurePolicy, GenerationConfig, NotesConfig, NotesConfigBuilder, OcrConfig, PageSelection,
};
pub use editor::{export_html, InMemoryEditor, NoteEditor, DEFAULT_EXPORT_NAME};
pub use error::{NotesError, PageError};
pub use output::{DocumentInfo, NotesOutput, NotesStats, PageNotes};
pub use pipeline::format::format_response;
pub use pipeline::input::read_input;
pub use pipeline::notes::NoteGenerator;
pub use pipeline::ocr::VisionOcrClient;
pub use pipeline::render::{DocumentLoader, PageSource, PdfiumLoader};
pub use process::{CancelHandle, NotesPipeline};
pub use progress::{NoopProgressCallback, NotesProgressCallback, ProgressCallback};
pub use session::{Session, View};
pub use stream::PageStream;
pub use transport::{JsonReply, JsonRequest, JsonTransport, ReqwestTransport, RetryPolicy};

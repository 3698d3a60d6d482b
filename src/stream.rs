//! Streaming notes API: emit pages as they finish.
//!
//! Long documents take minutes. The stream lets callers show each page's
//! notes as soon as it is ready, or write pages to disk incrementally.
//!
//! Items always arrive in ascending page order, even with
//! `concurrency > 1`. A failed page is yielded as an `Err` carrying
//! [`NotesError::PageFailed`]; the stream keeps going, so the caller decides
//! whether to stop. Dropping the stream stops any remaining work.

use crate::error::NotesError;
use crate::output::PageNotes;
use crate::pipeline::render::PageSource;
use crate::process::NotesPipeline;
use futures::stream::StreamExt;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of page results, in page order.
pub type PageStream = Pin<Box<dyn Stream<Item = Result<PageNotes, NotesError>> + Send>>;

impl NotesPipeline {
    /// Load `bytes` and stream notes for each selected page.
    ///
    /// # Example
    /// ```rust,no_run
    /// use futures::StreamExt;
    /// use pdf2notes::{NotesConfig, NotesPipeline};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = NotesConfig::builder()
    ///     .vision_api_key("vision-key")
    ///     .generation_api_key("groq-key")
    ///     .build()?;
    /// let pipeline = NotesPipeline::new(config)?;
    /// let bytes = std::fs::read("lecture.pdf")?;
    /// let mut pages = pipeline.process_stream(bytes).await?;
    /// while let Some(page) = pages.next().await {
    ///     match page {
    ///         Ok(p) => println!("{}", p.html_block().unwrap_or_default()),
    ///         Err(e) => eprintln!("{e}"),
    ///     }
    /// }
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// Document-level failures (not a PDF, corrupt, no pages selected) are
    /// returned before the stream is created.
    pub async fn process_stream(&self, bytes: Vec<u8>) -> Result<PageStream, NotesError> {
        let doc = self.load(bytes).await?;
        self.stream_document(doc)
    }

    /// Stream notes for the selected pages of an already loaded document.
    pub fn stream_document(&self, doc: Arc<dyn PageSource>) -> Result<PageStream, NotesError> {
        let pages = self.selected_pages(doc.page_count())?;
        info!("Streaming notes for {} pages", pages.len());
        let s = self
            .page_outcomes(doc, pages)
            .map(|outcome| outcome.map_err(|failure| failure.into_error()));
        Ok(Box::pin(s))
    }
}

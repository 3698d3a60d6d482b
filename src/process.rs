//! Page-by-page notes pipeline.
//!
//! ## Data Flow
//!
//! ```text
//! bytes ──▶ load ──▶ for each page: render ──▶ encode ──▶ OCR ──▶ notes
//!                                                         │
//!                                            empty text ──┴──▶ skip
//! ```
//!
//! Pages are processed one at a time by default, so only one page raster is
//! alive at any moment. With `concurrency > 1` a bounded window of page tasks
//! runs at once and results are still consumed in page order, so the combined
//! notes never depend on completion order.

use crate::config::{FailurePolicy, NotesConfig};
use crate::error::{NotesError, PageError};
use crate::output::{DocumentInfo, NotesOutput, NotesStats, PageNotes};
use crate::pipeline::encode::encode_page;
use crate::pipeline::notes::NoteGenerator;
use crate::pipeline::ocr::VisionOcrClient;
use crate::pipeline::render::{DocumentLoader, PageSource, PdfiumLoader};
use crate::prompts::page_input;
use crate::transport::{JsonTransport, ReqwestTransport};
use futures::stream::{self, Stream, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Cooperative cancellation flag, checked before each page starts.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear a previous cancellation so the next run starts normally.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The rasterize → OCR → generate pipeline.
///
/// Cheap to clone; all collaborators are shared.
#[derive(Clone)]
pub struct NotesPipeline {
    loader: Arc<dyn DocumentLoader>,
    ocr: VisionOcrClient,
    generator: NoteGenerator,
    config: NotesConfig,
    cancel: CancelHandle,
}

impl NotesPipeline {
    /// Production pipeline: pdfium for documents, reqwest for both upstreams.
    pub fn new(config: NotesConfig) -> Result<Self, NotesError> {
        let mut loader = PdfiumLoader::new()
            .with_password(config.password.clone())
            .with_max_rendered_pixels(config.max_rendered_pixels);
        if let Some(dir) = PdfiumLoader::library_dir_from_env() {
            loader = loader.with_library_dir(dir);
        }
        let transport = Arc::new(ReqwestTransport::from_config(&config)?);
        Ok(Self::with_components(config, Arc::new(loader), transport))
    }

    /// Pipeline over caller-supplied collaborators.
    pub fn with_components(
        config: NotesConfig,
        loader: Arc<dyn DocumentLoader>,
        transport: Arc<dyn JsonTransport>,
    ) -> Self {
        Self {
            ocr: VisionOcrClient::from_config(Arc::clone(&transport), &config),
            generator: NoteGenerator::from_config(transport, &config),
            loader,
            config,
            cancel: CancelHandle::new(),
        }
    }

    pub fn config(&self) -> &NotesConfig {
        &self.config
    }

    pub fn ocr(&self) -> &VisionOcrClient {
        &self.ocr
    }

    pub fn generator(&self) -> &NoteGenerator {
        &self.generator
    }

    /// Handle that stops the run before its next page.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Open a document from bytes.
    pub async fn load(&self, bytes: Vec<u8>) -> Result<Arc<dyn PageSource>, NotesError> {
        self.loader.load(bytes).await
    }

    /// Page count and metadata, without any API call.
    pub async fn inspect(&self, bytes: Vec<u8>) -> Result<DocumentInfo, NotesError> {
        Ok(self.load(bytes).await?.info().clone())
    }

    /// Produce the combined notes HTML for a PDF.
    ///
    /// Each page with recognized text contributes
    /// `<h2>Page N</h2>{notes}\n\n`, in ascending page order; pages without
    /// text contribute nothing.
    ///
    /// # Errors
    /// With the default [`FailurePolicy::FailFast`], the first failing page
    /// aborts the run with [`NotesError::PageFailed`] and nothing from earlier
    /// pages is returned.
    pub async fn process_page_by_page(&self, bytes: Vec<u8>) -> Result<String, NotesError> {
        Ok(self.process(bytes).await?.html)
    }

    /// Like [`Self::process_page_by_page`], also returning per-page records
    /// and stats.
    pub async fn process(&self, bytes: Vec<u8>) -> Result<NotesOutput, NotesError> {
        let doc = self.load(bytes).await?;
        self.process_document(doc).await
    }

    /// Run the pipeline over an already loaded document.
    pub async fn process_document(
        &self,
        doc: Arc<dyn PageSource>,
    ) -> Result<NotesOutput, NotesError> {
        let pages = self.selected_pages(doc.page_count())?;
        self.process_pages(doc, pages).await
    }

    /// Run the pipeline over an explicit list of 1-indexed pages.
    pub async fn process_pages(
        &self,
        doc: Arc<dyn PageSource>,
        pages: Vec<usize>,
    ) -> Result<NotesOutput, NotesError> {
        let start = Instant::now();
        let total_pages = doc.page_count();
        if pages.is_empty() {
            return Err(NotesError::invalid_input("No pages selected"));
        }
        if let Some(&bad) = pages.iter().find(|&&p| p == 0 || p > total_pages) {
            return Err(NotesError::PageOutOfRange {
                page: bad,
                total: total_pages,
            });
        }
        let selected = pages.len();
        info!("Processing {} of {} pages", selected, total_pages);

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_run_start(selected);
        }

        let mut html = String::new();
        let mut results = Vec::with_capacity(selected);
        let mut outcomes = Box::pin(self.page_outcomes(doc, pages));

        while let Some(outcome) = outcomes.next().await {
            match outcome {
                Ok(page) => {
                    if let Some(block) = page.html_block() {
                        html.push_str(&block);
                    }
                    results.push(page);
                }
                Err(failure) => {
                    if failure.is_cancel() || self.config.failure_policy == FailurePolicy::FailFast {
                        return Err(failure.into_error());
                    }
                    warn!("Page {} failed, continuing: {}", failure.page, failure.error);
                    results.push(failure.into_page_notes());
                }
            }
        }

        let noted = results.iter().filter(|p| p.notes_html.is_some()).count();
        let failed = results.iter().filter(|p| p.error.is_some()).count();
        let empty = results.iter().filter(|p| p.is_empty_page()).count();

        if failed == selected {
            let first_error = results
                .iter()
                .find_map(|p| p.error.as_ref())
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(NotesError::AllPagesFailed {
                total: selected,
                first_error,
            });
        }

        let stats = NotesStats {
            total_pages,
            selected_pages: selected,
            noted_pages: noted,
            empty_pages: empty,
            failed_pages: failed,
            total_duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            "Notes complete: {} noted, {} empty, {} failed, {}ms",
            noted, empty, failed, stats.total_duration_ms
        );

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_run_complete(selected, noted);
        }

        Ok(NotesOutput {
            html,
            pages: results,
            stats,
        })
    }

    /// OCR-only pass: each page's text followed by a blank line, in order.
    ///
    /// Pages are rendered at `scale`; any failure aborts the pass.
    pub async fn recognize_pages(
        &self,
        doc: &dyn PageSource,
        pages: &[usize],
        scale: f32,
    ) -> Result<String, NotesError> {
        let mut full_text = String::new();
        for &page_num in pages {
            if self.cancel.is_cancelled() {
                return Err(NotesError::Cancelled { page: page_num });
            }
            let text = self
                .recognize_page(doc, page_num, scale)
                .await
                .map_err(|f| f.into_error())?;
            full_text.push_str(&text);
            full_text.push_str("\n\n");
        }
        Ok(full_text)
    }

    pub(crate) fn selected_pages(&self, total_pages: usize) -> Result<Vec<usize>, NotesError> {
        let pages = self.config.pages.to_page_numbers(total_pages);
        if pages.is_empty() {
            return Err(NotesError::PageOutOfRange {
                page: 0,
                total: total_pages,
            });
        }
        Ok(pages)
    }

    /// Per-page outcomes in page order, at most `concurrency` pages in flight.
    pub(crate) fn page_outcomes(
        &self,
        doc: Arc<dyn PageSource>,
        pages: Vec<usize>,
    ) -> impl Stream<Item = Result<PageNotes, PageFailure>> + Send + 'static {
        let this = self.clone();
        let total = pages.len();
        let window = self.config.concurrency.max(1);
        stream::iter(pages)
            .map(move |page_num| {
                let this = this.clone();
                let doc = Arc::clone(&doc);
                async move { this.run_page(doc.as_ref(), page_num, total).await }
            })
            .buffered(window)
    }

    async fn run_page(
        &self,
        doc: &dyn PageSource,
        page_num: usize,
        total: usize,
    ) -> Result<PageNotes, PageFailure> {
        if self.cancel.is_cancelled() {
            return Err(PageFailure {
                page: page_num,
                stage: Stage::Cancelled,
                recognized_text: String::new(),
                duration_ms: 0,
                error: NotesError::Cancelled { page: page_num },
            });
        }

        let start = Instant::now();
        let cb = self.config.progress_callback.as_ref();
        if let Some(cb) = cb {
            cb.on_page_start(page_num, total);
        }

        let outcome = self.page_steps(doc, page_num, &start).await;
        match &outcome {
            Ok(page) => match (&page.notes_html, cb) {
                (Some(notes), Some(cb)) => cb.on_page_complete(page_num, total, notes.len()),
                (None, Some(cb)) => cb.on_page_skipped(page_num, total),
                _ => {}
            },
            Err(failure) => {
                if let Some(cb) = cb {
                    cb.on_page_error(page_num, total, &failure.error.to_string());
                }
            }
        }
        outcome
    }

    async fn page_steps(
        &self,
        doc: &dyn PageSource,
        page_num: usize,
        start: &Instant,
    ) -> Result<PageNotes, PageFailure> {
        let recognized = self
            .recognize_page(doc, page_num, self.config.render_scale)
            .await
            .map_err(|f| f.timed(start))?;

        if recognized.trim().is_empty() {
            debug!("Page {}: no text recognized, skipping", page_num);
            return Ok(PageNotes {
                page_num,
                recognized_text: recognized,
                notes_html: None,
                duration_ms: start.elapsed().as_millis() as u64,
                error: None,
            });
        }

        let notes = match self
            .generator
            .generate_notes(&page_input(page_num, &recognized))
            .await
        {
            Ok(notes) => notes,
            Err(error) => {
                return Err(PageFailure {
                    page: page_num,
                    stage: Stage::Generate,
                    recognized_text: recognized,
                    duration_ms: start.elapsed().as_millis() as u64,
                    error,
                })
            }
        };

        Ok(PageNotes {
            page_num,
            recognized_text: recognized,
            notes_html: Some(notes),
            duration_ms: start.elapsed().as_millis() as u64,
            error: None,
        })
    }

    /// Render, encode and OCR one page. The raster is dropped before the
    /// OCR request is sent.
    async fn recognize_page(
        &self,
        doc: &dyn PageSource,
        page_num: usize,
        scale: f32,
    ) -> Result<String, PageFailure> {
        let encoded = {
            let image = doc
                .render_page(page_num, scale)
                .await
                .map_err(|e| PageFailure::new(page_num, Stage::Render, e))?;
            encode_page(&image).map_err(|e| {
                PageFailure::new(
                    page_num,
                    Stage::Render,
                    NotesError::EncodeFailed {
                        page: page_num,
                        detail: e.to_string(),
                    },
                )
            })?
        };

        let text = self
            .ocr
            .recognize_text(&encoded)
            .await
            .map_err(|e| PageFailure::new(page_num, Stage::Ocr, e))?;
        debug!("Page {}: recognized {} chars", page_num, text.len());
        Ok(text)
    }
}

/// Pipeline step a page failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Render,
    Ocr,
    Generate,
    Cancelled,
}

/// A failed page, before the run decides whether to abort.
#[derive(Debug)]
pub(crate) struct PageFailure {
    pub(crate) page: usize,
    stage: Stage,
    recognized_text: String,
    duration_ms: u64,
    pub(crate) error: NotesError,
}

impl PageFailure {
    fn new(page: usize, stage: Stage, error: NotesError) -> Self {
        Self {
            page,
            stage,
            recognized_text: String::new(),
            duration_ms: 0,
            error,
        }
    }

    fn timed(mut self, start: &Instant) -> Self {
        self.duration_ms = start.elapsed().as_millis() as u64;
        self
    }

    fn is_cancel(&self) -> bool {
        self.stage == Stage::Cancelled
    }

    /// The error the run reports when it aborts on this page.
    pub(crate) fn into_error(self) -> NotesError {
        match self.stage {
            Stage::Cancelled => self.error,
            _ => NotesError::PageFailed {
                page: self.page,
                source: Box::new(self.error),
            },
        }
    }

    fn page_error(&self) -> PageError {
        let page = self.page;
        let detail = self.error.to_string();
        match self.stage {
            Stage::Render | Stage::Cancelled => PageError::RenderFailed { page, detail },
            Stage::Ocr => PageError::OcrFailed { page, detail },
            Stage::Generate => PageError::GenerationFailed { page, detail },
        }
    }

    fn into_page_notes(self) -> PageNotes {
        PageNotes {
            page_num: self.page,
            error: Some(self.page_error()),
            recognized_text: self.recognized_text,
            notes_html: None,
            duration_ms: self.duration_ms,
        }
    }
}

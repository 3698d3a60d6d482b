//! In-process stand-ins for the PDF renderer and both upstream APIs.
//!
//! Page `n` of a [`FakeLoader`] document renders as an `n`×1 pixel image, so
//! [`FakeTransport`] can recover the page number from the PNG it receives
//! and answer OCR requests from a per-page script.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, Rgba, RgbaImage};
use pdf2notes::pipeline::render::check_pdf_magic;
use pdf2notes::{
    DocumentInfo, DocumentLoader, JsonReply, JsonRequest, JsonTransport, NotesConfig,
    NotesConfigBuilder, NotesError, NotesPipeline, PageSource,
};
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const PDF_BYTES: &[u8] = b"%PDF-1.7\n%fake";

// ── Document fakes ───────────────────────────────────────────────────────────

pub struct FakeLoader {
    pages: usize,
    fail_render: Option<usize>,
}

impl FakeLoader {
    pub fn new(pages: usize) -> Self {
        Self {
            pages,
            fail_render: None,
        }
    }

    pub fn failing_render(mut self, page: usize) -> Self {
        self.fail_render = Some(page);
        self
    }
}

#[async_trait]
impl DocumentLoader for FakeLoader {
    async fn load(&self, bytes: Vec<u8>) -> Result<Arc<dyn PageSource>, NotesError> {
        check_pdf_magic(&bytes)?;
        Ok(Arc::new(FakeDocument {
            info: DocumentInfo {
                page_count: self.pages,
                pdf_version: "Pdf1_7".into(),
                byte_len: bytes.len(),
                ..DocumentInfo::default()
            },
            fail_render: self.fail_render,
        }))
    }
}

struct FakeDocument {
    info: DocumentInfo,
    fail_render: Option<usize>,
}

#[async_trait]
impl PageSource for FakeDocument {
    fn info(&self) -> &DocumentInfo {
        &self.info
    }

    async fn render_page(&self, page_num: usize, _scale: f32) -> Result<DynamicImage, NotesError> {
        if page_num == 0 || page_num > self.info.page_count {
            return Err(NotesError::PageOutOfRange {
                page: page_num,
                total: self.info.page_count,
            });
        }
        if self.fail_render == Some(page_num) {
            return Err(NotesError::RasterisationFailed {
                page: page_num,
                detail: "scripted failure".into(),
            });
        }
        Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            page_num as u32,
            1,
            Rgba([255, 255, 255, 255]),
        )))
    }
}

// ── Upstream fake ────────────────────────────────────────────────────────────

/// Scripted OCR answer for one page.
#[derive(Debug, Clone)]
pub enum Ocr {
    Text(String),
    Status(u16),
}

impl Ocr {
    pub fn text(t: &str) -> Self {
        Ocr::Text(t.to_string())
    }
}

/// Routes Vision requests to the per-page script and echoes generation
/// prompts back as a one-item markdown list.
#[derive(Default)]
pub struct FakeTransport {
    ocr: HashMap<usize, Ocr>,
    fail_generation_for: Option<String>,
    /// OCR latency shrinks as the page number grows, so later pages finish
    /// first when several run at once.
    staggered: bool,
    pub ocr_calls: AtomicUsize,
    pub generation_calls: AtomicUsize,
    pub ocr_order: Mutex<Vec<usize>>,
}

impl FakeTransport {
    pub fn new(script: impl IntoIterator<Item = (usize, Ocr)>) -> Self {
        Self {
            ocr: script.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Pages `1..=n` with text `"text of page {i}"`.
    pub fn with_pages(n: usize) -> Self {
        Self::new((1..=n).map(|i| (i, Ocr::Text(format!("text of page {i}")))))
    }

    pub fn failing_generation_for(mut self, needle: &str) -> Self {
        self.fail_generation_for = Some(needle.to_string());
        self
    }

    pub fn staggered(mut self) -> Self {
        self.staggered = true;
        self
    }

    pub fn total_calls(&self) -> usize {
        self.ocr_calls.load(Ordering::SeqCst) + self.generation_calls.load(Ordering::SeqCst)
    }

    async fn answer_ocr(&self, request: &JsonRequest) -> JsonReply {
        self.ocr_calls.fetch_add(1, Ordering::SeqCst);
        let page = page_from_request(request);
        self.ocr_order.lock().unwrap().push(page);

        if self.staggered {
            tokio::time::sleep(Duration::from_millis(5 * (10 - page.min(9)) as u64)).await;
        }

        match self.ocr.get(&page).cloned().unwrap_or(Ocr::Text(String::new())) {
            Ocr::Text(text) => reply(
                200,
                serde_json::json!({ "responses": [{ "fullTextAnnotation": { "text": text } }] }),
            ),
            Ocr::Status(code) => reply(code, serde_json::json!({ "error": { "code": code } })),
        }
    }

    fn answer_generation(&self, request: &JsonRequest) -> JsonReply {
        self.generation_calls.fetch_add(1, Ordering::SeqCst);
        let prompt = request.body["messages"][0]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        if let Some(ref needle) = self.fail_generation_for {
            if prompt.contains(needle.as_str()) {
                return reply(500, serde_json::json!({ "error": "boom" }));
            }
        }

        let content = format!("- {}", prompt.trim().replace('\n', " "));
        reply(
            200,
            serde_json::json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] }),
        )
    }
}

#[async_trait]
impl JsonTransport for FakeTransport {
    async fn post_json(&self, request: &JsonRequest) -> Result<JsonReply, NotesError> {
        match request.service {
            "Vision API" => Ok(self.answer_ocr(request).await),
            "Generation API" => Ok(self.answer_generation(request)),
            other => Err(NotesError::Internal(format!("unexpected service {other}"))),
        }
    }
}

fn reply(status: u16, body: serde_json::Value) -> JsonReply {
    JsonReply {
        status: StatusCode::from_u16(status).unwrap(),
        body: body.to_string(),
    }
}

/// Page number encoded as the width of the PNG in the OCR request.
fn page_from_request(request: &JsonRequest) -> usize {
    let b64 = request.body["requests"][0]["image"]["content"]
        .as_str()
        .expect("OCR request carries image content");
    let png = STANDARD.decode(b64).expect("valid base64");
    image::load_from_memory(&png).expect("valid PNG").width() as usize
}

// ── Builders ─────────────────────────────────────────────────────────────────

/// Config whose prompt is the bare page text, so generated notes are
/// predictable.
pub fn config() -> NotesConfigBuilder {
    NotesConfig::builder()
        .vision_api_key("vision-test-key")
        .generation_api_key("generation-test-key")
        .prompt_template("{text}")
}

pub fn pipeline(
    config: NotesConfig,
    loader: FakeLoader,
    transport: &Arc<FakeTransport>,
) -> NotesPipeline {
    NotesPipeline::with_components(config, Arc::new(loader), transport.clone())
}

/// The notes block the fakes produce for a page with `text`.
pub fn block(page: usize, text: &str) -> String {
    format!("<h2>Page {page}</h2><ul><li>Page {page}: {text}</li></ul>\n\n")
}

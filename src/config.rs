//! Configuration types for PDF-to-notes runs.
//!
//! All run behaviour is controlled through [`NotesConfig`], built via its
//! [`NotesConfigBuilder`]. Upstream settings (endpoints, keys, model, prompt,
//! sampling parameters) live in [`OcrConfig`] and [`GenerationConfig`] so
//! tests can inject deterministic stand-ins without touching the pipeline.

use crate::error::NotesError;
use crate::progress::ProgressCallback;
use crate::prompts::DEFAULT_NOTES_PROMPT;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default Google Cloud Vision `images:annotate` endpoint.
pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Default OpenAI-compatible chat-completion endpoint (Groq).
pub const DEFAULT_GENERATION_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Default generation model.
pub const DEFAULT_MODEL: &str = "mixtral-8x7b-32768";

/// Settings for the OCR upstream.
#[derive(Clone)]
pub struct OcrConfig {
    /// `images:annotate` URL. The API key is appended as the `key` query parameter.
    pub endpoint: String,
    pub api_key: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_VISION_ENDPOINT.to_string(),
            api_key: String::new(),
        }
    }
}

impl fmt::Debug for OcrConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

/// Settings for the note-generation upstream.
///
/// The prompt and sampling parameters are fixed per client; callers of
/// [`crate::pipeline::notes::NoteGenerator::generate_notes`] only supply text.
#[derive(Clone)]
pub struct GenerationConfig {
    /// Chat-completion URL.
    pub endpoint: String,
    /// Sent as `Authorization: Bearer <api_key>`.
    pub api_key: String,
    pub model: String,
    /// Sampling temperature. Default: 1.0.
    pub temperature: f32,
    /// Nucleus sampling cut-off. Default: 0.9.
    pub top_p: f32,
    /// Prompt template; `{text}` is replaced verbatim with the page text.
    pub prompt_template: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_GENERATION_ENDPOINT.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 1.0,
            top_p: 0.9,
            prompt_template: DEFAULT_NOTES_PROMPT.to_string(),
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("prompt_template_len", &self.prompt_template.len())
            .finish()
    }
}

fn redact(key: &str) -> &'static str {
    if key.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

/// Configuration for a PDF-to-notes run.
///
/// # Example
/// ```rust
/// use pdf2notes::{FailurePolicy, NotesConfig};
///
/// let config = NotesConfig::builder()
///     .vision_api_key("vision-key")
///     .generation_api_key("groq-key")
///     .render_scale(2.0)
///     .failure_policy(FailurePolicy::FailFast)
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 1);
/// ```
#[derive(Clone)]
pub struct NotesConfig {
    pub ocr: OcrConfig,
    pub generation: GenerationConfig,

    /// Scale factor used when rasterising pages for OCR. Range: 0.5–4.0. Default: 2.0.
    pub render_scale: f32,

    /// Scale factor used by the session's OCR-only step. Default: 1.5.
    pub preview_scale: f32,

    /// Cap on either rendered dimension in pixels. Default: 4000.
    ///
    /// A 2× render of an A0 poster would otherwise allocate hundreds of MB.
    pub max_rendered_pixels: u32,

    /// Pages processed at once. Default: 1 (strictly sequential).
    ///
    /// Values above 1 open a bounded window of page tasks; output order is
    /// still page order.
    pub concurrency: usize,

    /// What to do when a page fails. Default: [`FailurePolicy::FailFast`].
    pub failure_policy: FailurePolicy,

    /// Page selection. Default: all pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Per-request timeout in seconds. `None` keeps the HTTP client default.
    pub api_timeout_secs: Option<u64>,

    /// Retry attempts on transient upstream failures. Default: 0.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds; doubles per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            ocr: OcrConfig::default(),
            generation: GenerationConfig::default(),
            render_scale: 2.0,
            preview_scale: 1.5,
            max_rendered_pixels: 4000,
            concurrency: 1,
            failure_policy: FailurePolicy::default(),
            pages: PageSelection::default(),
            password: None,
            api_timeout_secs: None,
            max_retries: 0,
            retry_backoff_ms: 500,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for NotesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotesConfig")
            .field("ocr", &self.ocr)
            .field("generation", &self.generation)
            .field("render_scale", &self.render_scale)
            .field("preview_scale", &self.preview_scale)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("concurrency", &self.concurrency)
            .field("failure_policy", &self.failure_policy)
            .field("pages", &self.pages)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn NotesProgressCallback>"),
            )
            .finish()
    }
}

impl NotesConfig {
    /// Create a new builder for `NotesConfig`.
    pub fn builder() -> NotesConfigBuilder {
        NotesConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`NotesConfig`].
#[derive(Debug)]
pub struct NotesConfigBuilder {
    config: NotesConfig,
}

impl NotesConfigBuilder {
    pub fn vision_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.ocr.endpoint = url.into();
        self
    }

    pub fn vision_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.ocr.api_key = key.into();
        self
    }

    pub fn generation_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.generation.endpoint = url.into();
        self
    }

    pub fn generation_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.generation.api_key = key.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.generation.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn top_p(mut self, p: f32) -> Self {
        self.config.generation.top_p = p.clamp(0.0, 1.0);
        self
    }

    pub fn prompt_template(mut self, template: impl Into<String>) -> Self {
        self.config.generation.prompt_template = template.into();
        self
    }

    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale.clamp(0.5, 4.0);
        self
    }

    pub fn preview_scale(mut self, scale: f32) -> Self {
        self.config.preview_scale = scale.clamp(0.5, 4.0);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<NotesConfig, NotesError> {
        let c = &self.config;
        if !c.generation.prompt_template.contains("{text}") {
            return Err(NotesError::InvalidConfig(
                "prompt template must contain a {text} placeholder".into(),
            ));
        }
        if c.ocr.endpoint.is_empty() || c.generation.endpoint.is_empty() {
            return Err(NotesError::InvalidConfig("endpoints must not be empty".into()));
        }
        if c.generation.model.trim().is_empty() {
            return Err(NotesError::InvalidConfig("model must not be empty".into()));
        }
        if c.api_timeout_secs == Some(0) {
            return Err(NotesError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How a run reacts to a failing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Abort the whole run on the first failing page; no partial output. (default)
    #[default]
    FailFast,
    /// Record the failure on the page and continue with the next one.
    SkipFailedPages,
}

/// Specifies which pages of the PDF to process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Every page (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 1-indexed page numbers.
    pub fn to_page_numbers(&self, total_pages: usize) -> Vec<usize> {
        let mut pages: Vec<usize> = match self {
            PageSelection::All => (1..=total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![*p]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => ((*start).max(1)..=(*end).min(total_pages)).collect(),
            PageSelection::Set(pages) => pages
                .iter()
                .copied()
                .filter(|&p| p >= 1 && p <= total_pages)
                .collect(),
        };
        pages.sort_unstable();
        pages.dedup();
        pages
    }
}

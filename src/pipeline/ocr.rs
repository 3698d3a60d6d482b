//! OCR: one page image → recognized text via the Vision `images:annotate` API.
//!
//! One request per call. There is no caching and no deduplication of
//! identical images; two calls with the same bytes hit the network twice.

use crate::config::{NotesConfig, OcrConfig};
use crate::error::NotesError;
use crate::pipeline::encode::strip_data_uri_prefix;
use crate::transport::{send_with_retry, JsonRequest, JsonTransport, RetryPolicy};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// Service name used in errors and logs.
pub const VISION_SERVICE: &str = "Vision API";

/// Client for the OCR upstream.
#[derive(Clone)]
pub struct VisionOcrClient {
    transport: Arc<dyn JsonTransport>,
    config: OcrConfig,
    retry: RetryPolicy,
}

impl VisionOcrClient {
    pub fn new(transport: Arc<dyn JsonTransport>, config: OcrConfig) -> Self {
        Self {
            transport,
            config,
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_config(transport: Arc<dyn JsonTransport>, config: &NotesConfig) -> Self {
        Self::new(transport, config.ocr.clone()).with_retry(RetryPolicy::from_config(config))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Recognize the text in a base64 image.
    ///
    /// A `data:` URI prefix is stripped first. An image without any text
    /// yields `Ok("")`.
    ///
    /// # Errors
    /// - [`NotesError::Upstream`] for a non-success status (message carries
    ///   the status description) or a per-image error in the reply
    /// - [`NotesError::MalformedResponse`] when `responses` is missing
    /// - [`NotesError::Decode`] / [`NotesError::Transport`] for lower-level failures
    pub async fn recognize_text(&self, image_base64: &str) -> Result<String, NotesError> {
        let content = strip_data_uri_prefix(image_base64);
        let request = JsonRequest {
            service: VISION_SERVICE,
            url: self.config.endpoint.clone(),
            query: vec![("key".to_string(), self.config.api_key.clone())],
            bearer: None,
            body: annotate_body(content),
        };

        let reply = send_with_retry(self.transport.as_ref(), &request, self.retry).await?;
        reply.error_for_status(VISION_SERVICE)?;

        let parsed: AnnotateResponse = reply.json(VISION_SERVICE)?;
        let text = extract_text(parsed)?;
        debug!("OCR recognized {} chars", text.len());
        Ok(text)
    }
}

/// Request body for a single image with `TEXT_DETECTION`.
pub fn annotate_body(content: &str) -> serde_json::Value {
    json!({
        "requests": [{
            "image": { "content": content },
            "features": [{ "type": "TEXT_DETECTION" }]
        }]
    })
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    responses: Option<Vec<ImageAnnotation>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageAnnotation {
    full_text_annotation: Option<FullTextAnnotation>,
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    error: Option<ProviderStatus>,
}

#[derive(Debug, Deserialize)]
struct FullTextAnnotation {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ProviderStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

fn extract_text(parsed: AnnotateResponse) -> Result<String, NotesError> {
    let responses = parsed.responses.ok_or_else(|| NotesError::MalformedResponse {
        service: VISION_SERVICE.to_string(),
        detail: "missing `responses` array".into(),
    })?;
    let first = responses.into_iter().next().unwrap_or_default();

    if let Some(status) = first.error {
        return Err(NotesError::Upstream {
            service: VISION_SERVICE.to_string(),
            status: None,
            reason: format!("{} (code {})", status.message, status.code),
        });
    }

    if let Some(full) = first.full_text_annotation {
        return Ok(full.text);
    }
    Ok(first
        .text_annotations
        .into_iter()
        .next()
        .map(|a| a.description)
        .unwrap_or_default())
}

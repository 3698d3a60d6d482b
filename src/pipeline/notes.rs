//! Note generation: recognized text → formatted HTML notes.
//!
//! Builds the fixed prompt from [`crate::config::GenerationConfig`], makes one
//! chat-completion call and runs the answer through
//! [`crate::pipeline::format::format_response`]. Every failure after the
//! empty-input check is reported as [`NotesError::GenerationFailed`] with the
//! underlying error as its source.

use crate::config::{GenerationConfig, NotesConfig};
use crate::error::NotesError;
use crate::pipeline::format::format_response;
use crate::prompts::render_prompt;
use crate::transport::{send_with_retry, JsonRequest, JsonTransport, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Service name used in errors and logs.
pub const GENERATION_SERVICE: &str = "Generation API";

/// Client for the generative-text upstream.
#[derive(Clone)]
pub struct NoteGenerator {
    transport: Arc<dyn JsonTransport>,
    config: GenerationConfig,
    retry: RetryPolicy,
}

impl NoteGenerator {
    pub fn new(transport: Arc<dyn JsonTransport>, config: GenerationConfig) -> Self {
        Self {
            transport,
            config,
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_config(transport: Arc<dyn JsonTransport>, config: &NotesConfig) -> Self {
        Self::new(transport, config.generation.clone()).with_retry(RetryPolicy::from_config(config))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Turn `text` into formatted HTML notes.
    ///
    /// # Errors
    /// - [`NotesError::InvalidInput`] when `text` is blank; no request is sent
    /// - [`NotesError::GenerationFailed`] wrapping an upstream status error,
    ///   a malformed or undecodable body, or a transport failure
    pub async fn generate_notes(&self, text: &str) -> Result<String, NotesError> {
        if text.trim().is_empty() {
            return Err(NotesError::invalid_input(
                "No text content provided for summarization",
            ));
        }

        self.request_notes(text).await.map_err(|e| {
            warn!("Note generation failed: {}", e);
            NotesError::GenerationFailed {
                source: Box::new(e),
            }
        })
    }

    async fn request_notes(&self, text: &str) -> Result<String, NotesError> {
        let body = ChatRequest {
            messages: vec![ChatMessage {
                role: "user",
                content: render_prompt(&self.config.prompt_template, text),
            }],
            model: &self.config.model,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            stream: false,
        };
        let request = JsonRequest {
            service: GENERATION_SERVICE,
            url: self.config.endpoint.clone(),
            query: Vec::new(),
            bearer: Some(self.config.api_key.clone()),
            body: serde_json::to_value(&body)
                .map_err(|e| NotesError::Internal(format!("request body: {e}")))?,
        };

        let reply = send_with_retry(self.transport.as_ref(), &request, self.retry).await?;
        reply.error_for_status(GENERATION_SERVICE)?;

        let parsed: ChatResponse = reply.json(GENERATION_SERVICE)?;
        let content = parsed.into_content().ok_or_else(|| NotesError::MalformedResponse {
            service: GENERATION_SERVICE.to_string(),
            detail: "missing choices[0].message.content".into(),
        })?;
        debug!("Generated {} chars of notes", content.len());

        Ok(format_response(&content))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage>,
    model: &'a str,
    temperature: f32,
    top_p: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ReplyMessage>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

impl ChatResponse {
    /// First choice's content, treating an empty string as absent.
    fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|c| !c.is_empty())
    }
}

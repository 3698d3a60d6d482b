//! HTTP seam shared by the OCR and note-generation clients.
//!
//! Both upstreams are "POST a JSON body, read a status and a body". Putting
//! that behind [`JsonTransport`] keeps the clients' response handling
//! testable with an in-process fake, and gives one place for the optional
//! timeout and retry knobs.
//!
//! ## Retry Strategy
//!
//! Off by default (`max_retries = 0`). When enabled, transport failures,
//! HTTP 429 and 5xx are retried with exponential backoff
//! (`retry_backoff_ms * 2^(attempt-1)`); every other status is returned to
//! the caller on the first attempt.

use crate::config::NotesConfig;
use crate::error::NotesError;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// One outbound JSON POST.
#[derive(Debug, Clone)]
pub struct JsonRequest {
    /// Human-readable upstream name used in errors and logs.
    pub service: &'static str,
    pub url: String,
    /// Query parameters appended to `url` (kept out of logs).
    pub query: Vec<(String, String)>,
    /// Sent as `Authorization: Bearer <token>` when set.
    pub bearer: Option<String>,
    pub body: serde_json::Value,
}

/// Status and raw body of an upstream reply.
#[derive(Debug, Clone)]
pub struct JsonReply {
    pub status: StatusCode,
    pub body: String,
}

impl JsonReply {
    /// Status description in the form browsers expose as `statusText`.
    pub fn status_text(&self) -> String {
        self.status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| self.status.as_u16().to_string())
    }

    /// Map a non-success status to [`NotesError::Upstream`].
    pub fn error_for_status(&self, service: &str) -> Result<(), NotesError> {
        if self.status.is_success() {
            Ok(())
        } else {
            Err(NotesError::Upstream {
                service: service.to_string(),
                status: Some(self.status.as_u16()),
                reason: self.status_text(),
            })
        }
    }

    /// Parse the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self, service: &str) -> Result<T, NotesError> {
        serde_json::from_str(&self.body).map_err(|e| NotesError::Decode {
            service: service.to_string(),
            detail: e.to_string(),
        })
    }
}

/// Sends JSON POST requests to an upstream.
///
/// Implementations return `Ok` for every HTTP response, whatever its status;
/// `Err` is reserved for requests that never produced a response.
#[async_trait]
pub trait JsonTransport: Send + Sync {
    async fn post_json(&self, request: &JsonRequest) -> Result<JsonReply, NotesError>;
}

/// [`JsonTransport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client; `timeout_secs = None` keeps reqwest's default (no timeout).
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, NotesError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| NotesError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn from_config(config: &NotesConfig) -> Result<Self, NotesError> {
        Self::new(config.api_timeout_secs)
    }
}

#[async_trait]
impl JsonTransport for ReqwestTransport {
    async fn post_json(&self, request: &JsonRequest) -> Result<JsonReply, NotesError> {
        let mut builder = self
            .client
            .post(&request.url)
            .query(&request.query)
            .json(&request.body);
        if let Some(ref token) = request.bearer {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| NotesError::Transport {
            service: request.service.to_string(),
            detail: e.without_url().to_string(),
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| NotesError::Transport {
            service: request.service.to_string(),
            detail: e.without_url().to_string(),
        })?;
        debug!(
            "{}: HTTP {} ({} bytes)",
            request.service,
            status.as_u16(),
            body.len()
        );

        Ok(JsonReply { status, body })
    }
}

/// Retry settings applied around a [`JsonTransport`] call.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_ms: u64,
}

impl RetryPolicy {
    pub fn from_config(config: &NotesConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_ms: config.retry_backoff_ms,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(
            self.backoff_ms
                .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1))),
        )
    }
}

/// Send `request`, retrying transient failures per `policy`.
///
/// Returns the last reply (whatever its status) or the last transport error.
pub async fn send_with_retry(
    transport: &dyn JsonTransport,
    request: &JsonRequest,
    policy: RetryPolicy,
) -> Result<JsonReply, NotesError> {
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            let backoff = policy.backoff(attempt);
            warn!(
                "{}: retry {}/{} after {}ms",
                request.service,
                attempt,
                policy.max_retries,
                backoff.as_millis()
            );
            sleep(backoff).await;
        }

        let outcome = transport.post_json(request).await;
        let transient = match &outcome {
            Ok(reply) => reply
                .error_for_status(request.service)
                .is_err_and(|e| e.is_transient()),
            Err(e) => e.is_transient(),
        };

        if !transient || attempt >= policy.max_retries {
            return outcome;
        }
        attempt += 1;
    }
}

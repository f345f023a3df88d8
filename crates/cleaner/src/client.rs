//! Cleaning service HTTP client.
//!
//! Async reqwest client. One request per call; nothing is retried.

use std::time::Duration;

use async_trait::async_trait;
use econfab_core::{AssemblyError, RawInput, SourceKind};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use thiserror::Error;

use crate::payload::{split_payload, CleanedPayload};

/// Where the cleaning service listens unless configured otherwise.
pub const DEFAULT_ENDPOINT: &str = econfab_core::DEFAULT_CLEANER_ENDPOINT;

/// Request timeout. Cleaning several workbooks can take a while.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(econfab_core::DEFAULT_CLEANER_TIMEOUT_SECS);

/// Error type for cleaning service calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CleanerError {
    /// Endpoint is not an absolute http(s) URL
    #[error("invalid cleaning service endpoint '{0}'")]
    InvalidEndpoint(String),
    /// Connection failure, timeout, or unreadable body
    #[error("network error: {0}")]
    Network(String),
    /// Non-success status; `message` is the service's `error` field when it sent one
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    /// Health response was not the expected JSON
    #[error("unexpected response: {0}")]
    Parse(String),
    /// No client was built because no request was expected
    #[error("no cleaning service configured")]
    NotConfigured,
}

impl From<CleanerError> for AssemblyError {
    fn from(err: CleanerError) -> Self {
        match err {
            CleanerError::Http { status, message } => AssemblyError::Rejected { status, body: message },
            other => AssemblyError::Network(other.to_string()),
        }
    }
}

/// Something that turns several raw files into one cleaned table.
///
/// The pipeline only sees this trait, so tests can stand in a fake.
#[async_trait]
pub trait Cleaner: Send + Sync {
    async fn clean(&self, inputs: &[RawInput]) -> Result<CleanedPayload, CleanerError>;
}

/// An absent cleaner refuses every request. Lets a caller that only
/// assembles locally skip building a client.
#[async_trait]
impl<C: Cleaner> Cleaner for Option<C> {
    async fn clean(&self, inputs: &[RawInput]) -> Result<CleanedPayload, CleanerError> {
        match self {
            Some(cleaner) => cleaner.clean(inputs).await,
            None => Err(CleanerError::NotConfigured),
        }
    }
}

/// `GET /health` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub openai_configured: bool,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Cleaning service client (async).
#[derive(Clone)]
pub struct CleanerClient {
    http: reqwest::Client,
    endpoint: String,
    use_ai: Option<bool>,
}

impl CleanerClient {
    /// Build a client for `endpoint` (scheme and host, no trailing path).
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, CleanerError> {
        let endpoint = endpoint.trim().trim_end_matches('/').to_string();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(CleanerError::InvalidEndpoint(endpoint));
        }

        let http = reqwest::Client::builder()
            .user_agent(format!("econfab/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| CleanerError::Network(e.to_string()))?;

        Ok(Self {
            http,
            endpoint,
            use_ai: None,
        })
    }

    /// Send the `use_openai` form field. `None` leaves the service default.
    pub fn with_use_ai(mut self, use_ai: Option<bool>) -> Self {
        self.use_ai = use_ai;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Probe the service.
    pub async fn health(&self) -> Result<HealthReport, CleanerError> {
        let url = format!("{}/health", self.endpoint);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| CleanerError::Network(e.to_string()))?;
        let body = check_status(response).await?;
        serde_json::from_str(&body).map_err(|e| CleanerError::Parse(e.to_string()))
    }

    fn form(&self, inputs: &[RawInput]) -> Result<Form, CleanerError> {
        let mut form = Form::new();
        for input in inputs {
            let part = Part::bytes(input.bytes().to_vec())
                .file_name(input.name().to_string())
                .mime_str(mime_type(input))
                .map_err(|e| CleanerError::Network(e.to_string()))?;
            form = form.part("files", part);
        }
        if let Some(use_ai) = self.use_ai {
            form = form.text("use_openai", if use_ai { "true" } else { "false" });
        }
        Ok(form)
    }
}

#[async_trait]
impl Cleaner for CleanerClient {
    /// `POST /upload` with every file under the repeated `files` field.
    async fn clean(&self, inputs: &[RawInput]) -> Result<CleanedPayload, CleanerError> {
        let url = format!("{}/upload", self.endpoint);
        let bytes: usize = inputs.iter().map(RawInput::len).sum();
        tracing::info!(url = %url, files = inputs.len(), bytes, "sending files to cleaning service");

        let response = self
            .http
            .post(&url)
            .multipart(self.form(inputs)?)
            .send()
            .await
            .map_err(|e| CleanerError::Network(e.to_string()))?;
        let body = check_status(response).await?;

        tracing::debug!(bytes = body.len(), "cleaning service responded");
        Ok(split_payload(&body))
    }
}

/// Body text of a successful response, or the error it carries.
async fn check_status(response: reqwest::Response) -> Result<String, CleanerError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CleanerError::Http {
            status: status.as_u16(),
            message: extract_error(&body),
        });
    }
    response.text().await.map_err(|e| CleanerError::Network(e.to_string()))
}

/// The service reports failures as `{"error": "..."}`; fall back to the raw body.
fn extract_error(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

fn mime_type(input: &RawInput) -> &'static str {
    match input.kind() {
        SourceKind::Csv => "text/csv",
        SourceKind::Spreadsheet => "application/octet-stream",
    }
}

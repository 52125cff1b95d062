//! HTTP transport for text-generation backends
//!
//! Speaks a minimal generate protocol:
//!
//! ```text
//! POST {base_url}/generate
//! { "prompt": "...", "system_context": "...", "max_tokens": 4096, "temperature": 0.7, "model": "..." }
//!
//! 200 OK
//! { "text": "..." }
//! ```
//!
//! `response` is accepted in place of `text`, and newline-delimited JSON
//! bodies (one chunk per line) are concatenated.

use async_trait::async_trait;
use consensus_application::{CompletionRequest, GatewayError, LlmTransport};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434/api";

/// Connection settings for the HTTP backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpBackendConfig {
    pub base_url: String,
    /// Sent as a bearer token when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model used when a persona does not name one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    pub connect_timeout: Duration,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            default_model: None,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl HttpBackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    fn generate_url(&self) -> String {
        format!("{}/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_context: Option<&'a str>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(alias = "response")]
    text: String,
}

/// [`LlmTransport`] over HTTP via reqwest
pub struct HttpModelTransport {
    config: HttpBackendConfig,
    client: reqwest::Client,
}

impl HttpModelTransport {
    pub fn new(config: HttpBackendConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| GatewayError::TransportFailure(format!("failed to build client: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &HttpBackendConfig {
        &self.config
    }

    fn build_body<'a>(&'a self, request: &'a CompletionRequest) -> GenerateRequest<'a> {
        GenerateRequest {
            prompt: &request.prompt,
            system_context: request.system_context.as_deref(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            model: request
                .model
                .as_deref()
                .or(self.config.default_model.as_deref()),
        }
    }
}

#[async_trait]
impl LlmTransport for HttpModelTransport {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GatewayError> {
        let url = self.config.generate_url();
        let body = self.build_body(request);
        debug!(model = ?body.model, "POST {}", url);

        let mut http_req = self.client.post(&url).json(&body);
        if let Some(ref key) = self.config.api_key {
            http_req = http_req.bearer_auth(key);
        }

        let response = http_req.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(map_status(status, &body_text));
        }

        let body_text = response.text().await.map_err(map_reqwest_error)?;
        trace!("Response body: {} bytes", body_text.len());
        parse_body(&body_text)
    }
}

/// Map a non-success HTTP status onto a gateway error.
pub fn map_status(status: StatusCode, body: &str) -> GatewayError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => GatewayError::RateLimited,
        StatusCode::REQUEST_TIMEOUT => GatewayError::Timeout,
        _ => {
            let detail = body.trim();
            if detail.is_empty() {
                GatewayError::TransportFailure(format!("backend returned {status}"))
            } else {
                GatewayError::TransportFailure(format!("backend returned {status}: {detail}"))
            }
        }
    }
}

fn map_reqwest_error(error: reqwest::Error) -> GatewayError {
    if error.is_timeout() {
        GatewayError::Timeout
    } else if error.is_decode() {
        GatewayError::InvalidResponse(error.to_string())
    } else {
        GatewayError::TransportFailure(error.to_string())
    }
}

/// Extract the generated text from a response body.
///
/// Accepts a single JSON object or newline-delimited JSON chunks.
pub fn parse_body(body: &str) -> Result<String, GatewayError> {
    if let Ok(single) = serde_json::from_str::<GenerateResponse>(body) {
        return Ok(single.text);
    }

    let mut text = String::new();
    let mut chunks = 0;
    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let chunk: GenerateResponse = serde_json::from_str(line)
            .map_err(|e| GatewayError::InvalidResponse(format!("malformed response body: {e}")))?;
        text.push_str(&chunk.text);
        chunks += 1;
    }

    if chunks == 0 {
        return Err(GatewayError::InvalidResponse(
            "response body is empty".to_string(),
        ));
    }
    Ok(text)
}

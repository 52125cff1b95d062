//! LLM transport port
//!
//! Defines the interface for delivering one completion request to an
//! external text-generation backend. Implementations (adapters) live in the
//! infrastructure layer; timeout and retry policy live in
//! [`ModelGateway`](crate::gateway::ModelGateway), not here.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur for a single generation call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Request timed out")]
    Timeout,

    #[error("Rate limited by backend")]
    RateLimited,

    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Prompt cannot be empty")]
    EmptyPrompt,
}

impl GatewayError {
    /// Transient errors are eligible for one automatic retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Timeout | GatewayError::RateLimited)
    }
}

/// A single completion request
///
/// Serializes to the backend request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Transport for LLM completion calls
///
/// One call to `complete` is one outbound request. Implementations map
/// their native failures onto [`GatewayError`] kinds and never panic.
#[async_trait]
pub trait LlmTransport: Send + Sync {
    /// Send a completion request and return the generated text
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GatewayError>;
}

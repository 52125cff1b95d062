//! Model gateway
//!
//! Wraps an [`LlmTransport`] with the per-call policy shared by every stage:
//! prompt validation, a hard timeout per attempt, and at most one retry of
//! transient failures.

use crate::config::{RetryPolicy, SamplingParams};
use crate::ports::llm_transport::{CompletionRequest, GatewayError, LlmTransport};
use consensus_domain::Persona;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Single point of contact with the text-generation backend
pub struct ModelGateway<T: LlmTransport + 'static> {
    transport: Arc<T>,
    retry: RetryPolicy,
    sampling: SamplingParams,
}

impl<T: LlmTransport + 'static> Clone for ModelGateway<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            retry: self.retry,
            sampling: self.sampling,
        }
    }
}

impl<T: LlmTransport + 'static> ModelGateway<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            retry: RetryPolicy::default(),
            sampling: SamplingParams::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }

    /// Generate a completion for `prompt`, optionally under a persona's
    /// system context.
    ///
    /// Each attempt is bounded by `timeout`. A transient failure is retried
    /// once after the configured delay. Callers enforce any overall deadline
    /// by dropping the future.
    pub async fn generate(
        &self,
        prompt: &str,
        persona: Option<&Persona>,
        timeout: Duration,
    ) -> Result<String, GatewayError> {
        if prompt.trim().is_empty() {
            return Err(GatewayError::EmptyPrompt);
        }

        let request = self.build_request(prompt, persona);
        let label = persona.map(|p| p.name.as_str()).unwrap_or("anonymous");
        let mut retries = 0;

        loop {
            match self.attempt(&request, timeout).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && retries < self.retry.max_retries() => {
                    retries += 1;
                    warn!(
                        persona = %label,
                        "Call failed ({}), retrying in {:?}",
                        e,
                        self.retry.delay()
                    );
                    tokio::time::sleep(self.retry.delay()).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt(
        &self,
        request: &CompletionRequest,
        timeout: Duration,
    ) -> Result<String, GatewayError> {
        debug!("Sending request (timeout {:?})", timeout);
        let text = tokio::time::timeout(timeout, self.transport.complete(request))
            .await
            .map_err(|_| GatewayError::Timeout)??;

        if text.trim().is_empty() {
            return Err(GatewayError::InvalidResponse(
                "backend returned an empty completion".to_string(),
            ));
        }
        Ok(text)
    }

    fn build_request(&self, prompt: &str, persona: Option<&Persona>) -> CompletionRequest {
        CompletionRequest {
            prompt: prompt.to_string(),
            system_context: persona.map(|p| p.stance.clone()),
            model: persona.and_then(|p| p.model.clone()),
            max_tokens: self.sampling.max_tokens,
            temperature: self.sampling.temperature,
        }
    }
}

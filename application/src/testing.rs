//! Scripted transport for use-case tests

use crate::ports::llm_transport::{CompletionRequest, GatewayError, LlmTransport};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// One scripted reply, optionally delivered after a delay
#[derive(Debug, Clone)]
pub struct Reply {
    delay: Duration,
    result: Result<String, GatewayError>,
}

impl Reply {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(text.into()),
        }
    }

    pub fn err(error: GatewayError) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(error),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type Handler = Box<dyn Fn(&CompletionRequest, usize) -> Reply + Send + Sync>;

/// Transport whose replies are decided by a handler
///
/// The handler receives the request and the zero-based index of the call.
pub struct ScriptedTransport {
    handler: Handler,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedTransport {
    pub fn new(
        handler: impl Fn(&CompletionRequest, usize) -> Reply + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Replies in order; calls beyond the script fail.
    pub fn queue(replies: Vec<Reply>) -> Self {
        Self::new(move |_, index| {
            replies.get(index).cloned().unwrap_or_else(|| {
                Reply::err(GatewayError::TransportFailure("script exhausted".to_string()))
            })
        })
    }

    /// Replies chosen by the request's system context and prompt.
    pub fn routed(route: impl Fn(&str, &str) -> Reply + Send + Sync + 'static) -> Self {
        Self::new(move |request, _| {
            route(
                request.system_context.as_deref().unwrap_or_default(),
                &request.prompt,
            )
        })
    }

    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmTransport for ScriptedTransport {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GatewayError> {
        let reply = {
            let mut calls = self.calls.lock().unwrap();
            let index = calls.len();
            calls.push(request.clone());
            (self.handler)(request, index)
        };
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        reply.result
    }
}

//! Expert panel stage
//!
//! Dispatches the query to every persona concurrently and collects the
//! answers, each with the confidence the expert reported for it.

use crate::gateway::ModelGateway;
use crate::ports::llm_transport::LlmTransport;
use crate::ports::progress::ProgressNotifier;
use crate::use_cases::shared::expert_error;
use consensus_domain::{
    ExpertError, ExpertErrorKind, ExpertResponse, PersonaRoster, PromptTemplate, Query, Stage,
    extract_confidence,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Responses gathered by the panel
#[derive(Debug, Clone, PartialEq)]
pub struct PanelOutcome {
    /// One response per persona, in roster order
    pub responses: Vec<ExpertResponse>,
    /// True when the pipeline deadline cut the stage short
    pub interrupted: bool,
}

impl PanelOutcome {
    /// True when no persona produced an answer.
    pub fn all_failed(&self) -> bool {
        self.responses.iter().all(|r| !r.is_success())
    }
}

/// Fans the query out to every persona in the roster
pub struct ExpertPanel<T: LlmTransport + 'static> {
    gateway: ModelGateway<T>,
    timeout_per_call: Duration,
    default_confidence: f64,
}

impl<T: LlmTransport + 'static> ExpertPanel<T> {
    pub fn new(gateway: ModelGateway<T>, timeout_per_call: Duration) -> Self {
        Self {
            gateway,
            timeout_per_call,
            default_confidence: 0.5,
        }
    }

    pub fn with_default_confidence(mut self, confidence: f64) -> Self {
        self.default_confidence = confidence;
        self
    }

    /// Ask every persona the query in parallel.
    ///
    /// Individual failures are recorded on the response. If `deadline`
    /// passes first, outstanding calls are aborted and recorded as
    /// cancelled.
    pub async fn evaluate(
        &self,
        query: &Query,
        roster: &PersonaRoster,
        deadline: Instant,
        progress: &dyn ProgressNotifier,
    ) -> PanelOutcome {
        info!("Stage 1: Expert Panel ({} personas)", roster.len());
        progress.on_stage_start(Stage::Panel, roster.len());

        let prompt: Arc<str> = PromptTemplate::expert_query(query.content()).into();
        let started = Instant::now();
        let mut join_set = JoinSet::new();

        for (position, persona) in roster.iter().enumerate() {
            let gateway = self.gateway.clone();
            let persona = persona.clone();
            let prompt = Arc::clone(&prompt);
            let timeout = self.timeout_per_call;

            join_set.spawn(async move {
                let call_started = Instant::now();
                let result = gateway.generate(&prompt, Some(&persona), timeout).await;
                (position, persona.name, result, call_started.elapsed())
            });
        }

        let mut slots: Vec<Option<ExpertResponse>> = vec![None; roster.len()];
        let mut interrupted = false;

        loop {
            match tokio::time::timeout_at(deadline, join_set.join_next()).await {
                Ok(Some(Ok((position, name, result, latency)))) => {
                    let response = match result {
                        Ok(text) => self.to_response(name, &text, latency),
                        Err(e) => {
                            warn!(persona = %name, "Expert failed: {}", e);
                            ExpertResponse::failure(name, expert_error(&e), latency)
                        }
                    };
                    progress.on_task_complete(
                        Stage::Panel,
                        &response.persona_name,
                        response.is_success(),
                    );
                    slots[position] = Some(response);
                }
                Ok(Some(Err(e))) => {
                    warn!("Task join error: {}", e);
                }
                Ok(None) => break,
                Err(_) => {
                    warn!("Pipeline deadline reached during the panel stage");
                    join_set.abort_all();
                    interrupted = true;
                    break;
                }
            }
        }

        // Slots still empty were either cut off by the deadline or lost to a
        // panicked task.
        let responses = roster
            .iter()
            .zip(slots)
            .map(|(persona, slot)| {
                slot.unwrap_or_else(|| {
                    let error = if interrupted {
                        ExpertError::cancelled()
                    } else {
                        ExpertError::new(ExpertErrorKind::TransportFailure, "expert task aborted")
                    };
                    progress.on_task_complete(Stage::Panel, &persona.name, false);
                    ExpertResponse::failure(persona.name.clone(), error, started.elapsed())
                })
            })
            .collect();

        progress.on_stage_complete(Stage::Panel);
        PanelOutcome {
            responses,
            interrupted,
        }
    }

    fn to_response(&self, name: String, text: &str, latency: Duration) -> ExpertResponse {
        let (answer, confidence) = extract_confidence(text, self.default_confidence);
        if answer.is_empty() {
            warn!(persona = %name, "Expert returned only a confidence tag");
            return ExpertResponse::failure(
                name,
                ExpertError::new(ExpertErrorKind::InvalidResponse, "answer is empty"),
                latency,
            );
        }
        debug!(persona = %name, confidence, "Expert responded in {:?}", latency);
        ExpertResponse::success(name, answer, confidence, latency)
    }
}

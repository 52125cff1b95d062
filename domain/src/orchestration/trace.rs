//! Transparency trace of a pipeline run

use super::entities::PipelineState;
use crate::consensus::value_objects::{CritiqueVerdict, ExpertResponse};
use serde::{Deserialize, Serialize};

/// Everything observed during one run, kept even when the run fails
///
/// Responses are stored in roster order regardless of completion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineTrace {
    pub query: String,
    /// One entry per persona, including failures
    pub responses: Vec<ExpertResponse>,
    /// One entry per critiqued (successful) response
    pub verdicts: Vec<CritiqueVerdict>,
    /// True when synthesis ran on raw self-reported confidences
    pub degraded_critique: bool,
    /// States visited, in order
    pub states: Vec<PipelineState>,
}

impl PipelineTrace {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            responses: Vec::new(),
            verdicts: Vec::new(),
            degraded_critique: false,
            states: Vec::new(),
        }
    }

    /// Record a state transition.
    ///
    /// Returns `false` (and records nothing) when the transition is not
    /// allowed from the current state.
    #[must_use]
    pub fn record(&mut self, state: PipelineState) -> bool {
        let allowed = match self.states.last() {
            None => state == PipelineState::Dispatched,
            Some(current) => current.can_transition_to(&state),
        };
        if allowed {
            self.states.push(state);
        }
        allowed
    }

    pub fn current_state(&self) -> Option<&PipelineState> {
        self.states.last()
    }

    pub fn successful_responses(&self) -> impl Iterator<Item = &ExpertResponse> {
        self.responses.iter().filter(|r| r.is_success())
    }

    pub fn failed_responses(&self) -> impl Iterator<Item = &ExpertResponse> {
        self.responses.iter().filter(|r| !r.is_success())
    }

    pub fn response_for(&self, persona_name: &str) -> Option<&ExpertResponse> {
        self.responses.iter().find(|r| r.persona_name == persona_name)
    }

    pub fn verdict_for(&self, persona_name: &str) -> Option<&CritiqueVerdict> {
        self.verdicts.iter().find(|v| v.persona_name == persona_name)
    }
}

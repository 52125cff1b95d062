//! Consensus value objects - immutable records produced by each stage.
//!
//! - [`ExpertResponse`] - one persona's answer (or failure) from the panel
//! - [`CritiqueVerdict`] - critique-adjusted confidence for a surviving response
//! - [`ConsensusResult`] - the final answer with its contributing experts

use super::scoring::{blend_confidence, clamp_unit};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Category of an expert call failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpertErrorKind {
    /// The call exceeded its per-call timeout
    Timeout,
    /// The backend throttled the request
    RateLimited,
    /// The request could not be delivered or the backend failed
    TransportFailure,
    /// The backend answered with something unusable
    InvalidResponse,
    /// The call was still pending when the pipeline deadline expired
    Cancelled,
}

impl ExpertErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpertErrorKind::Timeout => "timeout",
            ExpertErrorKind::RateLimited => "rate_limited",
            ExpertErrorKind::TransportFailure => "transport_failure",
            ExpertErrorKind::InvalidResponse => "invalid_response",
            ExpertErrorKind::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ExpertErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A failed expert call, kept as data in the trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpertError {
    pub kind: ExpertErrorKind,
    pub message: String,
}

impl ExpertError {
    pub fn new(kind: ExpertErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(
            ExpertErrorKind::Cancelled,
            "pipeline deadline expired before the call completed",
        )
    }
}

impl std::fmt::Display for ExpertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Response from a single persona in the panel stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpertResponse {
    /// The persona that produced this response
    pub persona_name: String,
    /// Answer text with the confidence tag removed; empty on failure
    pub answer_text: String,
    /// Confidence the expert reported for its own answer, in [0, 1]
    pub self_reported_confidence: f64,
    /// Wall-clock latency of the call in milliseconds
    pub latency_ms: u64,
    /// Failure details, if the call did not succeed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ExpertError>,
}

impl ExpertResponse {
    /// Creates a successful response.
    pub fn success(
        persona_name: impl Into<String>,
        answer_text: impl Into<String>,
        self_reported_confidence: f64,
        latency: Duration,
    ) -> Self {
        Self {
            persona_name: persona_name.into(),
            answer_text: answer_text.into(),
            self_reported_confidence: clamp_unit(self_reported_confidence),
            latency_ms: latency.as_millis() as u64,
            error: None,
        }
    }

    /// Creates a failed response. It carries no answer and zero confidence.
    pub fn failure(persona_name: impl Into<String>, error: ExpertError, latency: Duration) -> Self {
        Self {
            persona_name: persona_name.into(),
            answer_text: String::new(),
            self_reported_confidence: 0.0,
            latency_ms: latency.as_millis() as u64,
            error: Some(error),
        }
    }

    /// Returns `true` if the persona produced an answer.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Critique-adjusted confidence for one surviving response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CritiqueVerdict {
    pub persona_name: String,
    /// Blended confidence in [0, 1]
    pub adjusted_confidence: f64,
    /// Score the critic assigned, absent when the critique fell back
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critique_score: Option<f64>,
    pub critique_notes: String,
}

impl CritiqueVerdict {
    /// Verdict from a successful critique: blends the two confidences.
    pub fn scored(
        response: &ExpertResponse,
        critique_score: f64,
        critique_notes: impl Into<String>,
        self_weight: f64,
    ) -> Self {
        let score = clamp_unit(critique_score);
        Self {
            persona_name: response.persona_name.clone(),
            adjusted_confidence: blend_confidence(
                response.self_reported_confidence,
                score,
                self_weight,
            ),
            critique_score: Some(score),
            critique_notes: critique_notes.into(),
        }
    }

    /// Verdict when the critique could not be obtained: keeps the
    /// self-reported confidence unchanged.
    pub fn fallback(response: &ExpertResponse, reason: impl Into<String>) -> Self {
        Self {
            persona_name: response.persona_name.clone(),
            adjusted_confidence: clamp_unit(response.self_reported_confidence),
            critique_score: None,
            critique_notes: reason.into(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.critique_score.is_none()
    }
}

/// One entry of the contributing-experts list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributingExpert {
    pub persona_name: String,
    pub adjusted_confidence: f64,
}

/// How the final answer was produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SynthesisMode {
    /// The top-ranked answer was taken as-is
    Anchor { persona: String },
    /// Near-tied answers were merged by the synthesizer
    Merged { personas: Vec<String> },
    /// The merge call failed; the top-ranked answer was used instead
    Fallback { persona: String, reason: String },
}

impl std::fmt::Display for SynthesisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SynthesisMode::Anchor { persona } => write!(f, "anchored on {}", persona),
            SynthesisMode::Merged { personas } => write!(f, "merged {}", personas.join(" + ")),
            SynthesisMode::Fallback { persona, reason } => {
                write!(f, "merge failed ({}), anchored on {}", reason, persona)
            }
        }
    }
}

/// Terminal artifact of one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub final_answer: String,
    /// Every surviving persona, sorted by adjusted confidence descending
    pub contributing_experts: Vec<ContributingExpert>,
    pub overall_confidence: f64,
    pub synthesis: SynthesisMode,
}

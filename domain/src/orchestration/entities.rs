//! Orchestration domain entities

use serde::{Deserialize, Serialize};

/// Stage of the consensus pipeline, used for progress reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Every persona answers the query in parallel
    Panel,
    /// The critic scores each surviving answer
    Critique,
    /// Ranked answers are combined into the final answer
    Synthesis,
}

impl Stage {
    pub fn as_str(&self) -> &str {
        match self {
            Stage::Panel => "panel",
            Stage::Critique => "critique",
            Stage::Synthesis => "synthesis",
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Stage::Panel => "Expert Panel",
            Stage::Critique => "Critique",
            Stage::Synthesis => "Synthesis",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Why a pipeline run ended in [`PipelineState::Failed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Every persona call failed
    NoExpertsAvailable,
    /// The overall pipeline budget was exceeded
    PipelineTimeout,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::NoExpertsAvailable => write!(f, "no experts available"),
            FailureReason::PipelineTimeout => write!(f, "pipeline timeout"),
        }
    }
}

/// State of a pipeline run
///
/// ```text
/// Dispatched ──▶ Critiqued ──▶ Synthesized ──▶ Done
///      │             │              │
///      └─────────────┴──────────────┴──▶ Failed(reason)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum PipelineState {
    Dispatched,
    Critiqued,
    Synthesized,
    Done,
    Failed(FailureReason),
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed(_))
    }

    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(&self, next: &PipelineState) -> bool {
        match (self, next) {
            (PipelineState::Dispatched, PipelineState::Critiqued) => true,
            (PipelineState::Critiqued, PipelineState::Synthesized) => true,
            (PipelineState::Synthesized, PipelineState::Done) => true,
            (from, PipelineState::Failed(_)) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::Dispatched => write!(f, "Dispatched"),
            PipelineState::Critiqued => write!(f, "Critiqued"),
            PipelineState::Synthesized => write!(f, "Synthesized"),
            PipelineState::Done => write!(f, "Done"),
            PipelineState::Failed(reason) => write!(f, "Failed({})", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        assert!(PipelineState::Dispatched.can_transition_to(&PipelineState::Critiqued));
        assert!(PipelineState::Critiqued.can_transition_to(&PipelineState::Synthesized));
        assert!(PipelineState::Synthesized.can_transition_to(&PipelineState::Done));
    }

    #[test]
    fn test_failed_reachable_from_any_non_terminal() {
        let failed = PipelineState::Failed(FailureReason::PipelineTimeout);
        assert!(PipelineState::Dispatched.can_transition_to(&failed));
        assert!(PipelineState::Critiqued.can_transition_to(&failed));
        assert!(PipelineState::Synthesized.can_transition_to(&failed));
        assert!(!PipelineState::Done.can_transition_to(&failed));
        assert!(!failed.can_transition_to(&failed));
    }

    #[test]
    fn test_no_skipping_stages() {
        assert!(!PipelineState::Dispatched.can_transition_to(&PipelineState::Synthesized));
        assert!(!PipelineState::Critiqued.can_transition_to(&PipelineState::Done));
        assert!(!PipelineState::Done.can_transition_to(&PipelineState::Dispatched));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(
            PipelineState::Failed(FailureReason::NoExpertsAvailable).to_string(),
            "Failed(no experts available)"
        );
        assert_eq!(Stage::Critique.to_string(), "Critique");
    }

    #[test]
    fn test_state_serialization() {
        let json =
            serde_json::to_value(PipelineState::Failed(FailureReason::PipelineTimeout)).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["reason"], "pipeline_timeout");
    }
}

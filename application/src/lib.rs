//! Application layer for expert-consensus
//!
//! This crate contains use cases, port definitions, the model gateway and
//! pipeline configuration. It depends only on the domain layer.

pub mod config;
pub mod gateway;
pub mod ports;
pub mod use_cases;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::{PipelineConfig, RetryPolicy, SamplingParams};
pub use gateway::ModelGateway;
pub use ports::{
    llm_transport::{CompletionRequest, GatewayError, LlmTransport},
    progress::{NoProgress, ProgressNotifier},
};
pub use use_cases::critique::{CriticStage, CritiqueOutcome};
pub use use_cases::evaluate_panel::{ExpertPanel, PanelOutcome};
pub use use_cases::run_consensus::{
    ConsensusReport, RunConsensusError, RunConsensusInput, RunConsensusUseCase,
};
pub use use_cases::synthesize::{ConsensusSynthesizer, SynthesisError};

//! Domain layer for expert-consensus
//!
//! This crate contains the core entities, value objects and the pure
//! consensus algorithm. It has no dependencies on infrastructure or
//! presentation concerns, and performs no I/O.
//!
//! # Core Concepts
//!
//! ## Expert Panel
//!
//! A fixed roster of [`Persona`]s answers the same [`Query`] independently.
//! Each answer carries a self-reported confidence.
//!
//! ## Critique
//!
//! A critic scores every surviving answer; the score is blended with the
//! self-reported confidence into an adjusted confidence.
//!
//! ## Consensus
//!
//! Survivors are ranked by adjusted confidence. A clear winner is taken as
//! the answer; near-tied leaders are merged.

pub mod config;
pub mod consensus;
pub mod core;
pub mod orchestration;
pub mod persona;
pub mod prompt;

// Re-export commonly used types
pub use config::{ConfigIssue, ConfigIssueCode, OutputFormat, Severity};
pub use consensus::{
    ConsensusParams, ConsensusResult, ContributingExpert, CritiqueVerdict, ExpertError,
    ExpertErrorKind, ExpertResponse, RankedCandidate, SynthesisMode, blend_confidence,
    extract_confidence, near_tie_band, overall_confidence, parse_confidence,
    parse_critique_score, rank_candidates,
};
pub use self::core::{error::DomainError, query::Query};
pub use orchestration::{
    entities::{FailureReason, PipelineState, Stage},
    trace::PipelineTrace,
};
pub use persona::{Persona, PersonaRoster};
pub use prompt::{MergeCandidate, PromptTemplate};

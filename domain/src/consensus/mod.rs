//! Consensus domain
//!
//! Pure scoring and ranking logic for the three-stage pipeline:
//!
//! ```text
//!  ExpertPanel ──▶ CriticStage ──▶ ConsensusSynthesizer
//!  ExpertResponse   CritiqueVerdict   ConsensusResult
//! ```
//!
//! Nothing in here performs I/O. The application layer feeds model output
//! through [`parsing`], blends confidences with [`scoring`] and orders the
//! survivors with [`ranking`].

pub mod parsing;
pub mod ranking;
pub mod scoring;
pub mod value_objects;

pub use parsing::{extract_confidence, parse_confidence, parse_critique_score};
pub use ranking::{RankedCandidate, near_tie_band, rank_candidates};
pub use scoring::{ConsensusParams, blend_confidence, clamp_unit, overall_confidence};
pub use value_objects::{
    ConsensusResult, ContributingExpert, CritiqueVerdict, ExpertError, ExpertErrorKind,
    ExpertResponse, SynthesisMode,
};

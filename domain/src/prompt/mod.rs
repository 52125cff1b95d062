//! Prompt domain
//!
//! Templates for generating prompts at each stage of the consensus pipeline.

mod template;

pub use template::{MergeCandidate, PromptTemplate};

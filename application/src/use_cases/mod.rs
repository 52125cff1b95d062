//! Use cases
//!
//! The three pipeline stages and the use case that runs them in order.

pub mod critique;
pub mod evaluate_panel;
pub mod run_consensus;
pub(crate) mod shared;
pub mod synthesize;

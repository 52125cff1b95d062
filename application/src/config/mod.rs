//! Application-level configuration.
//!
//! - [`PipelineConfig`] - the options object accepted by a consensus run
//! - [`RetryPolicy`] - automatic retry of transient gateway errors
//! - [`SamplingParams`] - generation parameters forwarded to the backend

pub mod pipeline_config;

pub use pipeline_config::{PipelineConfig, RetryPolicy, SamplingParams};

//! Presentation-level configuration
//!
//! Configuration for output formatting and chat behavior.

use consensus_domain::OutputFormat;
use serde::{Deserialize, Serialize};

/// Output configuration for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Enable colored terminal output
    pub color: bool,
    /// Show progress indicators
    pub show_progress: bool,
    /// Print the per-stage trace to stderr in answer mode
    pub show_trace: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            color: true,
            show_progress: true,
            show_trace: false,
        }
    }
}

/// Chat configuration for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Questions answered before the session ends
    pub max_iterations: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self { max_iterations: 5 }
    }
}

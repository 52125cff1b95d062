//! Output format value object

use serde::{Deserialize, Serialize};

/// Output format for consensus results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Final answer plus the full per-stage trace
    Full,
    /// Only the final answer (default)
    #[default]
    Answer,
    /// JSON output of result and trace
    Json,
}

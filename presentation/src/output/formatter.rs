//! Output formatter trait

use consensus_application::{ConsensusReport, RunConsensusError};
use consensus_domain::OutputFormat;

/// Trait for formatting consensus outcomes
pub trait OutputFormatter {
    /// Final answer plus the full per-stage trace
    fn format_full(&self, report: &ConsensusReport) -> String;

    /// Only the final answer
    fn format_answer(&self, report: &ConsensusReport) -> String;

    /// JSON document with status, result and trace
    fn format_json(&self, report: &ConsensusReport) -> String;

    /// Human-readable failure, including whatever trace was gathered
    fn format_failure(&self, error: &RunConsensusError) -> String;

    /// JSON document describing a failure
    fn format_failure_json(&self, error: &RunConsensusError) -> String;

    /// Render an outcome in the requested format
    fn render(
        &self,
        format: OutputFormat,
        outcome: &Result<ConsensusReport, RunConsensusError>,
    ) -> String {
        match (format, outcome) {
            (OutputFormat::Full, Ok(report)) => self.format_full(report),
            (OutputFormat::Answer, Ok(report)) => self.format_answer(report),
            (OutputFormat::Json, Ok(report)) => self.format_json(report),
            (OutputFormat::Json, Err(error)) => self.format_failure_json(error),
            (_, Err(error)) => self.format_failure(error),
        }
    }
}

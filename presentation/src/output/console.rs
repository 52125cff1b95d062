//! Console output formatter for consensus results

use crate::output::formatter::OutputFormatter;
use colored::Colorize;
use consensus_application::{ConsensusReport, RunConsensusError};
use consensus_domain::{PipelineTrace, SynthesisMode};
use serde_json::json;

/// Formats consensus results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format the complete report
    pub fn format(report: &ConsensusReport) -> String {
        let result = &report.result;
        let mut output = String::new();

        output.push_str(&Self::header("Expert Consensus"));
        output.push('\n');
        output.push_str(&Self::format_trace(&report.trace));

        // Stage 3: Synthesis
        output.push_str(&Self::section_header("Stage 3: Synthesis"));
        output.push_str(&format!(
            "\n{} {}\n",
            "Mode:".cyan().bold(),
            Self::describe_mode(&result.synthesis)
        ));
        output.push_str(&format!("{}\n", "Contributors:".cyan().bold()));
        for expert in &result.contributing_experts {
            output.push_str(&format!(
                "  * {} ({:.2})\n",
                expert.persona_name, expert.adjusted_confidence
            ));
        }
        output.push_str(&format!(
            "{} {:.2}\n",
            "Overall confidence:".cyan().bold(),
            result.overall_confidence
        ));

        output.push_str(&Self::section_header("Final Answer"));
        output.push_str(&format!("\n{}\n", result.final_answer));

        output.push_str(&Self::footer());
        output
    }

    /// Format the panel and critique stages of a trace
    pub fn format_trace(trace: &PipelineTrace) -> String {
        let mut output = String::new();

        output.push_str(&format!("{} {}\n", "Question:".cyan().bold(), trace.query));
        output.push_str(&format!(
            "{} {}\n",
            "States:".cyan().bold(),
            trace
                .states
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(" -> ")
        ));

        // Stage 1: Expert Panel
        output.push_str(&Self::section_header("Stage 1: Expert Panel"));
        for response in &trace.responses {
            match &response.error {
                None => output.push_str(&format!(
                    "\n{}\n{}\n",
                    format!(
                        "── {} (confidence {:.2}, {} ms) ──",
                        response.persona_name,
                        response.self_reported_confidence,
                        response.latency_ms
                    )
                    .yellow()
                    .bold(),
                    response.answer_text
                )),
                Some(error) => output.push_str(&format!(
                    "\n{}\nError: {}\n",
                    format!("── {} ({} ms) ──", response.persona_name, response.latency_ms)
                        .red()
                        .bold(),
                    error
                )),
            }
        }

        // Stage 2: Critique
        output.push_str(&Self::section_header("Stage 2: Critique"));
        if trace.verdicts.is_empty() {
            output.push_str(&format!("\n{}\n", "No critiques; using self-reported confidences".dimmed()));
        }
        for verdict in &trace.verdicts {
            let title = match verdict.critique_score {
                Some(score) => format!(
                    "── {} → {:.2} (score {:.2}) ──",
                    verdict.persona_name, verdict.adjusted_confidence, score
                ),
                None => format!(
                    "── {} → {:.2} (unscored) ──",
                    verdict.persona_name, verdict.adjusted_confidence
                ),
            };
            output.push_str(&format!(
                "\n{}\n{}\n",
                title.yellow().bold(),
                Self::indent(&verdict.critique_notes, "  ")
            ));
        }
        if trace.degraded_critique && !trace.verdicts.is_empty() {
            output.push_str(&format!(
                "\n{}\n",
                "No critique produced a score; using self-reported confidences".yellow()
            ));
        }

        output
    }

    /// Format as JSON
    pub fn format_json(report: &ConsensusReport) -> String {
        let document = json!({
            "status": "done",
            "result": report.result,
            "trace": report.trace,
        });
        serde_json::to_string_pretty(&document).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format the final answer only
    pub fn format_answer_only(report: &ConsensusReport) -> String {
        report.result.final_answer.clone()
    }

    /// Format a failed run
    pub fn format_failure(error: &RunConsensusError) -> String {
        let mut output = format!("{} {}\n", "Error:".red().bold(), error);
        if let Some(trace) = error.trace() {
            output.push('\n');
            output.push_str(&Self::format_trace(trace));
        }
        output
    }

    /// Format a failed run as JSON
    pub fn format_failure_json(error: &RunConsensusError) -> String {
        let document = json!({
            "status": "failed",
            "reason": error.failure_reason(),
            "error": error.to_string(),
            "trace": error.trace(),
        });
        serde_json::to_string_pretty(&document).unwrap_or_else(|_| "{}".to_string())
    }

    fn describe_mode(mode: &SynthesisMode) -> String {
        match mode {
            SynthesisMode::Anchor { persona } => format!("top answer from {}", persona),
            SynthesisMode::Merged { personas } => format!("merged {}", personas.join(" + ")),
            SynthesisMode::Fallback { persona, reason } => {
                format!("merge failed ({}); top answer from {}", reason, persona)
            }
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_full(&self, report: &ConsensusReport) -> String {
        Self::format(report)
    }

    fn format_answer(&self, report: &ConsensusReport) -> String {
        Self::format_answer_only(report)
    }

    fn format_json(&self, report: &ConsensusReport) -> String {
        Self::format_json(report)
    }

    fn format_failure(&self, error: &RunConsensusError) -> String {
        Self::format_failure(error)
    }

    fn format_failure_json(&self, error: &RunConsensusError) -> String {
        Self::format_failure_json(error)
    }
}

//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for consensus results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Final answer plus every stage of the trace
    Full,
    /// Only the final answer
    Answer,
    /// JSON output of result and trace
    Json,
}

impl From<OutputFormat> for consensus_domain::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Full => consensus_domain::OutputFormat::Full,
            OutputFormat::Answer => consensus_domain::OutputFormat::Answer,
            OutputFormat::Json => consensus_domain::OutputFormat::Json,
        }
    }
}

/// CLI arguments for expert-consensus
#[derive(Parser, Debug)]
#[command(name = "expert-consensus")]
#[command(author, version, about = "Expert panel consensus - several personas answer, a critic scores, a synthesizer decides")]
#[command(long_about = r#"
Expert Consensus asks a panel of expert personas the same question and
combines their answers into one.

The pipeline has three stages:
1. Expert Panel: every persona answers in parallel and reports a confidence
2. Critique: a critic scores each answer; the score adjusts the confidence
3. Synthesis: the top answer wins, or near-tied leaders are merged

Configuration is loaded from (in priority order):
1. CONSENSUS_* environment variables (e.g. CONSENSUS_BACKEND__API_KEY)
2. --config <path>     Explicit config file
3. ./consensus.toml    Project-level config
4. ~/.config/expert-consensus/config.toml   Global config

Example:
  expert-consensus "Why is the sky blue?"
  expert-consensus -o full --threshold 0.05 "Is P equal to NP?"
  expert-consensus --chat --max-iterations 3
"#)]
pub struct Cli {
    /// The question to put to the panel (not required in chat mode)
    pub query: Option<String>,

    /// Start interactive chat mode
    #[arg(short, long)]
    pub chat: bool,

    /// Questions answered before chat mode ends
    #[arg(long, value_name = "N")]
    pub max_iterations: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration sources and the effective configuration, then exit
    #[arg(long)]
    pub show_config: bool,

    /// Timeout for each model call, in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Budget for the whole pipeline, in seconds
    #[arg(long, value_name = "SECS")]
    pub pipeline_timeout: Option<u64>,

    /// Maximum confidence gap between the top answers that triggers a merge
    #[arg(long, value_name = "GAP")]
    pub threshold: Option<f64>,

    /// Skip the critique stage and rank by self-reported confidence
    #[arg(long)]
    pub no_critique: bool,

    /// Backend base URL (requests go to <URL>/generate)
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Print the per-stage trace to stderr after the answer
    #[arg(long)]
    pub trace: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_with_overrides() {
        let cli = Cli::try_parse_from([
            "expert-consensus",
            "-o",
            "json",
            "--timeout",
            "10",
            "--threshold",
            "0.05",
            "--no-critique",
            "-vv",
            "Why is the sky blue?",
        ])
        .unwrap();

        assert_eq!(cli.query.as_deref(), Some("Why is the sky blue?"));
        assert_eq!(cli.output, Some(OutputFormat::Json));
        assert_eq!(cli.timeout, Some(10));
        assert_eq!(cli.threshold, Some(0.05));
        assert!(cli.no_critique);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_chat_without_query() {
        let cli =
            Cli::try_parse_from(["expert-consensus", "--chat", "--max-iterations", "3"]).unwrap();
        assert!(cli.chat);
        assert!(cli.query.is_none());
        assert_eq!(cli.max_iterations, Some(3));
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["expert-consensus", "-o", "synthesis", "q"]).is_err());
    }
}

//! CLI entrypoint for expert-consensus
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Result, bail};
use clap::Parser;
use colored::Colorize;
use consensus_application::{NoProgress, ProgressNotifier, RunConsensusInput, RunConsensusUseCase};
use consensus_domain::{OutputFormat, Query};
use consensus_infrastructure::{ConfigLoader, FileConfig, HttpModelTransport};
use consensus_presentation::{
    ChatConfig, ChatRepl, Cli, ConsoleFormatter, OutputConfig, OutputFormatter, ProgressReporter,
    SimpleProgress,
};
use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Exit status for configuration errors
const EXIT_CONFIG: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only answers and JSON
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting expert-consensus");

    // === Configuration ===
    let mut file_config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        match ConfigLoader::load(cli.config.as_deref()) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{} {}", "Configuration error:".red().bold(), e);
                return Ok(ExitCode::from(EXIT_CONFIG));
            }
        }
    };
    apply_overrides(&mut file_config, &cli);

    let issues = file_config.validate();
    for issue in &issues {
        if issue.is_error() {
            eprintln!("{} {}", "error:".red().bold(), issue);
        } else {
            eprintln!("{} {}", "warning:".yellow().bold(), issue);
        }
    }
    if FileConfig::has_errors(&issues) {
        return Ok(ExitCode::from(EXIT_CONFIG));
    }

    if cli.show_config {
        show_config(&cli, &file_config)?;
        return Ok(ExitCode::SUCCESS);
    }

    let pipeline = match file_config.to_pipeline_config() {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("{} {}", "Configuration error:".red().bold(), e);
            return Ok(ExitCode::from(EXIT_CONFIG));
        }
    };

    let output = OutputConfig {
        format: cli
            .output
            .map(Into::into)
            .or(file_config.output.format)
            .unwrap_or_default(),
        color: file_config.output.color,
        show_progress: file_config.output.show_progress && !cli.quiet,
        show_trace: cli.trace,
    };
    if !output.color {
        colored::control::set_override(false);
    }
    debug!(format = ?output.format, experts = pipeline.roster.len(), "Configuration resolved");

    // === Dependency Injection ===
    let transport = Arc::new(HttpModelTransport::new(file_config.backend.to_http_config())?);

    // Chat mode
    if cli.chat {
        let chat = ChatConfig {
            max_iterations: cli
                .max_iterations
                .unwrap_or(file_config.chat.max_iterations),
        };
        ChatRepl::new(transport, pipeline)
            .with_output(output)
            .with_chat(chat)
            .run()
            .await?;
        return Ok(ExitCode::SUCCESS);
    }

    // Single question mode - query is required
    let Some(question) = cli.query else {
        bail!("A query is required. Use --chat for interactive mode.");
    };
    let input = RunConsensusInput::new(Query::new(question)?, pipeline);

    let use_case = RunConsensusUseCase::new(transport);
    // Progress bars only make sense on a terminal
    let progress: Box<dyn ProgressNotifier> = if !output.show_progress {
        Box::new(NoProgress)
    } else if std::io::stderr().is_terminal() {
        Box::new(ProgressReporter::new())
    } else {
        Box::new(SimpleProgress)
    };
    let outcome = use_case.execute_with_progress(input, progress.as_ref()).await;

    let rendered = ConsoleFormatter.render(output.format, &outcome);
    match (&outcome, output.format) {
        (Err(_), format) if format != OutputFormat::Json => eprintln!("{}", rendered),
        _ => println!("{}", rendered),
    }

    // Full and JSON output already carry the trace
    if output.show_trace
        && output.format == OutputFormat::Answer
        && let Ok(report) = &outcome
    {
        eprintln!("{}", ConsoleFormatter::format_trace(&report.trace));
    }

    Ok(if outcome.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn log_filter(verbose: u8) -> EnvFilter {
    match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    }
}

/// Command-line flags take precedence over every configuration source.
fn apply_overrides(config: &mut FileConfig, cli: &Cli) {
    if let Some(secs) = cli.timeout {
        config.pipeline.timeout_per_call_secs = secs;
    }
    if let Some(secs) = cli.pipeline_timeout {
        config.pipeline.pipeline_timeout_secs = secs;
    }
    if let Some(threshold) = cli.threshold {
        config.pipeline.closeness_threshold = threshold;
    }
    if cli.no_critique {
        config.pipeline.enable_critique = false;
    }
    if let Some(url) = &cli.base_url {
        config.backend.base_url = url.clone();
    }
    if let Some(format) = cli.output {
        config.output.format = Some(format.into());
    }
    if cli.quiet {
        config.output.show_progress = false;
    }
    if let Some(n) = cli.max_iterations {
        config.chat.max_iterations = n;
    }
}

fn show_config(cli: &Cli, config: &FileConfig) -> Result<()> {
    println!("{}", "Configuration sources:".bold());
    if cli.no_config {
        println!("  (configuration files disabled)");
    } else {
        for source in ConfigLoader::describe_sources(cli.config.as_deref()) {
            println!("  {}", source);
        }
    }
    println!();

    let mut shown = config.clone();
    if shown.backend.api_key.is_some() {
        shown.backend.api_key = Some("********".to_string());
    }
    println!("{}", "Effective configuration:".bold());
    println!("{}", toml::to_string_pretty(&shown)?);
    Ok(())
}

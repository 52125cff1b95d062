//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod backend;
mod chat;
mod output;
mod personas;
mod pipeline;

pub use backend::FileBackendConfig;
pub use chat::FileChatConfig;
pub use output::FileOutputConfig;
pub use personas::{FilePersonaConfig, FileStagePersonaConfig, build_roster, validate_personas};
pub use pipeline::FilePipelineConfig;

use consensus_application::PipelineConfig;
use consensus_domain::{ConfigIssue, DomainError, PromptTemplate};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Model backend connection
    pub backend: FileBackendConfig,
    /// Timeouts, retry and consensus tuning
    pub pipeline: FilePipelineConfig,
    /// Expert roster; empty selects the built-in personas
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub personas: Vec<FilePersonaConfig>,
    /// Critic persona overrides
    pub critic: FileStagePersonaConfig,
    /// Synthesizer persona overrides
    pub synthesizer: FileStagePersonaConfig,
    /// Output settings
    pub output: FileOutputConfig,
    /// Interactive chat settings
    pub chat: FileChatConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        issues.extend(self.backend.validate());
        issues.extend(self.pipeline.validate());
        issues.extend(validate_personas(&self.personas));
        issues
    }

    /// True if any issue is fatal.
    pub fn has_errors(issues: &[ConfigIssue]) -> bool {
        issues.iter().any(ConfigIssue::is_error)
    }

    /// Convert into the options object of a consensus run.
    pub fn to_pipeline_config(&self) -> Result<PipelineConfig, DomainError> {
        let pipeline = &self.pipeline;
        let mut config = PipelineConfig::default()
            .with_roster(build_roster(&self.personas)?)
            .with_critic(
                self.critic
                    .to_persona("critic", PromptTemplate::critic_stance()),
            )
            .with_synthesizer(
                self.synthesizer
                    .to_persona("synthesizer", PromptTemplate::synthesizer_stance()),
            )
            .with_timeout_per_call(Duration::from_secs(pipeline.timeout_per_call_secs))
            .with_pipeline_timeout(Duration::from_secs(pipeline.pipeline_timeout_secs))
            .with_consensus(pipeline.consensus_params())
            .with_retry(pipeline.retry_policy())
            .with_sampling(pipeline.sampling_params());
        if !pipeline.enable_critique {
            config = config.without_critique();
        }
        Ok(config)
    }
}

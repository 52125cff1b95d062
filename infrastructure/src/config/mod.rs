//! Configuration file loading for expert-consensus
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `CONSENSUS_` prefixed environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./consensus.toml` or `./.consensus.toml`
//! 4. Global: `~/.config/expert-consensus/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    FileBackendConfig, FileChatConfig, FileConfig, FileOutputConfig, FilePersonaConfig,
    FilePipelineConfig, FileStagePersonaConfig,
};
pub use loader::ConfigLoader;

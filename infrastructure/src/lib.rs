//! Infrastructure layer for expert-consensus
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: the HTTP model transport and
//! configuration file loading.

pub mod config;
pub mod http;

// Re-export commonly used types
pub use config::{
    ConfigLoader, FileBackendConfig, FileChatConfig, FileConfig, FileOutputConfig,
    FilePersonaConfig, FilePipelineConfig, FileStagePersonaConfig,
};
pub use http::{HttpBackendConfig, HttpModelTransport};

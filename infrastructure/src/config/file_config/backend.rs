//! Backend connection configuration from TOML (`[backend]` section)

use crate::http::{DEFAULT_BASE_URL, HttpBackendConfig};
use consensus_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw backend configuration from TOML
///
/// # Example
///
/// ```toml
/// [backend]
/// base_url = "http://localhost:11434/api"
/// default_model = "gemma2:9b"
/// # api_key is better supplied as CONSENSUS_BACKEND__API_KEY
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBackendConfig {
    /// Base URL; requests go to `{base_url}/generate`
    pub base_url: String,
    /// Bearer token for the backend
    pub api_key: Option<String>,
    /// Model used by personas that do not name their own
    pub default_model: Option<String>,
    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for FileBackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            default_model: Some("gemma2:9b".to_string()),
            connect_timeout_secs: 10,
        }
    }
}

impl FileBackendConfig {
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        if self.base_url.trim().is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::MissingBaseUrl,
                "backend.base_url cannot be empty",
            ));
        }
        if self.connect_timeout_secs == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ZeroDuration {
                    field: "backend.connect_timeout_secs".to_string(),
                },
                "backend.connect_timeout_secs must be greater than zero",
            ));
        }
        issues
    }

    pub fn to_http_config(&self) -> HttpBackendConfig {
        HttpBackendConfig {
            base_url: self.base_url.trim().to_string(),
            api_key: self.api_key.clone().filter(|k| !k.trim().is_empty()),
            default_model: self.default_model.clone().filter(|m| !m.trim().is_empty()),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }
}

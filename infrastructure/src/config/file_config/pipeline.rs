//! Pipeline tuning from TOML (`[pipeline]` section)

use consensus_application::{RetryPolicy, SamplingParams};
use consensus_application::config::pipeline_config::MAX_RETRIES;
use consensus_domain::{ConfigIssue, ConfigIssueCode, ConsensusParams};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw pipeline configuration from TOML
///
/// # Example
///
/// ```toml
/// [pipeline]
/// timeout_per_call_secs = 30
/// pipeline_timeout_secs = 120
/// closeness_threshold = 0.1
/// self_weight = 0.5
/// enable_critique = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePipelineConfig {
    pub timeout_per_call_secs: u64,
    pub pipeline_timeout_secs: u64,
    /// Maximum gap between the top two confidences that triggers a merge
    pub closeness_threshold: f64,
    /// Weight of the self-reported confidence against the critique score
    pub self_weight: f64,
    /// Confidence assumed when an expert omits its tag
    pub default_confidence: f64,
    pub enable_critique: bool,
    /// Automatic retries of transient failures (at most 1)
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for FilePipelineConfig {
    fn default() -> Self {
        let consensus = ConsensusParams::default();
        let sampling = SamplingParams::default();
        let retry = RetryPolicy::default();
        Self {
            timeout_per_call_secs: 30,
            pipeline_timeout_secs: 120,
            closeness_threshold: consensus.closeness_threshold,
            self_weight: consensus.self_weight,
            default_confidence: consensus.default_confidence,
            enable_critique: true,
            max_retries: retry.max_retries(),
            retry_delay_ms: retry.delay().as_millis() as u64,
            max_tokens: sampling.max_tokens,
            temperature: sampling.temperature,
        }
    }
}

impl FilePipelineConfig {
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        for (field, value) in [
            ("timeout_per_call_secs", self.timeout_per_call_secs),
            ("pipeline_timeout_secs", self.pipeline_timeout_secs),
        ] {
            if value == 0 {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::ZeroDuration {
                        field: format!("pipeline.{}", field),
                    },
                    format!("pipeline.{}: must be greater than zero", field),
                ));
            }
        }

        if self.timeout_per_call_secs > self.pipeline_timeout_secs {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::CallTimeoutExceedsPipeline,
                format!(
                    "pipeline.timeout_per_call_secs ({}) exceeds pipeline_timeout_secs ({}); \
                     calls will be cut off by the pipeline budget",
                    self.timeout_per_call_secs, self.pipeline_timeout_secs
                ),
            ));
        }

        for (field, value) in [
            ("self_weight", self.self_weight),
            ("default_confidence", self.default_confidence),
            ("closeness_threshold", self.closeness_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                issues.push(out_of_range(field, format!("{} is outside [0, 1]", value)));
            }
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            issues.push(out_of_range(
                "temperature",
                format!("{} is outside [0, 2]", self.temperature),
            ));
        }

        if self.max_tokens == 0 {
            issues.push(out_of_range("max_tokens", "must be greater than zero".to_string()));
        }

        if self.max_retries > MAX_RETRIES {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::OutOfRange {
                    field: "pipeline.max_retries".to_string(),
                },
                format!(
                    "pipeline.max_retries: {} requested, at most {} retry is performed",
                    self.max_retries, MAX_RETRIES
                ),
            ));
        }

        issues
    }

    pub fn consensus_params(&self) -> ConsensusParams {
        ConsensusParams::default()
            .with_self_weight(self.self_weight)
            .with_closeness_threshold(self.closeness_threshold)
            .with_default_confidence(self.default_confidence)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.retry_delay_ms))
    }

    pub fn sampling_params(&self) -> SamplingParams {
        SamplingParams {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

fn out_of_range(field: &str, detail: String) -> ConfigIssue {
    ConfigIssue::error(
        ConfigIssueCode::OutOfRange {
            field: format!("pipeline.{}", field),
        },
        format!("pipeline.{}: {}", field, detail),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(FilePipelineConfig::default().validate().is_empty());
    }

    #[test]
    fn test_zero_timeout_is_an_error() {
        let config = FilePipelineConfig {
            pipeline_timeout_secs: 0,
            ..FilePipelineConfig::default()
        };
        let issues = config.validate();
        assert!(issues.iter().any(|i| i.is_error()
            && i.code
                == ConfigIssueCode::ZeroDuration {
                    field: "pipeline.pipeline_timeout_secs".to_string()
                }));
    }

    #[test]
    fn test_call_timeout_over_budget_warns() {
        let config = FilePipelineConfig {
            timeout_per_call_secs: 200,
            ..FilePipelineConfig::default()
        };
        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, ConfigIssueCode::CallTimeoutExceedsPipeline);
        assert!(!issues[0].is_error());
    }

    #[test]
    fn test_out_of_range_weight() {
        let config = FilePipelineConfig {
            self_weight: 1.5,
            ..FilePipelineConfig::default()
        };
        let issues = config.validate();
        assert_eq!(
            issues[0].code,
            ConfigIssueCode::OutOfRange {
                field: "pipeline.self_weight".to_string()
            }
        );
    }

    #[test]
    fn test_retries_are_capped() {
        let config = FilePipelineConfig {
            max_retries: 3,
            ..FilePipelineConfig::default()
        };
        assert_eq!(config.validate().len(), 1);
        assert_eq!(config.retry_policy().max_retries(), 1);
    }
}

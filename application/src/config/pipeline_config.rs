//! Pipeline configuration.
//!
//! [`PipelineConfig`] is immutable for the duration of a run and is shared
//! read-only by every concurrent call. Defaults reproduce the built-in
//! roster with a 30 s per-call timeout and a 120 s pipeline budget.

use consensus_domain::{ConsensusParams, Persona, PersonaRoster, PromptTemplate};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound on automatic retries per call
pub const MAX_RETRIES: u32 = 1;

/// Retry policy for transient gateway errors (timeout, rate limiting).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    max_retries: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Create a policy; `max_retries` is capped at [`MAX_RETRIES`].
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries: max_retries.min(MAX_RETRIES),
            delay,
        }
    }

    /// Never retry.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(MAX_RETRIES, Duration::from_millis(500))
    }
}

/// Generation parameters forwarded with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

/// Options for one consensus run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Experts dispatched in the panel stage
    pub roster: PersonaRoster,
    /// Persona that scores each answer
    pub critic: Persona,
    /// Persona that merges near-tied answers
    pub synthesizer: Persona,
    /// Timeout applied to every individual gateway call
    pub timeout_per_call: Duration,
    /// Budget for the whole pipeline
    pub pipeline_timeout: Duration,
    /// Blend weight, closeness threshold and default confidence
    pub consensus: ConsensusParams,
    /// Run the critique stage (otherwise synthesis uses raw confidences)
    pub enable_critique: bool,
    pub retry: RetryPolicy,
    pub sampling: SamplingParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            roster: PersonaRoster::builtin(),
            critic: Persona::new("critic", PromptTemplate::critic_stance()),
            synthesizer: Persona::new("synthesizer", PromptTemplate::synthesizer_stance()),
            timeout_per_call: Duration::from_secs(30),
            pipeline_timeout: Duration::from_secs(120),
            consensus: ConsensusParams::default(),
            enable_critique: true,
            retry: RetryPolicy::default(),
            sampling: SamplingParams::default(),
        }
    }
}

impl PipelineConfig {
    // ==================== Builder Methods ====================

    pub fn with_roster(mut self, roster: PersonaRoster) -> Self {
        self.roster = roster;
        self
    }

    pub fn with_critic(mut self, critic: Persona) -> Self {
        self.critic = critic;
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: Persona) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn with_timeout_per_call(mut self, timeout: Duration) -> Self {
        self.timeout_per_call = timeout;
        self
    }

    pub fn with_pipeline_timeout(mut self, timeout: Duration) -> Self {
        self.pipeline_timeout = timeout;
        self
    }

    pub fn with_closeness_threshold(mut self, threshold: f64) -> Self {
        self.consensus = self.consensus.with_closeness_threshold(threshold);
        self
    }

    pub fn with_self_weight(mut self, weight: f64) -> Self {
        self.consensus = self.consensus.with_self_weight(weight);
        self
    }

    pub fn with_consensus(mut self, consensus: ConsensusParams) -> Self {
        self.consensus = consensus;
        self
    }

    pub fn without_critique(mut self) -> Self {
        self.enable_critique = false;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }
}

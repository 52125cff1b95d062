//! Run Consensus use case
//!
//! Orchestrates the full pipeline: expert panel, critique, synthesis.

use crate::config::PipelineConfig;
use crate::gateway::ModelGateway;
use crate::ports::llm_transport::LlmTransport;
use crate::ports::progress::{NoProgress, ProgressNotifier};
use crate::use_cases::critique::CriticStage;
use crate::use_cases::evaluate_panel::ExpertPanel;
use crate::use_cases::synthesize::{ConsensusSynthesizer, SynthesisError};
use consensus_domain::{
    ConsensusResult, FailureReason, PipelineState, PipelineTrace, Query, Stage,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Errors that end a consensus run
///
/// Every variant raised after dispatch carries the partial trace.
#[derive(Error, Debug)]
pub enum RunConsensusError {
    #[error("No personas configured")]
    NoPersonas,

    #[error("No experts available: every persona failed to respond")]
    NoExpertsAvailable { trace: Box<PipelineTrace> },

    #[error("Pipeline timed out after {budget:?} during the {stage} stage")]
    PipelineTimeout {
        budget: Duration,
        stage: Stage,
        trace: Box<PipelineTrace>,
    },
}

impl RunConsensusError {
    /// The trace gathered before the failure, if dispatch happened.
    pub fn trace(&self) -> Option<&PipelineTrace> {
        match self {
            RunConsensusError::NoPersonas => None,
            RunConsensusError::NoExpertsAvailable { trace }
            | RunConsensusError::PipelineTimeout { trace, .. } => Some(trace),
        }
    }

    /// Terminal reason recorded in the trace
    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            RunConsensusError::NoPersonas => None,
            RunConsensusError::NoExpertsAvailable { .. } => Some(FailureReason::NoExpertsAvailable),
            RunConsensusError::PipelineTimeout { .. } => Some(FailureReason::PipelineTimeout),
        }
    }
}

/// Input for the RunConsensus use case
#[derive(Debug, Clone)]
pub struct RunConsensusInput {
    /// The question to answer
    pub query: Query,
    /// Roster, stage personas, timeouts and tuning
    pub config: PipelineConfig,
}

impl RunConsensusInput {
    pub fn new(query: Query, config: PipelineConfig) -> Self {
        Self { query, config }
    }
}

/// Successful outcome of a run
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusReport {
    pub result: ConsensusResult,
    pub trace: PipelineTrace,
}

/// Use case for running the consensus pipeline
pub struct RunConsensusUseCase<T: LlmTransport + 'static> {
    transport: Arc<T>,
}

impl<T: LlmTransport + 'static> RunConsensusUseCase<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Execute the use case with default (no-op) progress
    pub async fn execute(
        &self,
        input: RunConsensusInput,
    ) -> Result<ConsensusReport, RunConsensusError> {
        self.execute_with_progress(input, &NoProgress).await
    }

    /// Execute the use case with progress callbacks
    pub async fn execute_with_progress(
        &self,
        input: RunConsensusInput,
        progress: &dyn ProgressNotifier,
    ) -> Result<ConsensusReport, RunConsensusError> {
        let RunConsensusInput { query, config } = input;
        if config.roster.is_empty() {
            return Err(RunConsensusError::NoPersonas);
        }

        info!(
            "Starting consensus with {} personas (budget {:?})",
            config.roster.len(),
            config.pipeline_timeout
        );

        let deadline = Instant::now() + config.pipeline_timeout;
        let gateway = ModelGateway::new(Arc::clone(&self.transport))
            .with_retry(config.retry)
            .with_sampling(config.sampling);

        let mut trace = PipelineTrace::new(query.content());
        advance(&mut trace, PipelineState::Dispatched);

        // Stage 1: Expert Panel
        let panel = ExpertPanel::new(gateway.clone(), config.timeout_per_call)
            .with_default_confidence(config.consensus.default_confidence);
        let outcome = panel
            .evaluate(&query, &config.roster, deadline, progress)
            .await;
        let interrupted = outcome.interrupted;
        let all_failed = outcome.all_failed();
        trace.responses = outcome.responses;

        if interrupted {
            return Err(timed_out(&config, Stage::Panel, trace));
        }
        if all_failed {
            warn!("Every persona failed to respond");
            advance(&mut trace, PipelineState::Failed(FailureReason::NoExpertsAvailable));
            return Err(RunConsensusError::NoExpertsAvailable {
                trace: Box::new(trace),
            });
        }

        // Stage 2: Critique (optional)
        if config.enable_critique {
            let critic = CriticStage::new(
                gateway.clone(),
                config.critic.clone(),
                config.timeout_per_call,
            )
            .with_self_weight(config.consensus.self_weight);
            let outcome = critic
                .critique(&query, &trace.responses, deadline, progress)
                .await;
            trace.verdicts = outcome.verdicts;

            if outcome.interrupted {
                return Err(timed_out(&config, Stage::Critique, trace));
            }
        } else {
            debug!("Skipping critique stage");
        }

        trace.degraded_critique = trace.verdicts.iter().all(|v| v.is_fallback());
        if trace.degraded_critique {
            let reason = if config.enable_critique {
                "no critique could be obtained; using self-reported confidences"
            } else {
                "critique disabled; using self-reported confidences"
            };
            info!("{}", reason);
            progress.on_degraded(reason);
        }
        advance(&mut trace, PipelineState::Critiqued);

        // Stage 3: Synthesis
        let synthesizer = ConsensusSynthesizer::new(
            gateway,
            config.synthesizer.clone(),
            config.timeout_per_call,
        )
        .with_params(config.consensus);
        let synthesized = synthesizer
            .synthesize(
                &query,
                &trace.responses,
                &trace.verdicts,
                &config.roster,
                deadline,
                progress,
            )
            .await;

        match synthesized {
            Ok(result) => {
                advance(&mut trace, PipelineState::Synthesized);
                advance(&mut trace, PipelineState::Done);
                info!(
                    "Consensus reached ({}), overall confidence {:.2}",
                    result.synthesis, result.overall_confidence
                );
                Ok(ConsensusReport { result, trace })
            }
            Err(SynthesisError::Interrupted) => Err(timed_out(&config, Stage::Synthesis, trace)),
            Err(SynthesisError::NoCandidates) => {
                advance(&mut trace, PipelineState::Failed(FailureReason::NoExpertsAvailable));
                Err(RunConsensusError::NoExpertsAvailable {
                    trace: Box::new(trace),
                })
            }
        }
    }
}

/// Record a state the orchestrator reached; every transition it makes is legal.
fn advance(trace: &mut PipelineTrace, state: PipelineState) {
    let recorded = trace.record(state);
    debug_assert!(recorded, "illegal pipeline transition to {state}");
}

fn timed_out(config: &PipelineConfig, stage: Stage, mut trace: PipelineTrace) -> RunConsensusError {
    warn!(
        "Pipeline budget of {:?} exhausted during {}",
        config.pipeline_timeout, stage
    );
    advance(&mut trace, PipelineState::Failed(FailureReason::PipelineTimeout));
    RunConsensusError::PipelineTimeout {
        budget: config.pipeline_timeout,
        stage,
        trace: Box::new(trace),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::ports::llm_transport::GatewayError;
    use crate::testing::{Reply, ScriptedTransport};
    use consensus_domain::{ExpertErrorKind, Persona, PersonaRoster, SynthesisMode};
    use std::sync::Mutex;

    /// Experts answer "answer N" with the given confidence, the critic
    /// scores each expert by name, the synthesizer merges.
    fn scripted(
        expert_confidence: [f64; 3],
        critique_score: [f64; 3],
    ) -> impl Fn(&str, &str) -> Reply + Send + Sync + 'static {
        move |system: &str, prompt: &str| match system {
            "CRITIC" => {
                let index = (1..=3)
                    .find(|i| prompt.contains(&format!("expert \"p{i}\"")))
                    .unwrap_or(1);
                Reply::ok(format!("Reasonable.\nScore: {}", critique_score[index - 1]))
            }
            "SYNTH" => Reply::ok("merged answer"),
            stance => {
                let index: usize = stance.trim_start_matches("stance-p").parse().unwrap();
                Reply::ok(format!(
                    "answer {index}\nConfidence: {}",
                    expert_confidence[index - 1]
                ))
            }
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig::default()
            .with_roster(
                PersonaRoster::new(vec![
                    Persona::new("p1", "stance-p1"),
                    Persona::new("p2", "stance-p2"),
                    Persona::new("p3", "stance-p3"),
                ])
                .unwrap(),
            )
            .with_critic(Persona::new("critic", "CRITIC"))
            .with_synthesizer(Persona::new("synthesizer", "SYNTH"))
            .with_retry(RetryPolicy::none())
    }

    fn input() -> RunConsensusInput {
        RunConsensusInput::new(Query::new("What is the capital of France?").unwrap(), config())
    }

    fn use_case(transport: ScriptedTransport) -> RunConsensusUseCase<ScriptedTransport> {
        RunConsensusUseCase::new(Arc::new(transport))
    }

    fn names(report: &ConsensusReport) -> Vec<&str> {
        report
            .result
            .contributing_experts
            .iter()
            .map(|c| c.persona_name.as_str())
            .collect()
    }

    #[tokio::test]
    async fn test_full_success() {
        let transport =
            ScriptedTransport::routed(scripted([0.9, 0.5, 0.2], [0.9, 0.9, 0.9]));

        let report = use_case(transport).execute(input()).await.unwrap();

        assert_eq!(report.result.contributing_experts.len(), 3);
        let confidences: Vec<f64> = report
            .result
            .contributing_experts
            .iter()
            .map(|c| c.adjusted_confidence)
            .collect();
        assert!(confidences.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(report.result.final_answer, "answer 1");
        assert_eq!(
            report.result.synthesis,
            SynthesisMode::Anchor {
                persona: "p1".to_string()
            }
        );
        assert_eq!(
            report.trace.states,
            vec![
                PipelineState::Dispatched,
                PipelineState::Critiqued,
                PipelineState::Synthesized,
                PipelineState::Done,
            ]
        );
        assert!(!report.trace.degraded_critique);
    }

    #[tokio::test]
    async fn test_one_failure_is_excluded_but_traced() {
        let route = scripted([0.9, 0.5, 0.2], [0.9, 0.9, 0.9]);
        let transport = ScriptedTransport::routed(move |system, prompt| {
            if system == "stance-p2" {
                Reply::err(GatewayError::TransportFailure("connection refused".to_string()))
            } else {
                route(system, prompt)
            }
        });

        let report = use_case(transport).execute(input()).await.unwrap();

        assert_eq!(names(&report), vec!["p1", "p3"]);
        let failed = report.trace.response_for("p2").unwrap();
        assert_eq!(
            failed.error.as_ref().unwrap().kind,
            ExpertErrorKind::TransportFailure
        );
        assert!(report.trace.verdict_for("p2").is_none());
        assert_eq!(report.trace.verdicts.len(), 2);
    }

    #[tokio::test]
    async fn test_all_fail() {
        let transport = Arc::new(ScriptedTransport::routed(|_, _| {
            Reply::err(GatewayError::TransportFailure("down".to_string()))
        }));

        let err = RunConsensusUseCase::new(Arc::clone(&transport))
            .execute(input())
            .await
            .unwrap_err();

        assert!(matches!(err, RunConsensusError::NoExpertsAvailable { .. }));
        let trace = err.trace().unwrap();
        assert_eq!(trace.responses.len(), 3);
        assert_eq!(
            trace.current_state(),
            Some(&PipelineState::Failed(FailureReason::NoExpertsAvailable))
        );
        assert_eq!(trace.states.len(), 2);
        // No critique or synthesis calls after the panel failed
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn test_near_tie_scenario() {
        let transport =
            ScriptedTransport::routed(scripted([0.9, 0.85, 0.3], [0.8, 0.9, 0.2]));

        let report = use_case(transport).execute(input()).await.unwrap();

        assert_eq!(names(&report), vec!["p2", "p1", "p3"]);
        let adjusted: Vec<f64> = report
            .result
            .contributing_experts
            .iter()
            .map(|c| c.adjusted_confidence)
            .collect();
        for (actual, expected) in adjusted.iter().zip([0.875, 0.85, 0.25]) {
            assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
        }
        assert_eq!(
            report.result.synthesis,
            SynthesisMode::Merged {
                personas: vec!["p2".to_string(), "p1".to_string()]
            }
        );
        assert_eq!(report.result.final_answer, "merged answer");

        let expected = (0.875f64.powi(2) + 0.85f64.powi(2) + 0.25f64.powi(2)) / 1.975;
        assert!((report.result.overall_confidence - expected).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deterministic_regardless_of_completion_order() {
        let delays = Arc::new(Mutex::new([3u64, 1, 2]));

        let mut results = Vec::new();
        for _ in 0..2 {
            let route = scripted([0.8, 0.8, 0.4], [0.7, 0.7, 0.4]);
            let shared = Arc::clone(&delays);
            let transport = ScriptedTransport::routed(move |system, prompt| {
                let delay = match system {
                    "stance-p1" => shared.lock().unwrap()[0],
                    "stance-p2" => shared.lock().unwrap()[1],
                    "stance-p3" => shared.lock().unwrap()[2],
                    _ => 0,
                };
                route(system, prompt).after(Duration::from_secs(delay))
            });
            results.push(use_case(transport).execute(input()).await.unwrap());
            delays.lock().unwrap().reverse();
        }

        assert_eq!(results[0].result, results[1].result);
        assert_eq!(names(&results[0]), vec!["p1", "p2", "p3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_persona_timeout() {
        let route = scripted([0.9, 0.5, 0.2], [0.9, 0.9, 0.9]);
        let transport = ScriptedTransport::routed(move |system, prompt| {
            let reply = route(system, prompt);
            if system == "stance-p3" {
                reply.after(Duration::from_secs(60))
            } else {
                reply
            }
        });
        let input = RunConsensusInput::new(
            Query::new("q").unwrap(),
            config().with_timeout_per_call(Duration::from_secs(2)),
        );

        let report = use_case(transport).execute(input).await.unwrap();

        let timed_out = report.trace.response_for("p3").unwrap();
        assert_eq!(timed_out.error.as_ref().unwrap().kind, ExpertErrorKind::Timeout);
        assert_eq!(names(&report), vec!["p1", "p2"]);

        let expected = (0.9f64.powi(2) + 0.7f64.powi(2)) / 1.6;
        assert!((report.result.overall_confidence - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_critique_disabled_is_degraded() {
        let transport = Arc::new(ScriptedTransport::routed(scripted(
            [0.9, 0.5, 0.2],
            [0.1, 0.1, 0.1],
        )));
        let input = RunConsensusInput::new(
            Query::new("q").unwrap(),
            config().without_critique(),
        );

        let report = RunConsensusUseCase::new(Arc::clone(&transport))
            .execute(input)
            .await
            .unwrap();

        assert!(report.trace.degraded_critique);
        assert!(report.trace.verdicts.is_empty());
        assert_eq!(report.result.contributing_experts[0].adjusted_confidence, 0.9);
        assert!(transport.calls().iter().all(|c| c.system_context.as_deref() != Some("CRITIC")));
    }

    #[tokio::test]
    async fn test_failed_critiques_fall_back_to_self_confidence() {
        let route = scripted([0.9, 0.5, 0.2], [0.1, 0.1, 0.1]);
        let transport = ScriptedTransport::routed(move |system, prompt| {
            if system == "CRITIC" {
                Reply::err(GatewayError::RateLimited)
            } else {
                route(system, prompt)
            }
        });

        let report = use_case(transport).execute(input()).await.unwrap();

        assert!(report.trace.degraded_critique);
        assert_eq!(report.trace.verdicts.len(), 3);
        assert_eq!(report.result.contributing_experts[0].adjusted_confidence, 0.9);
        assert_eq!(report.trace.current_state(), Some(&PipelineState::Done));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pipeline_timeout_in_panel() {
        let transport =
            ScriptedTransport::routed(|_, _| Reply::ok("slow").after(Duration::from_secs(200)));
        let input = RunConsensusInput::new(
            Query::new("q").unwrap(),
            config().with_pipeline_timeout(Duration::from_secs(10)),
        );

        let err = use_case(transport).execute(input).await.unwrap_err();

        match &err {
            RunConsensusError::PipelineTimeout { budget, stage, trace } => {
                assert_eq!(*budget, Duration::from_secs(10));
                assert_eq!(*stage, Stage::Panel);
                assert_eq!(trace.responses.len(), 3);
                assert!(trace.responses.iter().all(|r| !r.is_success()));
                assert_eq!(
                    trace.states,
                    vec![
                        PipelineState::Dispatched,
                        PipelineState::Failed(FailureReason::PipelineTimeout)
                    ]
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.failure_reason(), Some(FailureReason::PipelineTimeout));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pipeline_timeout_in_critique_keeps_panel_trace() {
        let route = scripted([0.9, 0.5, 0.2], [0.9, 0.9, 0.9]);
        let transport = ScriptedTransport::routed(move |system, prompt| {
            let reply = route(system, prompt);
            if system == "CRITIC" {
                reply.after(Duration::from_secs(200))
            } else {
                reply
            }
        });
        let input = RunConsensusInput::new(
            Query::new("q").unwrap(),
            config().with_pipeline_timeout(Duration::from_secs(10)),
        );

        let err = use_case(transport).execute(input).await.unwrap_err();

        assert!(matches!(
            err,
            RunConsensusError::PipelineTimeout {
                stage: Stage::Critique,
                ..
            }
        ));
        let trace = err.trace().unwrap();
        assert_eq!(trace.successful_responses().count(), 3);
        assert_eq!(
            trace.states,
            vec![
                PipelineState::Dispatched,
                PipelineState::Failed(FailureReason::PipelineTimeout),
            ]
        );
    }

    #[tokio::test]
    async fn test_persona_model_is_forwarded() {
        let transport = Arc::new(ScriptedTransport::routed(scripted(
            [0.9, 0.5, 0.2],
            [0.9, 0.9, 0.9],
        )));
        let roster = PersonaRoster::new(vec![
            Persona::new("p1", "stance-p1").with_model("llama3"),
            Persona::new("p2", "stance-p2"),
            Persona::new("p3", "stance-p3"),
        ])
        .unwrap();
        let input = RunConsensusInput::new(Query::new("q").unwrap(), config().with_roster(roster));

        RunConsensusUseCase::new(Arc::clone(&transport))
            .execute(input)
            .await
            .unwrap();

        let calls = transport.calls();
        let p1 = calls
            .iter()
            .find(|c| c.system_context.as_deref() == Some("stance-p1"))
            .unwrap();
        assert_eq!(p1.model.as_deref(), Some("llama3"));
    }
}

//! Critique stage
//!
//! Scores every surviving answer with the critic persona and blends the
//! score into an adjusted confidence. A failed critique never fails the
//! run: the response keeps its self-reported confidence instead.

use crate::gateway::ModelGateway;
use crate::ports::llm_transport::LlmTransport;
use crate::ports::progress::ProgressNotifier;
use consensus_domain::{
    CritiqueVerdict, ExpertResponse, Persona, PromptTemplate, Query, Stage, parse_critique_score,
};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Verdicts gathered by the critic
#[derive(Debug, Clone, PartialEq)]
pub struct CritiqueOutcome {
    /// One verdict per successful response, in response order
    pub verdicts: Vec<CritiqueVerdict>,
    /// True when the pipeline deadline cut the stage short
    pub interrupted: bool,
}

pub struct CriticStage<T: LlmTransport + 'static> {
    gateway: ModelGateway<T>,
    critic: Persona,
    timeout_per_call: Duration,
    self_weight: f64,
}

impl<T: LlmTransport + 'static> CriticStage<T> {
    pub fn new(gateway: ModelGateway<T>, critic: Persona, timeout_per_call: Duration) -> Self {
        Self {
            gateway,
            critic,
            timeout_per_call,
            self_weight: 0.5,
        }
    }

    pub fn with_self_weight(mut self, weight: f64) -> Self {
        self.self_weight = weight;
        self
    }

    /// Critique every successful response concurrently.
    pub async fn critique(
        &self,
        query: &Query,
        responses: &[ExpertResponse],
        deadline: Instant,
        progress: &dyn ProgressNotifier,
    ) -> CritiqueOutcome {
        let survivors: Vec<&ExpertResponse> = responses.iter().filter(|r| r.is_success()).collect();
        if survivors.is_empty() {
            debug!("No successful responses to critique");
            return CritiqueOutcome {
                verdicts: Vec::new(),
                interrupted: false,
            };
        }

        info!("Stage 2: Critique ({} answers)", survivors.len());
        progress.on_stage_start(Stage::Critique, survivors.len());

        let mut join_set = JoinSet::new();
        for (index, response) in survivors.iter().enumerate() {
            let gateway = self.gateway.clone();
            let critic = self.critic.clone();
            let prompt = PromptTemplate::critique_prompt(
                query.content(),
                &response.persona_name,
                &response.answer_text,
            );
            let timeout = self.timeout_per_call;

            join_set.spawn(async move {
                let result = gateway.generate(&prompt, Some(&critic), timeout).await;
                (index, result)
            });
        }

        let mut slots: Vec<Option<CritiqueVerdict>> = vec![None; survivors.len()];
        let mut interrupted = false;

        loop {
            match tokio::time::timeout_at(deadline, join_set.join_next()).await {
                Ok(Some(Ok((index, result)))) => {
                    let response = survivors[index];
                    let verdict = match result {
                        Ok(text) => match parse_critique_score(&text) {
                            Some(score) => CritiqueVerdict::scored(
                                response,
                                score,
                                text.trim(),
                                self.self_weight,
                            ),
                            None => {
                                warn!(persona = %response.persona_name, "Critique had no parsable score");
                                CritiqueVerdict::fallback(response, "critique score could not be parsed")
                            }
                        },
                        Err(e) => {
                            warn!(persona = %response.persona_name, "Critique failed: {}", e);
                            CritiqueVerdict::fallback(response, format!("critique failed: {}", e))
                        }
                    };
                    debug!(
                        persona = %verdict.persona_name,
                        adjusted = verdict.adjusted_confidence,
                        "Critique complete"
                    );
                    progress.on_task_complete(
                        Stage::Critique,
                        &verdict.persona_name,
                        !verdict.is_fallback(),
                    );
                    slots[index] = Some(verdict);
                }
                Ok(Some(Err(e))) => {
                    warn!("Task join error: {}", e);
                }
                Ok(None) => break,
                Err(_) => {
                    warn!("Pipeline deadline reached during the critique stage");
                    join_set.abort_all();
                    interrupted = true;
                    break;
                }
            }
        }

        // A critique lost to a panicked task falls back like any other
        // failed critique; one cut off by the deadline is left out.
        let verdicts = survivors
            .iter()
            .zip(slots)
            .filter_map(|(response, slot)| {
                slot.or_else(|| {
                    (!interrupted)
                        .then(|| CritiqueVerdict::fallback(response, "critique task aborted"))
                })
            })
            .collect();

        progress.on_stage_complete(Stage::Critique);
        CritiqueOutcome {
            verdicts,
            interrupted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::ports::llm_transport::GatewayError;
    use crate::ports::progress::NoProgress;
    use crate::testing::{Reply, ScriptedTransport};
    use std::sync::Arc;

    fn stage(transport: ScriptedTransport) -> CriticStage<ScriptedTransport> {
        let gateway = ModelGateway::new(Arc::new(transport)).with_retry(RetryPolicy::none());
        CriticStage::new(gateway, Persona::new("critic", "CRITIC"), Duration::from_secs(5))
    }

    fn responses() -> Vec<ExpertResponse> {
        vec![
            ExpertResponse::success("p1", "answer one", 0.9, Duration::from_millis(10)),
            ExpertResponse::failure(
                "p2",
                consensus_domain::ExpertError::new(
                    consensus_domain::ExpertErrorKind::Timeout,
                    "timed out",
                ),
                Duration::from_millis(10),
            ),
            ExpertResponse::success("p3", "answer three", 0.3, Duration::from_millis(10)),
        ]
    }

    fn query() -> Query {
        Query::new("q").unwrap()
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(120)
    }

    #[tokio::test]
    async fn test_only_survivors_are_critiqued() {
        let transport = ScriptedTransport::routed(|_, prompt| {
            if prompt.contains("expert \"p1\"") {
                Reply::ok("Accurate.\nScore: 0.8")
            } else {
                Reply::ok("Weak.\nScore: 0.2")
            }
        });

        let outcome = stage(transport)
            .critique(&query(), &responses(), far_deadline(), &NoProgress)
            .await;

        assert!(!outcome.interrupted);
        let names: Vec<_> = outcome.verdicts.iter().map(|v| v.persona_name.as_str()).collect();
        assert_eq!(names, vec!["p1", "p3"]);
        assert!((outcome.verdicts[0].adjusted_confidence - 0.85).abs() < 1e-9);
        assert!((outcome.verdicts[1].adjusted_confidence - 0.25).abs() < 1e-9);
        assert_eq!(outcome.verdicts[0].critique_score, Some(0.8));
    }

    #[tokio::test]
    async fn test_critic_uses_its_own_stance() {
        let transport = Arc::new(ScriptedTransport::routed(|_, _| Reply::ok("Score: 0.5")));
        let gateway = ModelGateway::new(Arc::clone(&transport)).with_retry(RetryPolicy::none());
        let stage = CriticStage::new(gateway, Persona::new("critic", "CRITIC"), Duration::from_secs(5));

        stage
            .critique(&query(), &responses(), far_deadline(), &NoProgress)
            .await;

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c.system_context.as_deref() == Some("CRITIC")));
    }

    #[tokio::test]
    async fn test_failed_critique_keeps_self_confidence() {
        let transport = ScriptedTransport::routed(|_, prompt| {
            if prompt.contains("expert \"p1\"") {
                Reply::err(GatewayError::TransportFailure("down".to_string()))
            } else {
                Reply::ok("No score given, sorry.")
            }
        });

        let outcome = stage(transport)
            .critique(&query(), &responses(), far_deadline(), &NoProgress)
            .await;

        assert_eq!(outcome.verdicts.len(), 2);
        assert!(outcome.verdicts.iter().all(|v| v.is_fallback()));
        assert_eq!(outcome.verdicts[0].adjusted_confidence, 0.9);
        assert_eq!(outcome.verdicts[1].adjusted_confidence, 0.3);
    }

    #[tokio::test]
    async fn test_blend_is_clamped() {
        let transport = ScriptedTransport::routed(|_, _| Reply::ok("Perfect.\nScore: 1.0"));
        let responses = vec![ExpertResponse::success(
            "p1",
            "answer",
            1.0,
            Duration::from_millis(1),
        )];

        let outcome = stage(transport)
            .critique(&query(), &responses, far_deadline(), &NoProgress)
            .await;

        assert_eq!(outcome.verdicts[0].adjusted_confidence, 1.0);
    }

    #[tokio::test]
    async fn test_no_survivors_means_no_calls() {
        let transport = Arc::new(ScriptedTransport::routed(|_, _| Reply::ok("Score: 0.5")));
        let gateway = ModelGateway::new(Arc::clone(&transport));
        let stage = CriticStage::new(gateway, Persona::new("critic", "CRITIC"), Duration::from_secs(5));

        let outcome = stage
            .critique(&query(), &responses()[1..2], far_deadline(), &NoProgress)
            .await;

        assert!(outcome.verdicts.is_empty());
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_interrupts_stage() {
        let transport = ScriptedTransport::routed(|_, _| {
            Reply::ok("Score: 0.5").after(Duration::from_secs(4))
        });
        let deadline = Instant::now() + Duration::from_secs(1);

        let outcome = stage(transport)
            .critique(&query(), &responses(), deadline, &NoProgress)
            .await;

        assert!(outcome.interrupted);
        assert!(outcome.verdicts.is_empty());
    }
}

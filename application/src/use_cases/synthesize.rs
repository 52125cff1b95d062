//! Synthesis stage
//!
//! Ranks the surviving answers and produces the final answer: the top
//! answer on its own when it clearly leads, or a merge of the near-tied
//! leaders otherwise.

use crate::gateway::ModelGateway;
use crate::ports::llm_transport::LlmTransport;
use crate::ports::progress::ProgressNotifier;
use consensus_domain::{
    ConsensusParams, ConsensusResult, ContributingExpert, CritiqueVerdict, ExpertResponse,
    MergeCandidate, Persona, PersonaRoster, PromptTemplate, Query, RankedCandidate, Stage,
    SynthesisMode, extract_confidence, near_tie_band, overall_confidence, rank_candidates,
};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("No successful responses to synthesize")]
    NoCandidates,

    #[error("Pipeline deadline reached before synthesis completed")]
    Interrupted,
}

pub struct ConsensusSynthesizer<T: LlmTransport + 'static> {
    gateway: ModelGateway<T>,
    synthesizer: Persona,
    timeout_per_call: Duration,
    params: ConsensusParams,
}

impl<T: LlmTransport + 'static> ConsensusSynthesizer<T> {
    pub fn new(gateway: ModelGateway<T>, synthesizer: Persona, timeout_per_call: Duration) -> Self {
        Self {
            gateway,
            synthesizer,
            timeout_per_call,
            params: ConsensusParams::default(),
        }
    }

    pub fn with_params(mut self, params: ConsensusParams) -> Self {
        self.params = params;
        self
    }

    /// Rank the survivors and build the final answer.
    ///
    /// A survivor without a verdict is ranked by its self-reported
    /// confidence. A failed merge falls back to the top answer.
    pub async fn synthesize(
        &self,
        query: &Query,
        responses: &[ExpertResponse],
        verdicts: &[CritiqueVerdict],
        roster: &PersonaRoster,
        deadline: Instant,
        progress: &dyn ProgressNotifier,
    ) -> Result<ConsensusResult, SynthesisError> {
        let ranked = rank_candidates(
            responses
                .iter()
                .filter(|r| r.is_success())
                .map(|r| RankedCandidate {
                    persona_name: r.persona_name.clone(),
                    answer_text: r.answer_text.clone(),
                    adjusted_confidence: verdicts
                        .iter()
                        .find(|v| v.persona_name == r.persona_name)
                        .map(|v| v.adjusted_confidence)
                        .unwrap_or(r.self_reported_confidence),
                    roster_position: roster.position(&r.persona_name).unwrap_or(usize::MAX),
                })
                .collect(),
        );

        let Some(anchor) = ranked.first() else {
            return Err(SynthesisError::NoCandidates);
        };

        info!("Stage 3: Synthesis ({} candidates)", ranked.len());

        let contributing_experts: Vec<ContributingExpert> = ranked
            .iter()
            .map(|c| ContributingExpert {
                persona_name: c.persona_name.clone(),
                adjusted_confidence: c.adjusted_confidence,
            })
            .collect();
        let confidences: Vec<f64> = ranked.iter().map(|c| c.adjusted_confidence).collect();
        let overall = overall_confidence(&confidences);

        let band = near_tie_band(&ranked, self.params.closeness_threshold);
        if band.len() < 2 {
            debug!(persona = %anchor.persona_name, "Top answer stands alone");
            return Ok(ConsensusResult {
                final_answer: anchor.answer_text.clone(),
                contributing_experts,
                overall_confidence: overall,
                synthesis: SynthesisMode::Anchor {
                    persona: anchor.persona_name.clone(),
                },
            });
        }

        let personas: Vec<String> = band.iter().map(|c| c.persona_name.clone()).collect();
        info!("Merging near-tied answers from {}", personas.join(", "));
        progress.on_stage_start(Stage::Synthesis, 1);

        let candidates: Vec<MergeCandidate<'_>> = band
            .iter()
            .map(|c| MergeCandidate {
                persona_name: &c.persona_name,
                answer_text: &c.answer_text,
                adjusted_confidence: c.adjusted_confidence,
            })
            .collect();
        let prompt = PromptTemplate::merge_prompt(query.content(), &candidates);

        let merged = tokio::time::timeout_at(
            deadline,
            self.gateway
                .generate(&prompt, Some(&self.synthesizer), self.timeout_per_call),
        )
        .await;

        let (final_answer, synthesis) = match merged {
            Err(_) => {
                warn!("Pipeline deadline reached during synthesis");
                progress.on_task_complete(Stage::Synthesis, &self.synthesizer.name, false);
                progress.on_stage_complete(Stage::Synthesis);
                return Err(SynthesisError::Interrupted);
            }
            Ok(Ok(text)) => {
                // Synthesizers sometimes echo a confidence line; it is not
                // part of the answer.
                let (answer, _) = extract_confidence(&text, 0.0);
                if answer.is_empty() {
                    self.fallback(anchor, "merge produced an empty answer")
                } else {
                    (answer, SynthesisMode::Merged { personas })
                }
            }
            Ok(Err(e)) => self.fallback(anchor, &e.to_string()),
        };

        progress.on_task_complete(
            Stage::Synthesis,
            &self.synthesizer.name,
            matches!(synthesis, SynthesisMode::Merged { .. }),
        );
        progress.on_stage_complete(Stage::Synthesis);

        Ok(ConsensusResult {
            final_answer,
            contributing_experts,
            overall_confidence: overall,
            synthesis,
        })
    }

    fn fallback(&self, anchor: &RankedCandidate, reason: &str) -> (String, SynthesisMode) {
        warn!(persona = %anchor.persona_name, "Merge failed ({}), using top answer", reason);
        (
            anchor.answer_text.clone(),
            SynthesisMode::Fallback {
                persona: anchor.persona_name.clone(),
                reason: reason.to_string(),
            },
        )
    }
}

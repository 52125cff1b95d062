//! Prompt templates for the consensus pipeline

/// A near-tied answer handed to the synthesizer for merging
#[derive(Debug, Clone, PartialEq)]
pub struct MergeCandidate<'a> {
    pub persona_name: &'a str,
    pub answer_text: &'a str,
    pub adjusted_confidence: f64,
}

/// Templates for generating prompts at each stage
pub struct PromptTemplate;

impl PromptTemplate {
    // ==================== Built-in Stances ====================

    /// Stance of the built-in "analyst" persona
    pub fn analyst_stance() -> &'static str {
        r#"You are a rigorous analyst. Reason step by step from first principles,
state your assumptions explicitly, and prefer precise, verifiable claims over
broad generalizations."#
    }

    /// Stance of the built-in "skeptic" persona
    pub fn skeptic_stance() -> &'static str {
        r#"You are a careful skeptic. Look for edge cases, hidden assumptions and
common misconceptions before committing to an answer. Say plainly when the
evidence is weak."#
    }

    /// Stance of the built-in "pragmatist" persona
    pub fn pragmatist_stance() -> &'static str {
        r#"You are a pragmatic practitioner. Favor answers that work in practice,
give concrete recommendations, and keep the explanation short."#
    }

    /// Stance of the built-in critic
    pub fn critic_stance() -> &'static str {
        r#"You are a critical reviewer evaluating an expert's answer.
Judge factual soundness, completeness and internal consistency.
Be fair but strict: an answer with a factual error must not score highly."#
    }

    /// Stance of the built-in synthesizer
    pub fn synthesizer_stance() -> &'static str {
        r#"You are a moderator reconciling several strong expert answers into one.
Keep every point the answers agree on, resolve disagreements in favor of the
better supported position, and drop anything that is unsupported."#
    }

    // ==================== Stage Prompts ====================

    /// User prompt for an expert in the panel stage
    pub fn expert_query(query: &str) -> String {
        format!(
            r#"Please answer the following question accurately and concisely.

Question: {}

End your answer with a final line of the form:
Confidence: <a number between 0.0 and 1.0>"#,
            query
        )
    }

    /// User prompt asking the critic to score one answer
    pub fn critique_prompt(query: &str, persona_name: &str, answer: &str) -> String {
        format!(
            r#"Question: {}

Answer from expert "{}":
{}

Evaluate this answer for:
1. Factual soundness
2. Completeness
3. Internal consistency

Point out inaccuracies, omissions or possible improvements in a few sentences.
End with a final line of the form:
Score: <a number between 0.0 and 1.0>"#,
            query, persona_name, answer
        )
    }

    /// User prompt asking the synthesizer to merge near-tied answers
    pub fn merge_prompt(query: &str, candidates: &[MergeCandidate<'_>]) -> String {
        let mut prompt = format!(
            r#"Question: {}

The following expert answers are ranked by confidence and are close enough
that none should be picked outright:
"#,
            query
        );

        for (rank, candidate) in candidates.iter().enumerate() {
            prompt.push_str(&format!(
                "\n--- #{} {} (confidence {:.2}) ---\n{}\n",
                rank + 1,
                candidate.persona_name,
                candidate.adjusted_confidence,
                candidate.answer_text
            ));
        }

        prompt.push_str(
            r#"
Merge these answers into a single, accurate and comprehensive answer.
Reply with the merged answer only."#,
        );

        prompt
    }
}

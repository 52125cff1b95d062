//! Deterministic ranking of surviving experts

use serde::{Deserialize, Serialize};

/// Tolerance for float noise when comparing a gap against the threshold
const CLOSENESS_EPSILON: f64 = 1e-9;

/// A surviving answer with its final confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub persona_name: String,
    pub answer_text: String,
    pub adjusted_confidence: f64,
    /// Position in the persona roster, used to break ties
    pub roster_position: usize,
}

/// Sort candidates by adjusted confidence (descending), breaking ties by
/// roster position (ascending).
///
/// The order depends only on the inputs, never on completion order.
pub fn rank_candidates(mut candidates: Vec<RankedCandidate>) -> Vec<RankedCandidate> {
    candidates.sort_by(|a, b| {
        b.adjusted_confidence
            .total_cmp(&a.adjusted_confidence)
            .then(a.roster_position.cmp(&b.roster_position))
    });
    candidates
}

/// The leading slice of `ranked` whose confidences lie within `threshold` of
/// the top candidate.
///
/// A slice of length one means the top answer stands alone; two or more
/// means the leaders are near-tied and should be merged.
pub fn near_tie_band(ranked: &[RankedCandidate], threshold: f64) -> &[RankedCandidate] {
    let Some(top) = ranked.first() else {
        return ranked;
    };
    let band = ranked
        .iter()
        .take_while(|c| top.adjusted_confidence - c.adjusted_confidence <= threshold + CLOSENESS_EPSILON)
        .count();
    &ranked[..band]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, confidence: f64, position: usize) -> RankedCandidate {
        RankedCandidate {
            persona_name: name.to_string(),
            answer_text: format!("answer from {name}"),
            adjusted_confidence: confidence,
            roster_position: position,
        }
    }

    fn names(ranked: &[RankedCandidate]) -> Vec<&str> {
        ranked.iter().map(|c| c.persona_name.as_str()).collect()
    }

    #[test]
    fn test_rank_by_confidence_descending() {
        let ranked = rank_candidates(vec![
            candidate("persona1", 0.85, 0),
            candidate("persona2", 0.875, 1),
            candidate("persona3", 0.25, 2),
        ]);
        assert_eq!(names(&ranked), vec!["persona2", "persona1", "persona3"]);
    }

    #[test]
    fn test_ties_broken_by_roster_order() {
        let ranked = rank_candidates(vec![
            candidate("c", 0.5, 2),
            candidate("a", 0.5, 0),
            candidate("b", 0.5, 1),
        ]);
        assert_eq!(names(&ranked), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_rank_is_independent_of_input_order() {
        let a = rank_candidates(vec![candidate("x", 0.4, 0), candidate("y", 0.9, 1)]);
        let b = rank_candidates(vec![candidate("y", 0.9, 1), candidate("x", 0.4, 0)]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_near_tie_band() {
        let ranked = rank_candidates(vec![
            candidate("p1", 0.85, 0),
            candidate("p2", 0.875, 1),
            candidate("p3", 0.25, 2),
        ]);
        assert_eq!(names(near_tie_band(&ranked, 0.1)), vec!["p2", "p1"]);
    }

    #[test]
    fn test_near_tie_band_inclusive_at_threshold() {
        let ranked = rank_candidates(vec![candidate("a", 0.9, 0), candidate("b", 0.8, 1)]);
        assert_eq!(near_tie_band(&ranked, 0.1).len(), 2);
    }

    #[test]
    fn test_clear_winner_stands_alone() {
        let ranked = rank_candidates(vec![candidate("a", 0.9, 0), candidate("b", 0.5, 1)]);
        assert_eq!(names(near_tie_band(&ranked, 0.1)), vec!["a"]);
    }

    #[test]
    fn test_near_tie_band_empty() {
        assert!(near_tie_band(&[], 0.1).is_empty());
    }
}

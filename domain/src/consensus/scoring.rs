//! Confidence blending and aggregation

use serde::{Deserialize, Serialize};

/// Tunable parameters of the consensus algorithm
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusParams {
    /// Weight of the self-reported confidence in the blend; the critique
    /// score receives `1 - self_weight`.
    pub self_weight: f64,
    /// Maximum gap between the top two adjusted confidences that still
    /// triggers a merge call.
    pub closeness_threshold: f64,
    /// Confidence assumed when a response carries no parsable tag.
    pub default_confidence: f64,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            self_weight: 0.5,
            closeness_threshold: 0.1,
            default_confidence: 0.5,
        }
    }
}

impl ConsensusParams {
    pub fn with_self_weight(mut self, weight: f64) -> Self {
        self.self_weight = clamp_unit(weight);
        self
    }

    pub fn with_closeness_threshold(mut self, threshold: f64) -> Self {
        self.closeness_threshold = threshold.max(0.0);
        self
    }

    pub fn with_default_confidence(mut self, confidence: f64) -> Self {
        self.default_confidence = clamp_unit(confidence);
        self
    }
}

/// Clamp a value to [0, 1]; NaN maps to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Blend a self-reported confidence with a critique score.
///
/// `adjusted = self_weight * self_reported + (1 - self_weight) * critique_score`,
/// clamped to [0, 1].
pub fn blend_confidence(self_reported: f64, critique_score: f64, self_weight: f64) -> f64 {
    let w = clamp_unit(self_weight);
    clamp_unit(w * clamp_unit(self_reported) + (1.0 - w) * clamp_unit(critique_score))
}

/// Self-weighted mean of the given confidences.
///
/// Each confidence is weighted by its own normalized value, so the result is
/// `Σc² / Σc`. Returns 0 for an empty slice or when every confidence is 0.
pub fn overall_confidence(confidences: &[f64]) -> f64 {
    let total: f64 = confidences.iter().copied().map(clamp_unit).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let weighted: f64 = confidences
        .iter()
        .copied()
        .map(clamp_unit)
        .map(|c| c * (c / total))
        .sum();
    clamp_unit(weighted)
}

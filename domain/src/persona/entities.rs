//! Persona entity

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Static descriptor of an expert persona
///
/// Personas are defined at startup and never mutated. `model` optionally pins
/// the persona to a specific backend model; when absent the backend default
/// is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    /// Unique name within a roster
    pub name: String,
    /// System-prompt text describing the reasoning stance
    pub stance: String,
    /// Prior weight in [0, 1]
    pub weight_prior: f64,
    /// Backend model identifier for this persona
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Persona {
    /// Create a persona with a neutral prior of 1.0.
    pub fn new(name: impl Into<String>, stance: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stance: stance.into(),
            weight_prior: 1.0,
            model: None,
        }
    }

    /// Set the prior weight (clamped to [0, 1]).
    pub fn with_weight_prior(mut self, weight: f64) -> Self {
        self.weight_prior = if weight.is_nan() {
            0.0
        } else {
            weight.clamp(0.0, 1.0)
        };
        self
    }

    /// Pin this persona to a backend model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Check that the descriptor is usable.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidPersona(
                "persona name cannot be empty".to_string(),
            ));
        }
        if self.stance.trim().is_empty() {
            return Err(DomainError::InvalidPersona(format!(
                "persona '{}' has an empty stance",
                self.name
            )));
        }
        if !(0.0..=1.0).contains(&self.weight_prior) {
            return Err(DomainError::InvalidPersona(format!(
                "persona '{}' has weight_prior {} outside [0, 1]",
                self.name, self.weight_prior
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.model {
            Some(model) => write!(f, "{} ({})", self.name, model),
            None => write!(f, "{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_persona_defaults() {
        let p = Persona::new("analyst", "You are careful.");
        assert_eq!(p.weight_prior, 1.0);
        assert!(p.model.is_none());
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_weight_prior_clamped() {
        assert_eq!(Persona::new("a", "s").with_weight_prior(1.7).weight_prior, 1.0);
        assert_eq!(Persona::new("a", "s").with_weight_prior(-0.2).weight_prior, 0.0);
        assert_eq!(Persona::new("a", "s").with_weight_prior(f64::NAN).weight_prior, 0.0);
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        assert!(Persona::new(" ", "stance").validate().is_err());
        assert!(Persona::new("name", "").validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_prior() {
        let mut p = Persona::new("name", "stance");
        p.weight_prior = 1.5;
        assert!(matches!(p.validate(), Err(DomainError::InvalidPersona(_))));
    }

    #[test]
    fn test_display_includes_model() {
        let p = Persona::new("skeptic", "s").with_model("hermes3:latest");
        assert_eq!(p.to_string(), "skeptic (hermes3:latest)");
    }
}

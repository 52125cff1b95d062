//! Persona definitions from TOML (`[[personas]]`, `[critic]`, `[synthesizer]`)

use consensus_domain::{ConfigIssue, ConfigIssueCode, DomainError, Persona, PersonaRoster, PromptTemplate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One expert persona
///
/// # Example
///
/// ```toml
/// [[personas]]
/// name = "analyst"          # built-in stance
/// model = "llama3.1:8b"
///
/// [[personas]]
/// name = "historian"
/// stance = "You are a historian. Ground every answer in historical context."
/// weight_prior = 0.8
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilePersonaConfig {
    pub name: String,
    /// System prompt; optional for the built-in persona names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stance: Option<String>,
    #[serde(default = "default_weight_prior")]
    pub weight_prior: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

fn default_weight_prior() -> f64 {
    1.0
}

impl FilePersonaConfig {
    fn resolved_stance(&self) -> Option<String> {
        self.stance
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| builtin_stance(&self.name).map(str::to_string))
    }

    pub fn to_persona(&self) -> Result<Persona, DomainError> {
        let stance = self.resolved_stance().ok_or_else(|| {
            DomainError::InvalidPersona(format!(
                "persona '{}' needs a stance (only built-in personas may omit it)",
                self.name
            ))
        })?;
        let mut persona = Persona::new(self.name.trim(), stance);
        persona.weight_prior = self.weight_prior;
        if let Some(model) = self.model.as_ref().filter(|m| !m.trim().is_empty()) {
            persona = persona.with_model(model.trim());
        }
        persona.validate()?;
        Ok(persona)
    }
}

/// Critic or synthesizer persona; every field falls back to the built-in
///
/// ```toml
/// [critic]
/// model = "gemma2:9b"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStagePersonaConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl FileStagePersonaConfig {
    pub fn to_persona(&self, default_name: &str, default_stance: &str) -> Persona {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(default_name);
        let stance = self
            .stance
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(default_stance);
        let persona = Persona::new(name, stance);
        match self.model.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            Some(model) => persona.with_model(model),
            None => persona,
        }
    }
}

fn builtin_stance(name: &str) -> Option<&'static str> {
    match name.trim() {
        "analyst" => Some(PromptTemplate::analyst_stance()),
        "skeptic" => Some(PromptTemplate::skeptic_stance()),
        "pragmatist" => Some(PromptTemplate::pragmatist_stance()),
        _ => None,
    }
}

/// Validate a persona list, collecting every problem.
pub fn validate_personas(personas: &[FilePersonaConfig]) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();
    let mut seen = HashSet::new();

    for persona in personas {
        let name = persona.name.trim();
        if let Err(e) = persona.to_persona() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::InvalidPersona {
                    name: name.to_string(),
                },
                format!("personas: {}", e),
            ));
        }
        if !name.is_empty() && !seen.insert(name) {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::DuplicatePersona {
                    name: name.to_string(),
                },
                format!("personas: '{}' is defined more than once", name),
            ));
        }
    }

    issues
}

/// Build the roster; an empty list selects the built-in personas.
pub fn build_roster(personas: &[FilePersonaConfig]) -> Result<PersonaRoster, DomainError> {
    if personas.is_empty() {
        return Ok(PersonaRoster::builtin());
    }
    let personas = personas
        .iter()
        .map(FilePersonaConfig::to_persona)
        .collect::<Result<Vec<_>, _>>()?;
    PersonaRoster::new(personas)
}

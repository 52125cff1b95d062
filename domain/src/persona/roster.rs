//! Persona roster

use super::entities::Persona;
use crate::core::error::DomainError;
use crate::prompt::PromptTemplate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ordered, name-unique list of personas
///
/// The roster is process-wide configuration: built once, shared read-only by
/// every concurrent expert call. Position in the roster breaks confidence ties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Persona>", into = "Vec<Persona>")]
pub struct PersonaRoster {
    personas: Vec<Persona>,
}

impl PersonaRoster {
    /// Build a roster, validating every persona and name uniqueness.
    pub fn new(personas: Vec<Persona>) -> Result<Self, DomainError> {
        if personas.is_empty() {
            return Err(DomainError::EmptyRoster);
        }

        let mut seen = HashSet::new();
        for persona in &personas {
            persona.validate()?;
            if !seen.insert(persona.name.as_str()) {
                return Err(DomainError::DuplicatePersona(persona.name.clone()));
            }
        }

        Ok(Self { personas })
    }

    /// The built-in three-expert roster
    pub fn builtin() -> Self {
        Self {
            personas: vec![
                Persona::new("analyst", PromptTemplate::analyst_stance()),
                Persona::new("skeptic", PromptTemplate::skeptic_stance()),
                Persona::new("pragmatist", PromptTemplate::pragmatist_stance()),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Persona> {
        self.personas.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.name == name)
    }

    /// Roster position of a persona, used for stable tie-breaking.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.personas.iter().position(|p| p.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.personas.iter().map(|p| p.name.as_str()).collect()
    }
}

impl Default for PersonaRoster {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TryFrom<Vec<Persona>> for PersonaRoster {
    type Error = DomainError;

    fn try_from(personas: Vec<Persona>) -> Result<Self, Self::Error> {
        Self::new(personas)
    }
}

impl From<PersonaRoster> for Vec<Persona> {
    fn from(roster: PersonaRoster) -> Self {
        roster.personas
    }
}

impl<'a> IntoIterator for &'a PersonaRoster {
    type Item = &'a Persona;
    type IntoIter = std::slice::Iter<'a, Persona>;

    fn into_iter(self) -> Self::IntoIter {
        self.personas.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_roster() {
        let roster = PersonaRoster::builtin();
        assert_eq!(roster.len(), 3);
        assert_eq!(roster.names(), vec!["analyst", "skeptic", "pragmatist"]);
        assert!(roster.iter().all(|p| p.validate().is_ok()));
    }

    #[test]
    fn test_empty_roster_rejected() {
        assert_eq!(PersonaRoster::new(vec![]), Err(DomainError::EmptyRoster));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = PersonaRoster::new(vec![
            Persona::new("a", "one"),
            Persona::new("a", "two"),
        ]);
        assert_eq!(result, Err(DomainError::DuplicatePersona("a".to_string())));
    }

    #[test]
    fn test_position_follows_insertion_order() {
        let roster = PersonaRoster::new(vec![
            Persona::new("first", "s"),
            Persona::new("second", "s"),
        ])
        .unwrap();
        assert_eq!(roster.position("first"), Some(0));
        assert_eq!(roster.position("second"), Some(1));
        assert_eq!(roster.position("missing"), None);
        assert_eq!(roster.get("second").map(|p| p.name.as_str()), Some("second"));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: PersonaRoster = serde_json::from_str(
            r#"[{"name": "a", "stance": "s", "weight_prior": 0.5}]"#,
        )
        .unwrap();
        assert_eq!(ok.len(), 1);

        let dup = serde_json::from_str::<PersonaRoster>(
            r#"[{"name": "a", "stance": "s", "weight_prior": 0.5},
                {"name": "a", "stance": "t", "weight_prior": 0.5}]"#,
        );
        assert!(dup.is_err());
    }
}

//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Query cannot be empty")]
    EmptyQuery,

    #[error("Persona roster is empty")]
    EmptyRoster,

    #[error("Invalid persona: {0}")]
    InvalidPersona(String),

    #[error("Duplicate persona name: {0}")]
    DuplicatePersona(String),
}

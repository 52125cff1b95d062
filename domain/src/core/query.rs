//! Query value object

use super::error::DomainError;
use serde::{Deserialize, Serialize};

/// A query to be answered by the expert panel (Value Object)
///
/// Created once per invocation and read-only afterwards. Every stage of the
/// pipeline borrows the same query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Query {
    content: String,
}

impl Query {
    /// Create a new query, rejecting empty or whitespace-only text
    pub fn new(content: impl Into<String>) -> Result<Self, DomainError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(DomainError::EmptyQuery);
        }
        Ok(Self { content })
    }

    /// Get the query content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Consume and return the inner content
    pub fn into_content(self) -> String {
        self.content
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.content)
    }
}

impl From<Query> for String {
    fn from(query: Query) -> Self {
        query.content
    }
}

impl TryFrom<&str> for Query {
    type Error = DomainError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Query::new(s)
    }
}

impl TryFrom<String> for Query {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Query::new(s)
    }
}

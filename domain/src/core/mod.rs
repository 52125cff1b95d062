//! Core domain concepts shared across all subdomains.
//!
//! - [`query::Query`] - a validated query to pose to the expert panel
//! - [`error::DomainError`] - domain-level errors

pub mod error;
pub mod query;

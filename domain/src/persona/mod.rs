//! Expert personas
//!
//! A persona is a reasoning stance (a system prompt) that an expert adopts
//! when answering. The panel is an ordered [`PersonaRoster`]; roster order is
//! the deterministic tie-breaker when two experts end up with the same
//! confidence.

pub mod entities;
pub mod roster;

pub use entities::Persona;
pub use roster::PersonaRoster;

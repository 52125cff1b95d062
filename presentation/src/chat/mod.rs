//! Interactive chat module
//!
//! Line-oriented chat that runs one consensus per question.

mod repl;

pub use repl::ChatRepl;

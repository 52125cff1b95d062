//! Pipeline orchestration domain
//!
//! State machine and transparency trace for one consensus run.

pub mod entities;
pub mod trace;

//! Candidate execution core.
//!
//! Core owns the candidate capability, the reference oracle and the
//! timeout-bounded runner. Policy (what an outcome means) lives in
//! [`crate::verdict`].

pub mod candidate;
pub mod oracle;
pub mod runner;
pub mod types;

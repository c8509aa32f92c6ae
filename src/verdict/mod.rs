//! Verdicts: elimination and ranking
//!
//! Both are deterministic functions of the outcomes they are given. Policy
//! numbers come in through [`crate::config::types::EliminationPolicy`] and
//! [`crate::config::types::ScoringWeights`].

pub mod elimination;
pub mod scoring;

pub use elimination::{
    CandidateResult, CandidateStatus, EliminationEngine, EliminationReason, HiddenInputs,
};
pub use scoring::Scorer;

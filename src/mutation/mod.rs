//! Mutation testing of a verification suite.
//!
//! Source files are mutated in place one line at a time, the verification
//! command is run against each mutant, and the original bytes are put back
//! before the next mutant.

pub mod engine;
pub mod gate;
pub mod rules;
pub mod targets;
pub mod verifier;

pub use engine::{MutationEngine, MutationGranularity, MutationRecord, MutationReport};
pub use gate::{GateDecision, MutationGate};
pub use rules::MutationKind;
pub use verifier::{CommandVerifier, Verifier, VerifyStatus};

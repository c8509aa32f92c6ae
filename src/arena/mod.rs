//! The arena pipeline.
//!
//! A pass generates one set of hidden inputs, runs every candidate through
//! the elimination chain, scores the survivors and crowns the leader.
//! Hell Mode reruns the whole pass under an escalated contract.

pub mod escalation;
pub mod pipeline;
pub mod result;

pub use escalation::{EscalatedContract, HellMode};
pub use pipeline::{Arena, ArenaOptions};
pub use result::{ArenaResult, EscalatedRun};

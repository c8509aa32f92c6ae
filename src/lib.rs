//! arenabox: a candidate evaluation arena
//!
//! Competing implementations of one function contract are run through a
//! fixed elimination chain, scored on speed and size, and ranked. A separate
//! mutation engine measures how well a verification suite catches small
//! source changes.
//!
//! # Architecture
//!
//! ## Execution Core ([`core`])
//! - [`core::candidate`]: The `EntryPoint` capability and candidate identity
//! - [`core::runner`]: Timeout-bounded execution with worker abandonment
//! - [`core::oracle`]: Reference cases and structural JSON equality
//!
//! ## Inputs ([`generator`], [`analysis`])
//! - [`generator::adversarial`]: Fuzz, stress and perf case generation
//! - [`generator::schema`]: Task input schemas
//! - [`analysis::structure`]: Function length and nesting heuristics
//!
//! ## Verdict ([`verdict`])
//! - [`verdict::elimination`]: Type-state ordered elimination chain
//! - [`verdict::scoring`]: Min-max scoring and total ranking order
//!
//! ## Arena ([`arena`])
//! - [`arena::pipeline`]: Whole-cohort passes
//! - [`arena::escalation`]: Hell Mode contract escalation
//!
//! ## Mutation ([`mutation`], [`safety`])
//! - [`mutation::engine`]: Mutate, verify, restore cycles
//! - [`mutation::gate`]: Mutation score threshold
//! - [`safety::restore`]: Guaranteed byte-identical restore
//! - [`safety::file_lock`]: Advisory exclusive file locks
//!
//! ## Command-backed candidates ([`judge`])
//! - [`judge::command`]: Interpreter process per invocation
//! - [`judge::loader`]: Candidate directory loading
//!
//! ## Observability & Configuration ([`observability`], [`config`])
//! - [`observability::events`]: Structured events and the audit log
//! - [`observability::metrics`]: Prometheus metrics export
//! - [`config::types`]: Contracts, policy and the harness error type
//! - [`config::validator`]: Contract and policy validation
//! - [`config::presets`]: Built-in tasks and interpreters

pub mod analysis;
pub mod arena;
pub mod cli;
pub mod config;
pub mod core;
pub mod generator;
pub mod judge;
pub mod mutation;
pub mod observability;
pub mod safety;
pub mod verdict;

pub use arena::{Arena, ArenaOptions, ArenaResult, EscalatedRun, HellMode};
pub use config::types::*;
pub use core::candidate::{Candidate, EntryPoint};
pub use core::oracle::ReferenceOracle;
pub use core::types::{CandidateFault, ExecutionOutcome, TestCase};
pub use mutation::{MutationEngine, MutationGate, MutationReport};
pub use verdict::{CandidateResult, CandidateStatus, EliminationReason};

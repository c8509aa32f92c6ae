//! Observability
//!
//! Structured arena events and per-run metrics.

pub mod events;
pub mod metrics;

//! Adversarial input generation.
//!
//! Fuzz sets always open with a fixed list of mandatory probes; the rest is
//! drawn from weighted malformed-input families. Stress and perf sets are
//! well-formed records drawn from the task's [`schema::InputSchema`].

pub mod adversarial;
pub mod schema;

pub use adversarial::{AdversarialGenerator, FuzzFamily};
pub use schema::{FieldKind, FieldSpec, InputSchema};

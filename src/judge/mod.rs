//! Command-backed candidates.
//!
//! The arena core only sees [`crate::core::candidate::EntryPoint`]. This
//! module adapts candidate files run by an external interpreter to it.

pub mod command;
pub mod loader;

pub use command::CommandEntryPoint;
pub use loader::load_candidates;

//! Configuration
//!
//! Task contracts, registry loading, validation and built-in presets.

pub mod presets;
pub mod registry;
pub mod types;
pub mod validator;

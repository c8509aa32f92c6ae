//! Static checks on candidate source text.

pub mod structure;

pub use structure::{analyze, code_lines, longest_function_lines, nesting_depth, StructureReport};

/// Core configuration types and the harness error taxonomy
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-task evaluation contract
///
/// Immutable once loaded. Escalation produces a new contract instead of
/// touching this one (see [`crate::arena::escalation`]).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskContract {
    /// Name of the function under test
    pub entry_name: String,
    /// Wall-clock budget for a single invocation
    pub timeout_ms: u64,
    /// Timing trials on representative input
    pub perf_rounds: u64,
    /// Generated fuzz cases per pass
    pub fuzz_rounds: u64,
    /// Generated stress cases per pass
    pub stress_data_size: u64,
    /// Longest allowed function span in code lines
    pub max_function_lines: u64,
    /// Deepest allowed block nesting
    pub max_nesting_depth: u64,
}

impl TaskContract {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }
}

/// Elimination thresholds, passed into the engine by value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EliminationPolicy {
    /// Fuzz failure rate above which a candidate is eliminated
    pub max_fuzz_fail_rate: f64,
}

impl Default for EliminationPolicy {
    fn default() -> Self {
        Self {
            max_fuzz_fail_rate: 0.05,
        }
    }
}

/// Ranking weights applied to the normalised survivor components
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringWeights {
    pub performance: f64,
    pub code_size: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            performance: 0.6,
            code_size: 0.4,
        }
    }
}

/// Harness-level errors
///
/// Candidate faults never appear here; they are outcomes
/// (see [`crate::core::types::ExecutionOutcome`]). Anything in this enum
/// aborts the whole run.
#[derive(Error, Debug)]
pub enum ArenaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Task '{0}' not found")]
    UnknownTask(String),

    #[error("Generator error: {0}")]
    Generator(String),

    #[error("Runner error: {0}")]
    Runner(String),

    #[error("Failed to restore {path}: {details}")]
    Restore { path: String, details: String },

    #[error("Verification command error: {0}")]
    Verifier(String),

    #[error("Lock error: {0}")]
    Lock(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Interrupted by signal")]
    Interrupted,
}

impl ArenaError {
    /// Exit code used by the CLI for harness faults
    pub fn exit_code(&self) -> i32 {
        match self {
            ArenaError::Config(_) | ArenaError::UnknownTask(_) => 2,
            ArenaError::Restore { .. } => 75,
            ArenaError::Io(_) => 74,
            ArenaError::Lock(_) => 3,
            ArenaError::Interrupted => 130,
            _ => 1,
        }
    }
}

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, ArenaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_uses_camel_case_field_names() {
        let contract = TaskContract {
            entry_name: "double".to_string(),
            timeout_ms: 50,
            perf_rounds: 10,
            fuzz_rounds: 100,
            stress_data_size: 1000,
            max_function_lines: 30,
            max_nesting_depth: 3,
        };

        let value = serde_json::to_value(&contract).unwrap();
        assert_eq!(value["entryName"], "double");
        assert_eq!(value["timeoutMs"], 50);
        assert_eq!(value["stressDataSize"], 1000);
        assert_eq!(value["maxNestingDepth"], 3);
    }

    #[test]
    fn default_policy_and_weights() {
        assert_eq!(EliminationPolicy::default().max_fuzz_fail_rate, 0.05);
        let weights = ScoringWeights::default();
        assert_eq!(weights.performance, 0.6);
        assert_eq!(weights.code_size, 0.4);
    }

    #[test]
    fn restore_failure_maps_to_data_error_exit_code() {
        let err = ArenaError::Restore {
            path: "a.ts".to_string(),
            details: "disk full".to_string(),
        };
        assert_eq!(err.exit_code(), 75);
        assert!(err.to_string().contains("a.ts"));
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One input handed to a candidate
///
/// Reference cases carry `expected`; generated fuzz/stress/perf cases
/// usually do not and are judged only on "did not throw, did not time out".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,
}

impl TestCase {
    pub fn new(name: impl Into<String>, input: Value) -> Self {
        Self {
            name: name.into(),
            input,
            expected: None,
        }
    }

    pub fn with_expected(mut self, expected: Value) -> Self {
        self.expected = Some(expected);
        self
    }
}

/// Fault raised by candidate code
///
/// This is data describing a candidate failure, not a harness error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CandidateFault {
    #[error("{0}")]
    Raised(String),

    #[error("panicked: {0}")]
    Panicked(String),

    #[error("invalid output: {0}")]
    InvalidOutput(String),
}

/// Result of running one candidate against one input - closed set
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExecutionOutcome {
    /// Returned before the deadline
    #[serde(rename_all = "camelCase")]
    Completed { value: Value, elapsed_ms: f64 },
    /// Raised an error or panicked
    Threw { error: String },
    /// Deadline passed; elapsed is reported as exactly the timeout
    #[serde(rename_all = "camelCase")]
    TimedOut { elapsed_ms: f64 },
}

impl ExecutionOutcome {
    pub fn is_fault(&self) -> bool {
        !matches!(self, ExecutionOutcome::Completed { .. })
    }

    pub fn elapsed_ms(&self) -> Option<f64> {
        match self {
            ExecutionOutcome::Completed { elapsed_ms, .. }
            | ExecutionOutcome::TimedOut { elapsed_ms } => Some(*elapsed_ms),
            ExecutionOutcome::Threw { .. } => None,
        }
    }

    /// Short label used in logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            ExecutionOutcome::Completed { .. } => "completed",
            ExecutionOutcome::Threw { .. } => "threw",
            ExecutionOutcome::TimedOut { .. } => "timed_out",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn outcome_serializes_with_kind_tag() {
        let outcome = ExecutionOutcome::TimedOut { elapsed_ms: 50.0 };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value, json!({"kind": "timedOut", "elapsedMs": 50.0}));
    }

    #[test]
    fn fault_classification() {
        let ok = ExecutionOutcome::Completed {
            value: json!(4),
            elapsed_ms: 0.2,
        };
        let threw = ExecutionOutcome::Threw {
            error: "boom".to_string(),
        };
        assert!(!ok.is_fault());
        assert!(threw.is_fault());
        assert_eq!(threw.elapsed_ms(), None);
        assert_eq!(ok.label(), "completed");
    }

    #[test]
    fn test_case_omits_missing_expected() {
        let case = TestCase::new("fuzz-1", json!(null));
        let value = serde_json::to_value(&case).unwrap();
        assert!(value.get("expected").is_none());
    }
}

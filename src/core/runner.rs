/// Candidate runner: one invocation, one worker thread, one deadline
///
/// The worker owns clones of the entry point and the input; the caller only
/// holds the receiving end of a bounded channel. On timeout the worker is
/// abandoned and its late result lands in a channel nobody reads, so a
/// zombie execution cannot leak into later measurements.
use crate::config::types::{ArenaError, Result};
use crate::core::candidate::Candidate;
use crate::core::types::{CandidateFault, ExecutionOutcome};
use crossbeam_channel::RecvTimeoutError;
use log::debug;
use serde_json::Value;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::{Duration, Instant};

type WorkerReport = (
    std::thread::Result<std::result::Result<Value, CandidateFault>>,
    Duration,
);

#[derive(Debug, Clone, Default)]
pub struct CandidateRunner {
    /// Worker stack size; `None` uses the platform default
    stack_size: Option<usize>,
    /// Added to every deadline for candidates that pay a process start per call
    startup_allowance_ms: u64,
}

impl CandidateRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    pub fn with_startup_allowance(mut self, millis: u64) -> Self {
        self.startup_allowance_ms = millis;
        self
    }

    pub fn startup_allowance_ms(&self) -> u64 {
        self.startup_allowance_ms
    }

    /// Execute `candidate` on `input` under a wall-clock budget of `timeout_ms`
    ///
    /// Candidate errors and panics become [`ExecutionOutcome::Threw`]; only a
    /// failure to start the worker is a harness error.
    pub fn execute(
        &self,
        candidate: &Candidate,
        input: &Value,
        timeout_ms: u64,
    ) -> Result<ExecutionOutcome> {
        let entry = candidate.entry_point();
        let input = input.clone();
        let (tx, rx) = crossbeam_channel::bounded::<WorkerReport>(1);

        let mut builder = thread::Builder::new().name(format!("arena-{}", candidate.name()));
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }

        builder
            .spawn(move || {
                let started = Instant::now();
                let result = panic::catch_unwind(AssertUnwindSafe(|| entry.invoke(&input)));
                let elapsed = started.elapsed();
                // Receiver is gone after a timeout; the result is dropped.
                let _ = tx.send((result, elapsed));
            })
            .map_err(|e| {
                ArenaError::Runner(format!(
                    "failed to spawn worker for candidate '{}': {}",
                    candidate.name(),
                    e
                ))
            })?;

        let budget = Duration::from_millis(timeout_ms.saturating_add(self.startup_allowance_ms));
        let outcome = match rx.recv_timeout(budget) {
            Ok((_, elapsed)) if elapsed > budget => Self::timed_out(timeout_ms),
            Ok((Ok(Ok(value)), elapsed)) => ExecutionOutcome::Completed {
                value,
                elapsed_ms: elapsed.as_secs_f64() * 1000.0,
            },
            Ok((Ok(Err(fault)), _)) => ExecutionOutcome::Threw {
                error: fault.to_string(),
            },
            Ok((Err(payload), _)) => ExecutionOutcome::Threw {
                error: CandidateFault::Panicked(panic_payload_to_string(payload)).to_string(),
            },
            Err(RecvTimeoutError::Timeout) => Self::timed_out(timeout_ms),
            Err(RecvTimeoutError::Disconnected) => ExecutionOutcome::Threw {
                error: "worker terminated before reporting".to_string(),
            },
        };

        debug!(
            "candidate '{}' -> {} ({:?})",
            candidate.name(),
            outcome.label(),
            outcome.elapsed_ms()
        );
        Ok(outcome)
    }

    fn timed_out(timeout_ms: u64) -> ExecutionOutcome {
        ExecutionOutcome::TimedOut {
            elapsed_ms: timeout_ms as f64,
        }
    }
}

fn panic_payload_to_string(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn completed_outcome_carries_value() {
        let candidate = Candidate::from_fn("double", "", |v| Ok(json!(v.as_i64().unwrap() * 2)));
        let outcome = CandidateRunner::new().execute(&candidate, &json!(2), 1000).unwrap();
        match outcome {
            ExecutionOutcome::Completed { value, elapsed_ms } => {
                assert_eq!(value, json!(4));
                assert!(elapsed_ms >= 0.0 && elapsed_ms < 1000.0);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn raised_error_becomes_threw() {
        let candidate = Candidate::from_fn("raise", "", |_| {
            Err(CandidateFault::Raised("cannot read property of null".to_string()))
        });
        let outcome = CandidateRunner::new().execute(&candidate, &json!(null), 1000).unwrap();
        assert_eq!(
            outcome,
            ExecutionOutcome::Threw {
                error: "cannot read property of null".to_string()
            }
        );
    }

    #[test]
    fn panic_is_captured() {
        let candidate = Candidate::from_fn("panics", "", |_| panic!("index out of bounds"));
        let outcome = CandidateRunner::new().execute(&candidate, &json!(1), 1000).unwrap();
        match outcome {
            ExecutionOutcome::Threw { error } => assert!(error.contains("index out of bounds")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn timeout_reports_exact_budget_and_returns_promptly() {
        let candidate = Candidate::from_fn("sleeper", "", |_| {
            std::thread::sleep(Duration::from_millis(2000));
            Ok(json!(null))
        });

        let started = Instant::now();
        let outcome = CandidateRunner::new().execute(&candidate, &json!(1), 50).unwrap();
        let waited = started.elapsed();

        assert_eq!(outcome, ExecutionOutcome::TimedOut { elapsed_ms: 50.0 });
        assert!(waited < Duration::from_millis(1000), "waited {:?}", waited);
    }

    #[test]
    fn startup_allowance_extends_deadline() {
        let candidate = Candidate::from_fn("slow-start", "", |_| {
            std::thread::sleep(Duration::from_millis(60));
            Ok(json!(1))
        });
        let runner = CandidateRunner::new().with_startup_allowance(1000);
        let outcome = runner.execute(&candidate, &json!(1), 20).unwrap();
        assert!(matches!(outcome, ExecutionOutcome::Completed { .. }));
    }

    #[test]
    fn abandoned_worker_does_not_affect_next_execution() {
        let slow = Candidate::from_fn("slow", "", |_| {
            std::thread::sleep(Duration::from_millis(300));
            Ok(json!("late"))
        });
        let fast = Candidate::from_fn("fast", "", |_| Ok(json!("fast")));
        let runner = CandidateRunner::new();

        let first = runner.execute(&slow, &json!(1), 20).unwrap();
        assert!(matches!(first, ExecutionOutcome::TimedOut { .. }));

        let second = runner.execute(&fast, &json!(1), 1000).unwrap();
        match second {
            ExecutionOutcome::Completed { value, .. } => assert_eq!(value, json!("fast")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}

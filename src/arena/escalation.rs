/// Hell Mode: a pure transform from a task contract to a harsher one
use crate::config::types::TaskContract;
use serde::{Deserialize, Serialize};

/// Environment switch read by the CLI
pub const HELL_MODE_ENV: &str = "ARENA_HELL_MODE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HellMode {
    pub fuzz_multiplier: u64,
    pub stress_multiplier: u64,
    pub perf_multiplier: u64,
    pub timeout_divisor: u64,
}

impl Default for HellMode {
    fn default() -> Self {
        Self {
            fuzz_multiplier: 5,
            stress_multiplier: 5,
            perf_multiplier: 3,
            timeout_divisor: 2,
        }
    }
}

/// A contract produced by [`HellMode::escalate`], kept beside its base
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalatedContract {
    pub base: TaskContract,
    pub escalated: TaskContract,
}

impl HellMode {
    /// True when `ARENA_HELL_MODE=1`
    pub fn requested_by_env() -> bool {
        std::env::var(HELL_MODE_ENV).map(|v| v == "1").unwrap_or(false)
    }

    /// Multiply the round counts and divide the timeout
    ///
    /// Multiplication saturates; the timeout rounds down and never drops
    /// below 1 ms. Factors of zero are treated as 1, so the result is never
    /// easier than `base`.
    pub fn escalate(&self, base: &TaskContract) -> EscalatedContract {
        let factor = |f: u64| f.max(1);
        let escalated = TaskContract {
            fuzz_rounds: base.fuzz_rounds.saturating_mul(factor(self.fuzz_multiplier)),
            stress_data_size: base
                .stress_data_size
                .saturating_mul(factor(self.stress_multiplier)),
            perf_rounds: base.perf_rounds.saturating_mul(factor(self.perf_multiplier)),
            timeout_ms: (base.timeout_ms / factor(self.timeout_divisor)).max(1),
            ..base.clone()
        };
        EscalatedContract {
            base: base.clone(),
            escalated,
        }
    }
}

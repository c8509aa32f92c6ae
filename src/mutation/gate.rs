use crate::mutation::engine::MutationReport;
use crate::observability::events;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_SCORE: u32 = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationGate {
    pub min_score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Pass { score: u32 },
    Fail { score: u32, min_score: u32 },
}

impl GateDecision {
    pub fn is_pass(&self) -> bool {
        matches!(self, GateDecision::Pass { .. })
    }
}

impl Default for MutationGate {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
        }
    }
}

impl MutationGate {
    pub fn new(min_score: u32) -> Self {
        Self { min_score }
    }

    /// A score below the minimum is a hard failure
    pub fn evaluate(&self, report: &MutationReport) -> GateDecision {
        let decision = if report.score >= self.min_score {
            GateDecision::Pass {
                score: report.score,
            }
        } else {
            GateDecision::Fail {
                score: report.score,
                min_score: self.min_score,
            }
        };
        events::log_event(&events::gate_decision(
            report.score,
            self.min_score,
            decision.is_pass(),
        ));
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with_score(score: u32) -> MutationReport {
        MutationReport {
            score,
            ..MutationReport::default()
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        let gate = MutationGate::default();
        assert!(gate.evaluate(&report_with_score(70)).is_pass());
        assert_eq!(
            gate.evaluate(&report_with_score(69)),
            GateDecision::Fail {
                score: 69,
                min_score: 70
            }
        );
    }

    #[test]
    fn custom_minimum() {
        assert!(MutationGate::new(0).evaluate(&report_with_score(0)).is_pass());
        assert!(!MutationGate::new(100).evaluate(&report_with_score(99)).is_pass());
    }
}

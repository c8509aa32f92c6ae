use crate::arena::escalation::EscalatedContract;
use crate::verdict::elimination::CandidateResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one full pass over a cohort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArenaResult {
    pub task: String,
    pub timestamp: DateTime<Utc>,
    /// Every loaded candidate, in load order
    pub candidates: Vec<CandidateResult>,
    pub champion: Option<String>,
    /// Passing candidates in rank order
    pub leaderboard: Vec<CandidateResult>,
}

impl ArenaResult {
    pub fn survivors(&self) -> usize {
        self.leaderboard.len()
    }

    pub fn eliminated(&self) -> impl Iterator<Item = &CandidateResult> {
        self.candidates.iter().filter(|c| !c.is_pass())
    }

    pub fn get(&self, name: &str) -> Option<&CandidateResult> {
        self.candidates.iter().find(|c| c.name == name)
    }
}

/// Baseline and escalated passes of a Hell Mode run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalatedRun {
    pub contract: EscalatedContract,
    pub baseline: ArenaResult,
    pub escalated: ArenaResult,
}

impl EscalatedRun {
    /// Only the escalated pass can crown a champion
    pub fn champion(&self) -> Option<&str> {
        self.escalated.champion.as_deref()
    }
}

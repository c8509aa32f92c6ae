/// Survivor scoring and deterministic ranking
use crate::config::types::ScoringWeights;
use crate::verdict::elimination::CandidateResult;
use std::cmp::Ordering;

/// Weighted score over the survivors of a single pass
///
/// Components are min-max normalised across survivors: the fastest and the
/// shortest candidate each get 100, the slowest and the longest get 0.
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    weights: ScoringWeights,
}

impl Scorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Assign `score` to every passing result; eliminated results get 0
    pub fn score(&self, results: &mut [CandidateResult]) {
        let survivors: Vec<&CandidateResult> = results.iter().filter(|r| r.is_pass()).collect();
        if survivors.is_empty() {
            return;
        }

        let runtime = MinMax::over(survivors.iter().map(|r| r.avg_runtime_ms));
        let size = MinMax::over(survivors.iter().map(|r| r.code_lines as f64));
        let total_weight = self.weights.performance + self.weights.code_size;

        for result in results.iter_mut() {
            if !result.is_pass() {
                result.score = 0;
                continue;
            }
            let perf = runtime.component(result.avg_runtime_ms);
            let lines = size.component(result.code_lines as f64);
            let raw = (self.weights.performance * perf + self.weights.code_size * lines)
                / total_weight;
            result.score = raw.round().clamp(0.0, 100.0) as u32;
        }
    }

    /// Passing results in rank order
    ///
    /// Score descending, then runtime ascending, then code lines ascending,
    /// then name ascending.
    pub fn rank(&self, results: &[CandidateResult]) -> Vec<CandidateResult> {
        let mut leaderboard: Vec<CandidateResult> =
            results.iter().filter(|r| r.is_pass()).cloned().collect();
        leaderboard.sort_by(compare_rank);
        leaderboard
    }
}

pub fn compare_rank(a: &CandidateResult, b: &CandidateResult) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.avg_runtime_ms.total_cmp(&b.avg_runtime_ms))
        .then_with(|| a.code_lines.cmp(&b.code_lines))
        .then_with(|| a.name.cmp(&b.name))
}

struct MinMax {
    min: f64,
    max: f64,
}

impl MinMax {
    fn over(values: impl Iterator<Item = f64>) -> Self {
        values.fold(
            MinMax {
                min: f64::INFINITY,
                max: f64::NEG_INFINITY,
            },
            |acc, v| MinMax {
                min: acc.min.min(v),
                max: acc.max.max(v),
            },
        )
    }

    /// `100 * (1 - (x - min) / range)`; a zero range counts as 1
    fn component(&self, x: f64) -> f64 {
        let range = self.max - self.min;
        let range = if range == 0.0 { 1.0 } else { range };
        100.0 * (1.0 - (x - self.min) / range)
    }
}

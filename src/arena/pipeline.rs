use crate::arena::escalation::HellMode;
use crate::arena::result::{ArenaResult, EscalatedRun};
use crate::config::registry::TaskSpec;
use crate::config::types::{ArenaError, EliminationPolicy, Result, ScoringWeights, TaskContract};
use crate::config::validator;
use crate::core::candidate::Candidate;
use crate::core::oracle::ReferenceOracle;
use crate::core::runner::CandidateRunner;
use crate::generator::adversarial::AdversarialGenerator;
use crate::observability::events::{self, EventSink};
use crate::observability::metrics::ArenaMetrics;
use crate::verdict::elimination::{CandidateResult, EliminationEngine, HiddenInputs};
use crate::verdict::scoring::Scorer;
use chrono::Utc;
use std::collections::HashSet;
use std::thread;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArenaOptions {
    /// Extra factor on every generated set, on top of the contract counts
    pub round_multiplier: u64,
    /// Fixed generator seed; entropy when `None`
    pub seed: Option<u64>,
    /// Evaluate candidates on scoped threads instead of one after another
    pub parallel: bool,
}

impl Default for ArenaOptions {
    fn default() -> Self {
        Self {
            round_multiplier: 1,
            seed: None,
            parallel: false,
        }
    }
}

/// One task, one oracle, one policy; evaluates whole cohorts
pub struct Arena {
    task: String,
    spec: TaskSpec,
    oracle: ReferenceOracle,
    policy: EliminationPolicy,
    scorer: Scorer,
    runner: CandidateRunner,
    options: ArenaOptions,
    metrics: ArenaMetrics,
    sink: EventSink,
}

impl Arena {
    pub fn new(task: impl Into<String>, spec: TaskSpec, oracle: ReferenceOracle) -> Self {
        let task = task.into();
        let sink = EventSink::new(&task);
        Self {
            task,
            spec,
            oracle,
            policy: EliminationPolicy::default(),
            scorer: Scorer::default(),
            runner: CandidateRunner::new(),
            options: ArenaOptions::default(),
            metrics: ArenaMetrics::new(),
            sink,
        }
    }

    pub fn with_policy(mut self, policy: EliminationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.scorer = Scorer::new(weights);
        self
    }

    pub fn with_runner(mut self, runner: CandidateRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_options(mut self, options: ArenaOptions) -> Self {
        self.options = options;
        self
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn contract(&self) -> &TaskContract {
        &self.spec.contract
    }

    pub fn metrics(&self) -> &ArenaMetrics {
        &self.metrics
    }

    pub fn run_id(&self) -> &str {
        self.sink.run_id()
    }

    /// Evaluate the cohort under the task's own contract
    pub fn run(&self, candidates: &[Candidate]) -> Result<ArenaResult> {
        self.preflight(candidates)?;
        self.run_pass(&self.spec.contract, candidates, self.options.seed, false)
    }

    /// Baseline pass, then a full pass under the Hell Mode contract
    ///
    /// The baseline is reported for comparison; the champion comes from the
    /// escalated pass alone.
    pub fn run_escalated(&self, candidates: &[Candidate], mode: &HellMode) -> Result<EscalatedRun> {
        self.preflight(candidates)?;
        validator::validate_hell_mode(mode).into_result()?;

        let contract = mode.escalate(&self.spec.contract);
        self.sink
            .emit(events::escalation_applied(&contract.base, &contract.escalated));

        let baseline = self.run_pass(&contract.base, candidates, self.options.seed, false)?;
        let escalated_seed = self.options.seed.map(|s| s.wrapping_add(1));
        let escalated = self.run_pass(&contract.escalated, candidates, escalated_seed, true)?;

        Ok(EscalatedRun {
            contract,
            baseline,
            escalated,
        })
    }

    fn preflight(&self, candidates: &[Candidate]) -> Result<()> {
        let mut result = validator::validate_contract(&self.spec.contract);
        for extra in [
            validator::validate_schema(&self.spec.schema),
            validator::validate_weights(self.scorer.weights()),
            validator::validate_policy(&self.policy),
        ] {
            result.valid &= extra.valid;
            result.errors.extend(extra.errors);
            result.warnings.extend(extra.warnings);
        }
        if self.options.round_multiplier == 0 {
            result.add_error("roundMultiplier must be at least 1".to_string());
        }

        let mut names = HashSet::new();
        for candidate in candidates {
            if !names.insert(candidate.name()) {
                result.add_error(format!("duplicate candidate name '{}'", candidate.name()));
            }
        }
        if candidates.is_empty() {
            result.add_warning("no candidates to evaluate".to_string());
        }
        if self.oracle.is_empty() {
            result.add_warning(format!("task '{}' has no reference cases", self.task));
        }

        result.into_result().map(|_| ())
    }

    fn run_pass(
        &self,
        contract: &TaskContract,
        candidates: &[Candidate],
        seed: Option<u64>,
        escalated: bool,
    ) -> Result<ArenaResult> {
        self.sink
            .emit(events::run_started(candidates.len(), contract, escalated));

        let multiplier = self.options.round_multiplier;
        let mut generator = AdversarialGenerator::new(self.spec.schema.clone(), seed)
            .with_perf_input(self.spec.perf_input.clone());
        let inputs = HiddenInputs {
            fuzz: generator.generate_fuzz(contract, multiplier)?,
            stress: generator.generate_stress(contract, multiplier)?,
            perf: generator.generate_perf(contract, multiplier)?,
        };
        log::info!(
            "task '{}': {} candidates, {} fuzz / {} stress / {} perf inputs, timeout {}ms",
            self.task,
            candidates.len(),
            inputs.fuzz.len(),
            inputs.stress.len(),
            inputs.perf.len(),
            contract.timeout_ms
        );

        let engine = EliminationEngine::new(
            contract,
            &self.oracle,
            &inputs,
            self.policy.clone(),
            &self.runner,
            &self.metrics,
            &self.sink,
        );

        let mut results = if self.options.parallel {
            self.evaluate_parallel(&engine, candidates)?
        } else {
            candidates
                .iter()
                .map(|c| engine.evaluate(c))
                .collect::<Result<Vec<_>>>()?
        };

        self.scorer.score(&mut results);
        let leaderboard = self.scorer.rank(&results);
        let champion = leaderboard.first().map(|r| r.name.clone());
        if champion.is_some() {
            self.metrics.champions.inc();
        }

        self.sink.emit(events::run_finished(
            champion.as_deref(),
            leaderboard.len(),
            results.len(),
        ));

        Ok(ArenaResult {
            task: self.task.clone(),
            timestamp: Utc::now(),
            candidates: results,
            champion,
            leaderboard,
        })
    }

    fn evaluate_parallel(
        &self,
        engine: &EliminationEngine<'_>,
        candidates: &[Candidate],
    ) -> Result<Vec<CandidateResult>> {
        let outcomes: Vec<Result<CandidateResult>> = thread::scope(|scope| {
            let handles: Vec<_> = candidates
                .iter()
                .map(|candidate| {
                    scope.spawn(move || {
                        self.metrics.active_evaluations.inc();
                        let result = engine.evaluate(candidate);
                        self.metrics.active_evaluations.dec();
                        result
                    })
                })
                .collect();

            handles
                .into_iter()
                .zip(candidates)
                .map(|(handle, candidate)| {
                    handle.join().unwrap_or_else(|_| {
                        Err(ArenaError::Runner(format!(
                            "evaluation thread for '{}' panicked",
                            candidate.name()
                        )))
                    })
                })
                .collect()
        });
        outcomes.into_iter().collect()
    }
}

/// Elimination engine
///
/// Each candidate walks a fixed chain of checks:
///
/// Pending -> StructureChecked -> ReferenceChecked -> FuzzChecked ->
/// StressChecked -> finished
///
/// Every step consumes the previous stage and either advances or finishes
/// with an eliminated [`CandidateResult`].
use crate::analysis::structure;
use crate::config::types::{EliminationPolicy, Result, TaskContract};
use crate::core::candidate::Candidate;
use crate::core::oracle::{deep_equal, ReferenceOracle};
use crate::core::runner::CandidateRunner;
use crate::core::types::{ExecutionOutcome, TestCase};
use crate::observability::events::{self, EventSink};
use crate::observability::metrics::ArenaMetrics;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CandidateStatus {
    Pass,
    Eliminated,
}

/// Why a candidate left the arena - closed set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum EliminationReason {
    FunctionTooLong(String),
    NestingTooDeep(String),
    TestFailed(String),
    Timeout(String),
    Throws(String),
    FuzzFailRate(String),
    StressTimeout(String),
    PerfTimeout(String),
}

impl EliminationReason {
    pub fn code(&self) -> &'static str {
        match self {
            EliminationReason::FunctionTooLong(_) => "functionTooLong",
            EliminationReason::NestingTooDeep(_) => "nestingTooDeep",
            EliminationReason::TestFailed(_) => "testFailed",
            EliminationReason::Timeout(_) => "timeout",
            EliminationReason::Throws(_) => "throws",
            EliminationReason::FuzzFailRate(_) => "fuzzFailRate",
            EliminationReason::StressTimeout(_) => "stressTimeout",
            EliminationReason::PerfTimeout(_) => "perfTimeout",
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            EliminationReason::FunctionTooLong(d)
            | EliminationReason::NestingTooDeep(d)
            | EliminationReason::TestFailed(d)
            | EliminationReason::Timeout(d)
            | EliminationReason::Throws(d)
            | EliminationReason::FuzzFailRate(d)
            | EliminationReason::StressTimeout(d)
            | EliminationReason::PerfTimeout(d) => d,
        }
    }
}

impl std::fmt::Display for EliminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.detail())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateResult {
    pub name: String,
    pub status: CandidateStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elimination_reason: Option<EliminationReason>,
    pub tests_passed: bool,
    pub fuzz_fail_rate: f64,
    pub stress_passed: bool,
    pub avg_runtime_ms: f64,
    pub code_lines: u64,
    pub score: u32,
}

impl CandidateResult {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CandidateStatus::Pass,
            elimination_reason: None,
            tests_passed: false,
            fuzz_fail_rate: 0.0,
            stress_passed: false,
            avg_runtime_ms: 0.0,
            code_lines: 0,
            score: 0,
        }
    }

    pub fn is_pass(&self) -> bool {
        self.status == CandidateStatus::Pass
    }
}

/// Hidden inputs shared by every candidate in one pass
#[derive(Debug, Clone, Default)]
pub struct HiddenInputs {
    pub fuzz: Vec<TestCase>,
    pub stress: Vec<TestCase>,
    pub perf: Vec<TestCase>,
}

pub struct Pending;
pub struct StructureChecked;
pub struct ReferenceChecked;
pub struct FuzzChecked;
pub struct StressChecked;

/// A candidate part-way through the check chain
///
/// Only `Evaluation<StressChecked>` can measure performance, so a candidate
/// cannot be timed before it has survived every earlier check.
///
/// ```compile_fail
/// use arenabox::verdict::elimination::{Evaluation, Pending};
///
/// fn skip_to_perf(eval: Evaluation<'_, Pending>) {
///     let _ = eval.measure_perf();
/// }
/// ```
///
/// A stage is consumed when it runs:
///
/// ```compile_fail
/// use arenabox::verdict::elimination::{Evaluation, Pending};
///
/// fn reuse(eval: Evaluation<'_, Pending>) {
///     let _first = eval.check_structure();
///     let _second = eval.check_structure();
/// }
/// ```
pub struct Evaluation<'e, S> {
    engine: &'e EliminationEngine<'e>,
    candidate: &'e Candidate,
    result: CandidateResult,
    _stage: PhantomData<S>,
}

/// Outcome of one stage: continue, or stop with a final result
pub enum Advance<'e, S> {
    Next(Evaluation<'e, S>),
    Eliminated(CandidateResult),
}

impl<'e, S> Evaluation<'e, S> {
    fn advance<T>(self) -> Advance<'e, T> {
        Advance::Next(Evaluation {
            engine: self.engine,
            candidate: self.candidate,
            result: self.result,
            _stage: PhantomData,
        })
    }

    fn eliminate<T>(mut self, reason: EliminationReason) -> Advance<'e, T> {
        Advance::Eliminated(self.engine.finish_eliminated(&mut self.result, reason))
    }

    pub fn candidate(&self) -> &Candidate {
        self.candidate
    }

    pub fn partial_result(&self) -> &CandidateResult {
        &self.result
    }

    fn execute(&self, case: &TestCase) -> Result<ExecutionOutcome> {
        let engine = self.engine;
        let outcome = engine
            .runner
            .execute(self.candidate, &case.input, engine.contract.timeout_ms)?;
        engine.metrics.record_outcome(&outcome);
        Ok(outcome)
    }
}

impl<'e> Evaluation<'e, Pending> {
    /// Length and nesting limits; never invokes the candidate
    pub fn check_structure(mut self) -> Advance<'e, StructureChecked> {
        let report = structure::analyze(self.candidate.source_text());
        let contract = self.engine.contract;
        self.result.code_lines = report.code_lines;

        if report.function_lines > contract.max_function_lines {
            let detail = format!(
                "function spans {} lines (limit {})",
                report.function_lines, contract.max_function_lines
            );
            return self.eliminate(EliminationReason::FunctionTooLong(detail));
        }
        if report.nesting_depth > contract.max_nesting_depth {
            let detail = format!(
                "nesting depth {} (limit {})",
                report.nesting_depth, contract.max_nesting_depth
            );
            return self.eliminate(EliminationReason::NestingTooDeep(detail));
        }
        self.advance()
    }
}

impl<'e> Evaluation<'e, StructureChecked> {
    /// Every oracle case must complete with a deep-equal value
    pub fn check_reference(mut self) -> Result<Advance<'e, ReferenceChecked>> {
        let engine = self.engine;
        let timeout_ms = engine.contract.timeout_ms;
        for case in engine.oracle.cases() {
            let reason = match self.execute(case)? {
                ExecutionOutcome::Completed { value, .. } => {
                    match case.expected.as_ref() {
                        Some(expected) if !deep_equal(&value, expected) => {
                            EliminationReason::TestFailed(format!(
                                "Test '{}': expected {}, got {}",
                                case.name, expected, value
                            ))
                        }
                        _ => continue,
                    }
                }
                ExecutionOutcome::Threw { error } => {
                    EliminationReason::Throws(format!("Test '{}' threw: {}", case.name, error))
                }
                ExecutionOutcome::TimedOut { .. } => EliminationReason::Timeout(format!(
                    "Test '{}' exceeded {}ms",
                    case.name, timeout_ms
                )),
            };
            return Ok(self.eliminate(reason));
        }
        self.result.tests_passed = true;
        Ok(self.advance())
    }
}

impl<'e> Evaluation<'e, ReferenceChecked> {
    /// Throws and timeouts over the fuzz set must stay under the policy rate
    pub fn check_fuzz(mut self) -> Result<Advance<'e, FuzzChecked>> {
        let engine = self.engine;
        let cases = &engine.inputs.fuzz;
        let mut failures = 0usize;
        for case in cases {
            let outcome = self.execute(case)?;
            if outcome.is_fault() {
                failures += 1;
                log::debug!(
                    "candidate '{}' fuzz case '{}' -> {}",
                    self.candidate.name(),
                    case.name,
                    outcome.label()
                );
            }
        }

        let rate = if cases.is_empty() {
            0.0
        } else {
            failures as f64 / cases.len() as f64
        };
        self.result.fuzz_fail_rate = rate;

        let limit = engine.policy.max_fuzz_fail_rate;
        log::info!(
            "candidate '{}' fuzz: {}/{} failed ({:.1}%)",
            self.candidate.name(),
            failures,
            cases.len(),
            rate * 100.0
        );
        if rate > limit {
            let detail = format!(
                "fuzz fail rate {:.1}% exceeds {:.1}%",
                rate * 100.0,
                limit * 100.0
            );
            return Ok(self.eliminate(EliminationReason::FuzzFailRate(detail)));
        }
        Ok(self.advance())
    }
}

impl<'e> Evaluation<'e, FuzzChecked> {
    /// Any throw or timeout on the stress set eliminates
    pub fn check_stress(mut self) -> Result<Advance<'e, StressChecked>> {
        let engine = self.engine;
        for case in &engine.inputs.stress {
            let detail = match self.execute(case)? {
                ExecutionOutcome::Completed { .. } => continue,
                ExecutionOutcome::Threw { error } => {
                    format!("stress case '{}' threw: {}", case.name, error)
                }
                ExecutionOutcome::TimedOut { elapsed_ms } => format!(
                    "stress case '{}' exceeded {}ms",
                    case.name, elapsed_ms
                ),
            };
            return Ok(self.eliminate(EliminationReason::StressTimeout(detail)));
        }
        self.result.stress_passed = true;
        Ok(self.advance())
    }
}

impl<'e> Evaluation<'e, StressChecked> {
    /// Time the perf trials and finish the evaluation
    pub fn measure_perf(mut self) -> Result<CandidateResult> {
        let engine = self.engine;
        let mut total_ms = 0.0;
        let mut completed = 0usize;

        for case in &engine.inputs.perf {
            let reason = match self.execute(case)? {
                ExecutionOutcome::Completed { elapsed_ms, .. } => {
                    total_ms += elapsed_ms;
                    completed += 1;
                    continue;
                }
                ExecutionOutcome::Threw { error } => EliminationReason::Throws(format!(
                    "perf trial '{}' threw: {}",
                    case.name, error
                )),
                ExecutionOutcome::TimedOut { elapsed_ms } => EliminationReason::PerfTimeout(
                    format!("perf trial '{}' exceeded {}ms", case.name, elapsed_ms),
                ),
            };
            return Ok(engine.finish_eliminated(&mut self.result, reason));
        }

        if completed > 0 {
            self.result.avg_runtime_ms = total_ms / completed as f64;
        }
        log::info!(
            "candidate '{}' passed (avg {:.4}ms, {} code lines)",
            self.result.name,
            self.result.avg_runtime_ms,
            self.result.code_lines
        );
        engine.sink.emit(events::candidate_passed(&self.result));
        Ok(self.result)
    }
}

/// Applies the check chain with one contract, oracle and hidden input set
pub struct EliminationEngine<'a> {
    contract: &'a TaskContract,
    oracle: &'a ReferenceOracle,
    inputs: &'a HiddenInputs,
    policy: EliminationPolicy,
    runner: &'a CandidateRunner,
    metrics: &'a ArenaMetrics,
    sink: &'a EventSink,
}

impl<'a> EliminationEngine<'a> {
    pub fn new(
        contract: &'a TaskContract,
        oracle: &'a ReferenceOracle,
        inputs: &'a HiddenInputs,
        policy: EliminationPolicy,
        runner: &'a CandidateRunner,
        metrics: &'a ArenaMetrics,
        sink: &'a EventSink,
    ) -> Self {
        Self {
            contract,
            oracle,
            inputs,
            policy,
            runner,
            metrics,
            sink,
        }
    }

    pub fn begin<'e>(&'e self, candidate: &'e Candidate) -> Evaluation<'e, Pending>
    where
        'a: 'e,
    {
        self.sink
            .emit(events::evaluation_started(candidate, self.contract));
        Evaluation {
            engine: self,
            candidate,
            result: CandidateResult::new(candidate.name()),
            _stage: PhantomData,
        }
    }

    /// Run the whole chain for one candidate
    pub fn evaluate(&self, candidate: &Candidate) -> Result<CandidateResult> {
        let eval = match self.begin(candidate).check_structure() {
            Advance::Next(eval) => eval,
            Advance::Eliminated(result) => return Ok(result),
        };
        let eval = match eval.check_reference()? {
            Advance::Next(eval) => eval,
            Advance::Eliminated(result) => return Ok(result),
        };
        let eval = match eval.check_fuzz()? {
            Advance::Next(eval) => eval,
            Advance::Eliminated(result) => return Ok(result),
        };
        let eval = match eval.check_stress()? {
            Advance::Next(eval) => eval,
            Advance::Eliminated(result) => return Ok(result),
        };
        eval.measure_perf()
    }

    fn finish_eliminated(
        &self,
        result: &mut CandidateResult,
        reason: EliminationReason,
    ) -> CandidateResult {
        log::warn!("candidate '{}' eliminated: {}", result.name, reason);
        self.metrics.record_elimination(reason.code());
        result.status = CandidateStatus::Eliminated;
        result.score = 0;
        result.elimination_reason = Some(reason);
        self.sink.emit(events::candidate_eliminated(result));
        result.clone()
    }
}

//! End-to-end arena behaviour over in-process candidates

use arenabox::config::registry::TaskSpec;
use arenabox::core::runner::CandidateRunner;
use arenabox::generator::schema::{FieldKind, InputSchema};
use arenabox::observability::events::EventSink;
use arenabox::observability::metrics::ArenaMetrics;
use arenabox::verdict::elimination::{EliminationEngine, HiddenInputs};
use arenabox::verdict::scoring::Scorer;
use arenabox::{
    Arena, ArenaOptions, Candidate, CandidateFault, CandidateResult, CandidateStatus,
    EliminationPolicy, HellMode, ReferenceOracle, ScoringWeights, TaskContract, TestCase,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DOUBLE_SOURCE: &str = "function double(x) {\n  return x * 2;\n}\n";

const DEEP_SOURCE: &str = "function double(x) {
  if (x) {
    if (x > 1) {
      if (x > 2) {
        if (x > 3) {
          return x * 2;
        }
      }
    }
  }
  return 0;
}
";

fn contract() -> TaskContract {
    TaskContract {
        entry_name: "double".to_string(),
        timeout_ms: 200,
        perf_rounds: 4,
        fuzz_rounds: 20,
        stress_data_size: 10,
        max_function_lines: 20,
        max_nesting_depth: 3,
    }
}

fn spec() -> TaskSpec {
    TaskSpec {
        contract: contract(),
        schema: InputSchema::Scalar {
            kind: FieldKind::Integer { min: -50, max: 50 },
        },
        // Outside every generated family, so only perf trials see it
        perf_input: Some(json!(1000)),
    }
}

fn oracle() -> ReferenceOracle {
    ReferenceOracle::new(vec![TestCase::new("two", json!(2)).with_expected(json!(4))]).unwrap()
}

fn double(v: &Value) -> Result<Value, CandidateFault> {
    Ok(match v.as_i64() {
        // i64 extremes double into floats rather than overflowing
        Some(n) => n
            .checked_mul(2)
            .map(|v| json!(v))
            .unwrap_or_else(|| json!(n as f64 * 2.0)),
        None => v.as_f64().map(|n| json!(n * 2.0)).unwrap_or(Value::Null),
    })
}

fn seeded(seed: u64) -> ArenaOptions {
    ArenaOptions {
        seed: Some(seed),
        ..ArenaOptions::default()
    }
}

#[test]
fn doubling_candidate_passes() {
    let arena = Arena::new("double", spec(), oracle()).with_options(seeded(1));
    let result = arena
        .run(&[Candidate::from_fn("x2", DOUBLE_SOURCE, double)])
        .unwrap();

    let entry = result.get("x2").unwrap();
    assert_eq!(entry.status, CandidateStatus::Pass);
    assert!(entry.tests_passed);
    assert!(entry.stress_passed);
    assert_eq!(entry.fuzz_fail_rate, 0.0);
    assert_eq!(result.champion.as_deref(), Some("x2"));
}

#[test]
fn one_null_failure_in_a_hundred_is_tolerated() {
    let mut fuzz: Vec<TestCase> = (0..99)
        .map(|i| TestCase::new(format!("fuzz-{}", i), json!(i)))
        .collect();
    fuzz.insert(40, TestCase::new("fuzz-null", Value::Null));
    let inputs = HiddenInputs {
        fuzz,
        stress: vec![TestCase::new("stress-0", json!(7))],
        perf: vec![TestCase::new("perf-0", json!(21))],
    };

    let contract = contract();
    let oracle = oracle();
    let runner = CandidateRunner::new();
    let metrics = ArenaMetrics::new();
    let sink = EventSink::new("double");
    let engine = EliminationEngine::new(
        &contract,
        &oracle,
        &inputs,
        EliminationPolicy::default(),
        &runner,
        &metrics,
        &sink,
    );

    let candidate = Candidate::from_fn("null-intolerant", DOUBLE_SOURCE, |v| {
        if v.is_null() {
            return Err(CandidateFault::Raised("Cannot read properties of null".to_string()));
        }
        double(v)
    });
    let result = engine.evaluate(&candidate).unwrap();

    assert!((result.fuzz_fail_rate - 0.01).abs() < 1e-12);
    assert_eq!(result.status, CandidateStatus::Pass);
    assert_eq!(metrics.executions_threw.get(), 1);
}

fn scored(name: &str, avg_runtime_ms: f64, code_lines: u64) -> CandidateResult {
    CandidateResult {
        name: name.to_string(),
        status: CandidateStatus::Pass,
        elimination_reason: None,
        tests_passed: true,
        fuzz_fail_rate: 0.0,
        stress_passed: true,
        avg_runtime_ms,
        code_lines,
        score: 0,
    }
}

#[test]
fn equal_speed_shorter_source_wins() {
    let scorer = Scorer::new(ScoringWeights::default());
    let mut results = vec![scored("A", 5.0, 20), scored("B", 5.0, 10)];
    scorer.score(&mut results);

    let ranked = scorer.rank(&results);
    assert_eq!(ranked[0].name, "B");
    assert!(ranked[0].score > ranked[1].score);
}

#[test]
fn structural_violation_never_invokes_candidate() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let deep = Candidate::from_fn("deep", DEEP_SOURCE, move |v| {
        counter.fetch_add(1, Ordering::SeqCst);
        double(v)
    });

    let arena = Arena::new("double", spec(), oracle()).with_options(seeded(2));
    let result = arena.run(&[deep]).unwrap();

    let entry = result.get("deep").unwrap();
    assert_eq!(entry.status, CandidateStatus::Eliminated);
    assert_eq!(
        entry.elimination_reason.as_ref().map(|r| r.code()),
        Some("nestingTooDeep")
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(result.champion.is_none());
}

#[test]
fn throwing_candidate_does_not_affect_neighbour() {
    let always_throws = Candidate::from_fn("broken", DOUBLE_SOURCE, |_| {
        Err(CandidateFault::Raised("boom".to_string()))
    });
    let panics = Candidate::from_fn("panicky", DOUBLE_SOURCE, |_| panic!("index out of range"));
    let good = Candidate::from_fn("good", DOUBLE_SOURCE, double);

    let alone = Arena::new("double", spec(), oracle())
        .with_options(seeded(3))
        .run(&[good.clone()])
        .unwrap();
    let mixed = Arena::new("double", spec(), oracle())
        .with_options(seeded(3))
        .run(&[always_throws, panics, good])
        .unwrap();

    let solo = alone.get("good").unwrap();
    let crowded = mixed.get("good").unwrap();
    assert_eq!(crowded.status, CandidateStatus::Pass);
    assert_eq!(crowded.fuzz_fail_rate, solo.fuzz_fail_rate);
    assert_eq!(crowded.tests_passed, solo.tests_passed);

    for name in ["broken", "panicky"] {
        let entry = mixed.get(name).unwrap();
        assert_eq!(
            entry.elimination_reason.as_ref().map(|r| r.code()),
            Some("throws"),
            "{}",
            name
        );
    }
    assert_eq!(mixed.champion.as_deref(), Some("good"));
    assert_eq!(mixed.candidates.len(), 3);
}

#[test]
fn fixed_seed_reproduces_verdicts() {
    // Throws on odd inputs, so the fail rate depends on the generated set
    let picky = || {
        Candidate::from_fn("picky", DOUBLE_SOURCE, |v| match v.as_i64() {
            Some(n) if n % 2 != 0 => Err(CandidateFault::Raised("odd".to_string())),
            _ => double(v),
        })
    };
    let policy = EliminationPolicy {
        max_fuzz_fail_rate: 1.0,
    };

    let run = |seed| {
        Arena::new("double", spec(), oracle())
            .with_policy(policy.clone())
            .with_options(seeded(seed))
            .run(&[picky()])
            .unwrap()
    };
    let first = run(99);
    let second = run(99);

    let a = first.get("picky").unwrap();
    let b = second.get("picky").unwrap();
    assert_eq!(a.status, b.status);
    assert_eq!(a.elimination_reason, b.elimination_reason);
    assert_eq!(a.fuzz_fail_rate, b.fuzz_fail_rate);
}

#[test]
fn parallel_and_sequential_agree_on_verdicts() {
    let cohort = || {
        vec![
            Candidate::from_fn("good", DOUBLE_SOURCE, double),
            Candidate::from_fn("deep", DEEP_SOURCE, double),
            Candidate::from_fn("off-by-one", DOUBLE_SOURCE, |v| {
                Ok(json!(v.as_i64().unwrap_or(0) * 2 + 1))
            }),
        ]
    };
    let sequential = Arena::new("double", spec(), oracle())
        .with_options(seeded(5))
        .run(&cohort())
        .unwrap();
    let parallel = Arena::new("double", spec(), oracle())
        .with_options(ArenaOptions {
            parallel: true,
            ..seeded(5)
        })
        .run(&cohort())
        .unwrap();

    for name in ["good", "deep", "off-by-one"] {
        let s = sequential.get(name).unwrap();
        let p = parallel.get(name).unwrap();
        assert_eq!(s.status, p.status, "{}", name);
        assert_eq!(s.elimination_reason, p.elimination_reason, "{}", name);
    }
    assert_eq!(
        parallel.get("off-by-one").unwrap().elimination_reason.as_ref().map(|r| r.code()),
        Some("testFailed")
    );
}

#[test]
fn escalated_contract_is_never_easier() {
    let base = contract();
    let escalated = HellMode::default().escalate(&base).escalated;
    assert!(escalated.fuzz_rounds >= base.fuzz_rounds);
    assert!(escalated.stress_data_size >= base.stress_data_size);
    assert!(escalated.perf_rounds >= base.perf_rounds);
    assert!(escalated.timeout_ms <= base.timeout_ms);
    assert_eq!(escalated.timeout_ms, 100);
    assert_eq!(escalated.max_function_lines, base.max_function_lines);
}

#[test]
fn hell_mode_champion_comes_from_escalated_pass() {
    // 120ms fits the 200ms baseline budget but not the 100ms escalated one
    let sluggish = Candidate::from_fn("sluggish", DOUBLE_SOURCE, |v| {
        if v.as_i64() == Some(1000) {
            std::thread::sleep(Duration::from_millis(120));
        }
        double(v)
    });
    let quick = Candidate::from_fn("quick", "const double = (x) => x * 2;\n", double);

    let outcome = Arena::new("double", spec(), oracle())
        .with_options(seeded(8))
        .run_escalated(&[sluggish, quick], &HellMode::default())
        .unwrap();

    assert_eq!(outcome.baseline.get("sluggish").unwrap().status, CandidateStatus::Pass);
    let escalated = outcome.escalated.get("sluggish").unwrap();
    assert_eq!(escalated.status, CandidateStatus::Eliminated);
    assert_eq!(
        escalated.elimination_reason.as_ref().map(|r| r.code()),
        Some("perfTimeout")
    );
    assert_eq!(outcome.champion(), Some("quick"));
    assert_eq!(outcome.contract.escalated.fuzz_rounds, 100);
}

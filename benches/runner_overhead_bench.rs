// Runner overhead benchmark
// Measures what one CandidateRunner::execute costs on top of the candidate itself
// Target: p50 < 1ms, p95 < 5ms for a trivial in-process candidate

use arenabox::core::runner::CandidateRunner;
use arenabox::Candidate;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

const ITERATIONS: usize = 2000;
const WARMUP_ITERATIONS: usize = 100;
const TIMEOUT_MS: u64 = 1000;

struct LatencyStats {
    p50: Duration,
    p95: Duration,
    p99: Duration,
    max: Duration,
    mean: Duration,
}

impl LatencyStats {
    fn from_samples(mut samples: Vec<Duration>) -> Self {
        samples.sort();
        let len = samples.len();
        let at = |q: f64| samples[((len as f64 * q) as usize).min(len - 1)];
        let sum: Duration = samples.iter().sum();

        Self {
            p50: at(0.50),
            p95: at(0.95),
            p99: at(0.99),
            max: samples[len - 1],
            mean: sum / len as u32,
        }
    }

    fn print(&self, label: &str) {
        println!("\n=== {} ===", label);
        println!("  p50:  {:?}", self.p50);
        println!("  p95:  {:?}", self.p95);
        println!("  p99:  {:?}", self.p99);
        println!("  max:  {:?}", self.max);
        println!("  mean: {:?}", self.mean);
    }
}

fn measure(runner: &CandidateRunner, candidate: &Candidate, input: &Value) -> Vec<Duration> {
    for _ in 0..WARMUP_ITERATIONS {
        let _ = runner.execute(candidate, input, TIMEOUT_MS);
    }
    (0..ITERATIONS)
        .map(|_| {
            let started = Instant::now();
            let _ = runner.execute(candidate, input, TIMEOUT_MS);
            started.elapsed()
        })
        .collect()
}

fn main() {
    let runner = CandidateRunner::new();

    let identity = Candidate::from_fn("identity", "", |v| Ok(v.clone()));
    let scalar = LatencyStats::from_samples(measure(&runner, &identity, &json!(21)));
    scalar.print("identity, scalar input");

    let record = json!({
        "hasVerifiedOwner": true,
        "hasRealPhotos": true,
        "avgRating": 4.5,
        "responseTimeHours": 2,
        "reviewCount": 10
    });
    let records = LatencyStats::from_samples(measure(&runner, &identity, &record));
    records.print("identity, listing record");

    let small_stack = CandidateRunner::new().with_stack_size(64 * 1024);
    let stack = LatencyStats::from_samples(measure(&small_stack, &identity, &json!(21)));
    stack.print("identity, 64KiB worker stack");

    let passed = scalar.p50 < Duration::from_millis(1) && scalar.p95 < Duration::from_millis(5);
    if passed {
        println!("\nPASS: runner overhead within target");
    } else {
        println!("\nFAIL: runner overhead above target (p50 < 1ms, p95 < 5ms)");
        std::process::exit(1);
    }
}

// Arena metrics
//
// Counters for execution outcomes, eliminations and mutants, plus a
// latency histogram over completed executions. One `ArenaMetrics` is owned
// by each run and shared by reference with the workers of that run.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::core::types::ExecutionOutcome;

/// Counter metric (monotonically increasing)
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, delta: u64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Gauge metric (can go up or down)
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicU64,
}

impl Gauge {
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.value.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
pub struct HistogramBucket {
    pub le: f64, // upper bound in milliseconds
    pub count: AtomicU64,
}

#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<HistogramBucket>,
    sum_micros: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    /// Buckets tuned for in-process candidate calls (milliseconds)
    pub fn new_latency() -> Self {
        let bounds = [0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0];
        Self {
            buckets: bounds
                .into_iter()
                .map(|le| HistogramBucket {
                    le,
                    count: AtomicU64::new(0),
                })
                .collect(),
            sum_micros: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, value: Duration) {
        let millis = value.as_secs_f64() * 1000.0;
        self.sum_micros
            .fetch_add(value.as_micros() as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        for bucket in &self.buckets {
            if millis <= bucket.le {
                bucket.count.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn observe_ms(&self, millis: f64) {
        self.observe(Duration::from_secs_f64(millis.max(0.0) / 1000.0));
    }

    pub fn get_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn get_sum_micros(&self) -> u64 {
        self.sum_micros.load(Ordering::Relaxed)
    }

    pub fn get_bucket_count(&self, le: f64) -> u64 {
        self.buckets
            .iter()
            .find(|b| (b.le - le).abs() < 1e-9)
            .map(|b| b.count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

pub const ELIMINATION_CODES: [&str; 8] = [
    "functionTooLong",
    "nestingTooDeep",
    "testFailed",
    "timeout",
    "throws",
    "fuzzFailRate",
    "stressTimeout",
    "perfTimeout",
];

#[derive(Debug)]
pub struct ArenaMetrics {
    pub executions_total: Counter,
    pub executions_completed: Counter,
    pub executions_threw: Counter,
    pub executions_timed_out: Counter,

    eliminations: [Counter; 8],
    pub champions: Counter,

    pub mutants_killed: Counter,
    pub mutants_survived: Counter,

    pub active_evaluations: Gauge,
    pub execution_latency: Histogram,
}

impl ArenaMetrics {
    pub fn new() -> Self {
        Self {
            executions_total: Counter::new(),
            executions_completed: Counter::new(),
            executions_threw: Counter::new(),
            executions_timed_out: Counter::new(),
            eliminations: Default::default(),
            champions: Counter::new(),
            mutants_killed: Counter::new(),
            mutants_survived: Counter::new(),
            active_evaluations: Gauge::default(),
            execution_latency: Histogram::new_latency(),
        }
    }

    pub fn record_outcome(&self, outcome: &ExecutionOutcome) {
        self.executions_total.inc();
        match outcome {
            ExecutionOutcome::Completed { elapsed_ms, .. } => {
                self.executions_completed.inc();
                self.execution_latency.observe_ms(*elapsed_ms);
            }
            ExecutionOutcome::Threw { .. } => self.executions_threw.inc(),
            ExecutionOutcome::TimedOut { .. } => self.executions_timed_out.inc(),
        }
    }

    pub fn record_elimination(&self, code: &str) {
        if let Some(i) = ELIMINATION_CODES.iter().position(|c| *c == code) {
            self.eliminations[i].inc();
        }
    }

    pub fn eliminations(&self, code: &str) -> u64 {
        ELIMINATION_CODES
            .iter()
            .position(|c| *c == code)
            .map(|i| self.eliminations[i].get())
            .unwrap_or(0)
    }

    pub fn record_mutant(&self, survived: bool) {
        if survived {
            self.mutants_survived.inc();
        } else {
            self.mutants_killed.inc();
        }
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let mut output = String::new();

        output.push_str("# HELP arena_executions_total Candidate invocations\n");
        output.push_str("# TYPE arena_executions_total counter\n");
        output.push_str(&format!(
            "arena_executions_total {}\n",
            self.executions_total.get()
        ));

        output.push_str("# HELP arena_executions_by_outcome Candidate invocations by outcome\n");
        output.push_str("# TYPE arena_executions_by_outcome counter\n");
        for (label, counter) in [
            ("completed", &self.executions_completed),
            ("threw", &self.executions_threw),
            ("timed_out", &self.executions_timed_out),
        ] {
            output.push_str(&format!(
                "arena_executions_by_outcome{{outcome=\"{}\"}} {}\n",
                label,
                counter.get()
            ));
        }

        output.push_str("# HELP arena_eliminations_total Eliminations by reason\n");
        output.push_str("# TYPE arena_eliminations_total counter\n");
        for (code, counter) in ELIMINATION_CODES.iter().zip(&self.eliminations) {
            output.push_str(&format!(
                "arena_eliminations_total{{reason=\"{}\"}} {}\n",
                code,
                counter.get()
            ));
        }

        output.push_str("# HELP arena_mutants_total Mutants by fate\n");
        output.push_str("# TYPE arena_mutants_total counter\n");
        output.push_str(&format!(
            "arena_mutants_total{{fate=\"killed\"}} {}\n",
            self.mutants_killed.get()
        ));
        output.push_str(&format!(
            "arena_mutants_total{{fate=\"survived\"}} {}\n",
            self.mutants_survived.get()
        ));

        output.push_str("# HELP arena_execution_latency_ms Completed invocation latency\n");
        output.push_str("# TYPE arena_execution_latency_ms histogram\n");
        for bucket in &self.execution_latency.buckets {
            output.push_str(&format!(
                "arena_execution_latency_ms_bucket{{le=\"{}\"}} {}\n",
                bucket.le,
                bucket.count.load(Ordering::Relaxed)
            ));
        }
        output.push_str(&format!(
            "arena_execution_latency_ms_sum {}\n",
            self.execution_latency.get_sum_micros() as f64 / 1000.0
        ));
        output.push_str(&format!(
            "arena_execution_latency_ms_count {}\n",
            self.execution_latency.get_count()
        ));

        output
    }
}

impl Default for ArenaMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Structured arena events
///
/// Every event goes to the `log` facade at a level derived from its severity.
/// When the CLI initialises an audit log, events are also appended to it as
/// JSON lines, one object per event.
use crate::config::types::{ArenaError, Result, TaskContract};
use crate::core::candidate::Candidate;
use crate::verdict::elimination::CandidateResult;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSeverity {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArenaEventType {
    RunStarted,
    RunFinished,
    EscalationApplied,
    EvaluationStarted,
    CandidatePassed,
    CandidateEliminated,
    MutantKilled,
    MutantSurvived,
    RestoreFailed,
    GateDecision,
}

impl ArenaEventType {
    pub fn default_severity(&self) -> EventSeverity {
        match self {
            ArenaEventType::RunStarted
            | ArenaEventType::RunFinished
            | ArenaEventType::EvaluationStarted
            | ArenaEventType::CandidatePassed
            | ArenaEventType::MutantKilled => EventSeverity::Low,
            ArenaEventType::EscalationApplied
            | ArenaEventType::CandidateEliminated
            | ArenaEventType::MutantSurvived
            | ArenaEventType::GateDecision => EventSeverity::Medium,
            ArenaEventType::RestoreFailed => EventSeverity::Critical,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArenaEvent {
    pub event_type: ArenaEventType,
    pub severity: EventSeverity,
    pub timestamp: DateTime<Utc>,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

impl ArenaEvent {
    pub fn new(event_type: ArenaEventType, details: String) -> Self {
        Self {
            event_type,
            severity: event_type.default_severity(),
            timestamp: Utc::now(),
            details,
            run_id: None,
            task: None,
            candidate: None,
            fingerprint: None,
        }
    }

    pub fn with_severity(mut self, severity: EventSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_candidate(mut self, candidate: &str) -> Self {
        self.candidate = Some(candidate.to_string());
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: String) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }
}

/// Append-only JSON-lines audit file
pub struct AuditLog {
    file: Mutex<File>,
    path: PathBuf,
}

impl AuditLog {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ArenaError::Config(format!("Failed to create audit log directory: {}", e))
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| ArenaError::Config(format!("Failed to open audit log: {}", e)))?;
        Ok(Self {
            file: Mutex::new(file),
            path: path.to_path_buf(),
        })
    }

    pub fn write(&self, event: &ArenaEvent) {
        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialise audit event: {}", e);
                return;
            }
        };
        match self.file.lock() {
            Ok(mut file) => {
                if let Err(e) = writeln!(file, "{}", line).and_then(|_| file.flush()) {
                    error!("Failed to write audit log {}: {}", self.path.display(), e);
                }
            }
            Err(_) => error!("Failed to acquire lock on audit log"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

static AUDIT_LOG: OnceLock<AuditLog> = OnceLock::new();

/// Initialise the process-wide audit log; later calls are ignored with a warning
pub fn init_audit_log(path: &Path) -> Result<()> {
    let log = AuditLog::open(path)?;
    if AUDIT_LOG.set(log).is_err() {
        warn!("Audit log already initialized");
    } else {
        info!("Audit log initialized at {}", path.display());
    }
    Ok(())
}

pub fn log_event(event: &ArenaEvent) {
    let label = format!("{:?}", event.event_type);
    let who = event.candidate.as_deref().unwrap_or("-");
    match event.severity {
        EventSeverity::Critical | EventSeverity::High => {
            error!("{} [{}] {}", label, who, event.details)
        }
        EventSeverity::Medium => warn!("{} [{}] {}", label, who, event.details),
        EventSeverity::Low => info!("{} [{}] {}", label, who, event.details),
    }
    if let Some(audit) = AUDIT_LOG.get() {
        audit.write(event);
    }
}

/// Stamps events with the run id and task before logging them
#[derive(Debug, Clone)]
pub struct EventSink {
    run_id: String,
    task: String,
}

impl EventSink {
    /// New sink with a fresh v4 run id
    pub fn new(task: &str) -> Self {
        Self::for_run(&Uuid::new_v4().to_string(), task)
    }

    pub fn for_run(run_id: &str, task: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            task: task.to_string(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn stamp(&self, mut event: ArenaEvent) -> ArenaEvent {
        event.run_id.get_or_insert_with(|| self.run_id.clone());
        event.task.get_or_insert_with(|| self.task.clone());
        event
    }

    pub fn emit(&self, event: ArenaEvent) {
        log_event(&self.stamp(event));
    }
}

pub fn run_started(candidates: usize, contract: &TaskContract, escalated: bool) -> ArenaEvent {
    ArenaEvent::new(
        ArenaEventType::RunStarted,
        format!(
            "{} candidates, timeoutMs={}, fuzzRounds={}{}",
            candidates,
            contract.timeout_ms,
            contract.fuzz_rounds,
            if escalated { " [HELL MODE]" } else { "" }
        ),
    )
}

pub fn run_finished(champion: Option<&str>, survivors: usize, total: usize) -> ArenaEvent {
    ArenaEvent::new(
        ArenaEventType::RunFinished,
        format!(
            "champion={} survivors={}/{}",
            champion.unwrap_or("none"),
            survivors,
            total
        ),
    )
}

pub fn escalation_applied(base: &TaskContract, escalated: &TaskContract) -> ArenaEvent {
    ArenaEvent::new(
        ArenaEventType::EscalationApplied,
        format!(
            "fuzzRounds {}->{}, stressDataSize {}->{}, perfRounds {}->{}, timeoutMs {}->{}",
            base.fuzz_rounds,
            escalated.fuzz_rounds,
            base.stress_data_size,
            escalated.stress_data_size,
            base.perf_rounds,
            escalated.perf_rounds,
            base.timeout_ms,
            escalated.timeout_ms
        ),
    )
}

pub fn evaluation_started(candidate: &Candidate, contract: &TaskContract) -> ArenaEvent {
    ArenaEvent::new(
        ArenaEventType::EvaluationStarted,
        format!("evaluating entry '{}'", contract.entry_name),
    )
    .with_candidate(candidate.name())
    .with_fingerprint(candidate.fingerprint())
}

pub fn candidate_passed(result: &CandidateResult) -> ArenaEvent {
    ArenaEvent::new(
        ArenaEventType::CandidatePassed,
        format!(
            "avgRuntimeMs={:.4} codeLines={} fuzzFailRate={:.3}",
            result.avg_runtime_ms, result.code_lines, result.fuzz_fail_rate
        ),
    )
    .with_candidate(&result.name)
}

pub fn candidate_eliminated(result: &CandidateResult) -> ArenaEvent {
    let details = match &result.elimination_reason {
        Some(reason) => reason.to_string(),
        None => "eliminated".to_string(),
    };
    ArenaEvent::new(ArenaEventType::CandidateEliminated, details).with_candidate(&result.name)
}

pub fn mutant_judged(file: &Path, line: usize, kind: &str, survived: bool) -> ArenaEvent {
    let event_type = if survived {
        ArenaEventType::MutantSurvived
    } else {
        ArenaEventType::MutantKilled
    };
    ArenaEvent::new(
        event_type,
        format!("{}:{} {}", file.display(), line, kind),
    )
}

pub fn restore_failed(file: &Path, details: &str) -> ArenaEvent {
    ArenaEvent::new(
        ArenaEventType::RestoreFailed,
        format!("{}: {}", file.display(), details),
    )
}

pub fn gate_decision(score: u32, min_score: u32, passed: bool) -> ArenaEvent {
    let event = ArenaEvent::new(
        ArenaEventType::GateDecision,
        format!(
            "mutation score {} (minimum {}): {}",
            score,
            min_score,
            if passed { "pass" } else { "fail" }
        ),
    );
    if passed {
        event.with_severity(EventSeverity::Low)
    } else {
        event.with_severity(EventSeverity::High)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::presets::TaskPresets;

    #[test]
    fn sink_stamps_run_and_task() {
        let sink = EventSink::for_run("run-1", "uag_score");
        let event = sink.stamp(run_finished(Some("b"), 1, 2));
        assert_eq!(event.run_id.as_deref(), Some("run-1"));
        assert_eq!(event.task.as_deref(), Some("uag_score"));
        assert!(event.details.contains("champion=b"));
    }

    #[test]
    fn fresh_sinks_get_distinct_run_ids() {
        let a = EventSink::new("t");
        let b = EventSink::new("t");
        assert_ne!(a.run_id(), b.run_id());
        assert_eq!(a.run_id().len(), 36);
    }

    #[test]
    fn evaluation_start_carries_fingerprint() {
        let candidate = Candidate::from_fn("c", "return 1;", |_| Ok(serde_json::json!(1)));
        let event = evaluation_started(&candidate, &TaskPresets::uag_score().contract);
        assert_eq!(event.candidate.as_deref(), Some("c"));
        assert_eq!(event.fingerprint.as_ref().map(String::len), Some(64));
        assert_eq!(event.severity, EventSeverity::Low);
    }

    #[test]
    fn audit_log_writes_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit").join("events.jsonl");
        let log = AuditLog::open(&path).unwrap();
        log.write(&restore_failed(Path::new("a.ts"), "bytes differ"));
        log.write(&gate_decision(40, 70, false));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event_type"], "restore_failed");
        assert_eq!(lines[0]["severity"], "critical");
        assert_eq!(lines[1]["severity"], "high");
    }
}

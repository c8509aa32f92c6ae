/// In-place mutation sessions
///
/// Each mutant is written over its file, judged by the verifier, and undone
/// before the next one is tried. The file is locked and snapshotted by a
/// [`RestoreGuard`] for the whole cycle, so a session leaves every file
/// byte-identical whether it returns `Ok`, returns `Err` or panics.
use crate::analysis::structure::is_code_line;
use crate::config::types::{ArenaError, Result};
use crate::mutation::rules::MutationKind;
use crate::mutation::targets::matches_extension;
use crate::mutation::verifier::{Verifier, VerifyStatus};
use crate::observability::events::{self, EventSink};
use crate::observability::metrics::ArenaMetrics;
use crate::safety::RestoreGuard;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationGranularity {
    /// One mutant per eligible line: the first rule that applies
    #[default]
    PerLine,
    /// One mutant per rule that applies to the line
    PerRule,
}

/// A single planned mutation: one line body replaced, the rest of the file untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutant {
    pub file: PathBuf,
    /// 1-based
    pub line: usize,
    pub kind: MutationKind,
    /// Byte range of the line body in the planned source, line ending excluded
    pub span: Range<usize>,
    pub mutated_line: String,
}

impl Mutant {
    /// `source` with this mutant spliced in; `source` must be the text it was planned from
    pub fn apply_to(&self, source: &str) -> String {
        let mut out = String::with_capacity(source.len() + 8);
        out.push_str(&source[..self.span.start]);
        out.push_str(&self.mutated_line);
        out.push_str(&source[self.span.end..]);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationRecord {
    pub file: String,
    pub line: usize,
    pub mutation_kind: MutationKind,
    pub survived: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationReport {
    pub total_mutants: u64,
    pub killed: u64,
    pub survived: u64,
    pub score: u32,
    pub survivors: Vec<MutationRecord>,
}

impl MutationReport {
    fn record(&mut self, mutant: &Mutant, survived: bool) {
        self.total_mutants += 1;
        if survived {
            self.survived += 1;
            self.survivors.push(MutationRecord {
                file: mutant.file.display().to_string(),
                line: mutant.line,
                mutation_kind: mutant.kind,
                survived: true,
            });
        } else {
            self.killed += 1;
        }
        self.score = kill_score(self.killed, self.total_mutants);
    }
}

/// Percentage of mutants killed, rounded; a session with no mutants scores 100
pub fn kill_score(killed: u64, total: u64) -> u32 {
    if total == 0 {
        return 100;
    }
    ((killed as f64 / total as f64) * 100.0).round() as u32
}

/// Every mutant `source` yields, in line order
pub fn plan_mutants(file: &Path, source: &str, granularity: MutationGranularity) -> Vec<Mutant> {
    let mut mutants = Vec::new();
    let mut offset = 0;

    for (index, raw) in source.split_inclusive('\n').enumerate() {
        let start = offset;
        offset += raw.len();

        let body = raw
            .strip_suffix("\r\n")
            .or_else(|| raw.strip_suffix('\n'))
            .unwrap_or(raw);
        if !is_code_line(body) {
            continue;
        }

        for kind in MutationKind::ALL {
            let Some(mutated) = kind.apply(body) else {
                continue;
            };
            mutants.push(Mutant {
                file: file.to_path_buf(),
                line: index + 1,
                kind,
                span: start..start + body.len(),
                mutated_line: mutated,
            });
            if granularity == MutationGranularity::PerLine {
                break;
            }
        }
    }
    mutants
}

pub struct MutationEngine<V: Verifier> {
    verifier: V,
    granularity: MutationGranularity,
    extensions: Vec<String>,
    metrics: ArenaMetrics,
    sink: EventSink,
    interrupt: Option<&'static AtomicBool>,
}

impl<V: Verifier> MutationEngine<V> {
    pub fn new(verifier: V) -> Self {
        Self {
            verifier,
            granularity: MutationGranularity::default(),
            extensions: Vec::new(),
            metrics: ArenaMetrics::new(),
            sink: EventSink::new("mutation"),
            interrupt: None,
        }
    }

    pub fn with_granularity(mut self, granularity: MutationGranularity) -> Self {
        self.granularity = granularity;
        self
    }

    /// Only files with one of these extensions are mutated; empty means all
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_sink(mut self, sink: EventSink) -> Self {
        self.sink = sink;
        self
    }

    /// Checked between cycles; once set the session stops with every file restored
    pub fn with_interrupt_flag(mut self, flag: &'static AtomicBool) -> Self {
        self.interrupt = Some(flag);
        self
    }

    pub fn metrics(&self) -> &ArenaMetrics {
        &self.metrics
    }

    pub fn mutate(&self, files: &[PathBuf]) -> Result<MutationReport> {
        let mut report = MutationReport {
            score: kill_score(0, 0),
            ..MutationReport::default()
        };

        for path in files {
            let Some(source) = self.load_target(path)? else {
                continue;
            };
            let mutants = plan_mutants(path, &source, self.granularity);
            debug!("{}: {} mutants planned", path.display(), mutants.len());

            for mutant in &mutants {
                if self.interrupted() {
                    warn!("interrupted after {} mutants", report.total_mutants);
                    return Err(ArenaError::Interrupted);
                }
                let survived = self.run_cycle(mutant, &source)?;
                self.metrics.record_mutant(survived);
                self.sink.emit(events::mutant_judged(
                    &mutant.file,
                    mutant.line,
                    mutant.kind.as_str(),
                    survived,
                ));
                report.record(mutant, survived);
            }
        }

        info!(
            "mutation score {}: {} killed, {} survived of {}",
            report.score, report.killed, report.survived, report.total_mutants
        );
        Ok(report)
    }

    fn interrupted(&self) -> bool {
        self.interrupt
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    fn load_target(&self, path: &Path) -> Result<Option<String>> {
        if !path.is_file() {
            warn!("skipping {}: not a file", path.display());
            return Ok(None);
        }
        if !matches_extension(path, &self.extensions) {
            warn!("skipping {}: extension not in filter", path.display());
            return Ok(None);
        }
        match String::from_utf8(std::fs::read(path)?) {
            Ok(source) => Ok(Some(source)),
            Err(_) => {
                warn!("skipping {}: not valid UTF-8", path.display());
                Ok(None)
            }
        }
    }

    /// Mutate, verify and restore; returns whether the mutant survived
    fn run_cycle(&self, mutant: &Mutant, planned_from: &str) -> Result<bool> {
        let mut guard = RestoreGuard::acquire(&mutant.file)?;
        if guard.original() != planned_from.as_bytes() {
            return Err(ArenaError::Lock(format!(
                "{} changed on disk during the mutation session",
                mutant.file.display()
            )));
        }

        guard.write(mutant.apply_to(planned_from).as_bytes())?;
        let verdict = self.verifier.verify(&mutant.file);
        if let Err(e) = guard.restore() {
            self.sink
                .emit(events::restore_failed(&mutant.file, &e.to_string()));
            return Err(e);
        }

        Ok(verdict? == VerifyStatus::Passed)
    }
}

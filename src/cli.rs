use crate::arena::escalation::HellMode;
use crate::arena::pipeline::{Arena, ArenaOptions};
use crate::arena::result::ArenaResult;
use crate::config::presets::InterpreterPresets;
use crate::config::registry::TaskRegistry;
use crate::config::types::ArenaError;
use crate::core::oracle::ReferenceOracle;
use crate::core::runner::CandidateRunner;
use crate::judge::loader::load_candidates;
use crate::mutation::engine::{MutationEngine, MutationGranularity};
use crate::mutation::gate::MutationGate;
use crate::mutation::targets::{self, parse_extensions};
use crate::mutation::verifier::CommandVerifier;
use crate::observability::events;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Extra wall time a command-backed candidate gets beyond its deadline
const WALL_LIMIT_GRACE_MS: u64 = 500;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every candidate in a directory against a task
    Run {
        /// Task key, e.g. uag_score
        task: String,
        /// Directory of candidate files
        #[arg(long)]
        candidates: PathBuf,
        /// Candidate file extension; selects the interpreter
        #[arg(long, default_value = "js")]
        ext: String,
        /// JSON task file merged over the built-in presets
        #[arg(long)]
        tasks: Option<PathBuf>,
        /// JSON array of reference cases
        #[arg(long)]
        oracle: Option<PathBuf>,
        /// Run a baseline pass, then crown the champion under Hell Mode
        #[arg(long)]
        hell: bool,
        /// Fixed generator seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,
        /// Extra factor on every generated set
        #[arg(long, default_value_t = 1)]
        rounds: u64,
        /// Evaluate candidates concurrently (perf timings may interfere)
        #[arg(long)]
        parallel: bool,
        /// Append structured events to this JSON-lines file
        #[arg(long)]
        audit_log: Option<PathBuf>,
        /// Write Prometheus-format metrics to this file
        #[arg(long)]
        metrics: Option<PathBuf>,
        #[arg(long, env = "ARENA_RESULTS_DIR", default_value = "results")]
        results_dir: PathBuf,
    },
    /// List known tasks
    Tasks {
        #[arg(long)]
        tasks: Option<PathBuf>,
    },
    /// Mutation-test a verification command against source files
    Mutate {
        /// Files to mutate
        #[arg(long, num_args = 1.., conflicts_with = "git_diff")]
        files: Vec<PathBuf>,
        /// Mutate the files changed relative to HEAD
        #[arg(long)]
        git_diff: bool,
        /// Repository root; verification runs here
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        /// Shell command whose exit status judges each mutant
        #[arg(long, default_value = "npm run typecheck")]
        command: String,
        /// Comma separated extensions eligible for mutation
        #[arg(long, default_value = targets::DEFAULT_EXTENSIONS)]
        ext: String,
        /// One mutant per matching rule instead of one per line
        #[arg(long)]
        per_rule: bool,
        #[arg(long, default_value_t = crate::mutation::gate::DEFAULT_MIN_SCORE)]
        min_score: u32,
        /// Kill a verification run after this many seconds (counts as a kill)
        #[arg(long)]
        verify_timeout: Option<u64>,
        /// Write the mutation report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
        #[arg(long)]
        audit_log: Option<PathBuf>,
    },
}

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn interrupt_handler(_sig: i32) {
    // Only an atomic store: the session stops after restoring the current file
    INTERRUPTED.store(true, Ordering::SeqCst);
}

fn setup_interrupt_handlers() {
    unsafe {
        libc::signal(libc::SIGTERM, interrupt_handler as usize);
        libc::signal(libc::SIGINT, interrupt_handler as usize);
    }
}

/// Execute a parsed command line; the value is the process exit code
pub fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Run {
            task,
            candidates,
            ext,
            tasks,
            oracle,
            hell,
            seed,
            rounds,
            parallel,
            audit_log,
            metrics,
            results_dir,
        } => {
            if let Some(path) = &audit_log {
                events::init_audit_log(path)?;
            }
            let registry = load_registry(tasks.as_deref())?;
            let spec = registry.get(&task)?.clone();

            let oracle = load_oracle(oracle.as_deref(), &task)?;

            let interpreters = InterpreterPresets::new();
            let allowance = interpreters
                .get(&ext)
                .map(|p| p.startup_overhead_ms)
                .unwrap_or(0);
            let wall_limit =
                spec.contract.timeout() + Duration::from_millis(allowance + WALL_LIMIT_GRACE_MS);
            let cohort = load_candidates(
                &candidates,
                &ext,
                &spec.contract.entry_name,
                &interpreters,
                wall_limit,
            )?;
            if cohort.is_empty() {
                return Err(ArenaError::Config(format!(
                    "no '.{}' candidates in {}",
                    ext.trim_start_matches('.'),
                    candidates.display()
                ))
                .into());
            }

            let arena = Arena::new(task.clone(), spec, oracle)
                .with_runner(CandidateRunner::new().with_startup_allowance(allowance))
                .with_options(ArenaOptions {
                    round_multiplier: rounds,
                    seed,
                    parallel,
                });

            let hell = hell || HellMode::requested_by_env();
            let (champion, document) = if hell {
                let outcome = arena.run_escalated(&cohort, &HellMode::default())?;
                report_leaderboard("baseline", &outcome.baseline);
                report_leaderboard("hell mode", &outcome.escalated);
                (
                    outcome.champion().map(str::to_string),
                    serde_json::to_string_pretty(&outcome)?,
                )
            } else {
                let outcome = arena.run(&cohort)?;
                report_leaderboard("arena", &outcome);
                (outcome.champion.clone(), serde_json::to_string_pretty(&outcome)?)
            };

            let path = write_results(&results_dir, &task, &document)?;
            println!("results written to {}", path.display());
            if let Some(metrics_path) = &metrics {
                std::fs::write(metrics_path, arena.metrics().export_prometheus())
                    .with_context(|| format!("writing metrics to {}", metrics_path.display()))?;
            }

            match champion {
                Some(name) => {
                    println!("champion: {}", name);
                    Ok(0)
                }
                None => {
                    println!("no champion: every candidate was eliminated");
                    Ok(1)
                }
            }
        }
        Commands::Tasks { tasks } => {
            let registry = load_registry(tasks.as_deref())?;
            for key in registry.keys() {
                let spec = registry.get(key)?;
                let c = &spec.contract;
                println!(
                    "{:<20} entry={} timeoutMs={} fuzzRounds={} stressDataSize={} perfRounds={}",
                    key, c.entry_name, c.timeout_ms, c.fuzz_rounds, c.stress_data_size, c.perf_rounds
                );
            }
            Ok(0)
        }
        Commands::Mutate {
            files,
            git_diff,
            repo,
            command,
            ext,
            per_rule,
            min_score,
            verify_timeout,
            report,
            audit_log,
        } => {
            if let Some(path) = &audit_log {
                events::init_audit_log(path)?;
            }
            let extensions = parse_extensions(&ext);
            let files = if git_diff {
                targets::changed_files(&repo)?
                    .into_iter()
                    .filter(|f| targets::matches_extension(f, &extensions))
                    .collect()
            } else {
                files
            };
            if files.is_empty() {
                warn!("no files to mutate");
            }

            let mut verifier = CommandVerifier::new(command).with_working_dir(repo.clone());
            if let Some(secs) = verify_timeout {
                verifier = verifier.with_timeout(Duration::from_secs(secs));
            }
            let granularity = if per_rule {
                MutationGranularity::PerRule
            } else {
                MutationGranularity::PerLine
            };

            setup_interrupt_handlers();
            let engine = MutationEngine::new(verifier)
                .with_granularity(granularity)
                .with_extensions(extensions)
                .with_interrupt_flag(&INTERRUPTED);
            let outcome = engine.mutate(&files)?;

            for survivor in &outcome.survivors {
                println!(
                    "survived: {}:{} {}",
                    survivor.file, survivor.line, survivor.mutation_kind
                );
            }
            println!(
                "mutation score {} ({} killed / {} total)",
                outcome.score, outcome.killed, outcome.total_mutants
            );
            if let Some(path) = &report {
                std::fs::write(path, serde_json::to_string_pretty(&outcome)?)
                    .with_context(|| format!("writing report to {}", path.display()))?;
            }

            let decision = MutationGate::new(min_score).evaluate(&outcome);
            Ok(if decision.is_pass() { 0 } else { 1 })
        }
    }
}

fn load_registry(tasks: Option<&Path>) -> crate::config::types::Result<TaskRegistry> {
    let mut registry = TaskRegistry::with_presets();
    if let Some(path) = tasks {
        let loaded = registry.load_from_file(path)?;
        info!("loaded {} tasks from {}", loaded, path.display());
    }
    Ok(registry)
}

/// Without reference cases every candidate would pass the correctness check
fn load_oracle(path: Option<&Path>, task: &str) -> crate::config::types::Result<ReferenceOracle> {
    let Some(path) = path else {
        return Err(ArenaError::Config(format!(
            "task '{}' needs reference cases: pass --oracle <file>",
            task
        )));
    };
    let oracle = ReferenceOracle::load_from_file(path)?;
    if oracle.is_empty() {
        return Err(ArenaError::Config(format!(
            "oracle file {} has no reference cases",
            path.display()
        )));
    }
    info!("loaded {} reference cases from {}", oracle.len(), path.display());
    Ok(oracle)
}

fn report_leaderboard(label: &str, result: &ArenaResult) {
    info!(
        "{}: {}/{} candidates survived",
        label,
        result.survivors(),
        result.candidates.len()
    );
    for (rank, entry) in result.leaderboard.iter().enumerate() {
        info!(
            "  #{} {} score={} avgRuntimeMs={:.3} codeLines={}",
            rank + 1,
            entry.name,
            entry.score,
            entry.avg_runtime_ms,
            entry.code_lines
        );
    }
    for entry in result.eliminated() {
        let reason = entry
            .elimination_reason
            .as_ref()
            .map(|r| r.to_string())
            .unwrap_or_default();
        info!("  eliminated {}: {}", entry.name, reason);
    }
}

fn write_results(dir: &Path, task: &str, document: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating results directory {}", dir.display()))?;
    let path = dir.join(format!(
        "{}-{}.json",
        task,
        chrono::Utc::now().timestamp_millis()
    ));
    std::fs::write(&path, document).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutate_defaults() {
        let cli = Cli::try_parse_from(["arena", "mutate", "--files", "src/a.ts"]).unwrap();
        match cli.command {
            Commands::Mutate {
                files,
                command,
                ext,
                min_score,
                per_rule,
                ..
            } => {
                assert_eq!(files, vec![PathBuf::from("src/a.ts")]);
                assert_eq!(command, "npm run typecheck");
                assert_eq!(ext, "ts,tsx");
                assert_eq!(min_score, 70);
                assert!(!per_rule);
            }
            _ => panic!("expected mutate"),
        }
    }

    #[test]
    fn files_conflict_with_git_diff() {
        assert!(Cli::try_parse_from(["arena", "mutate", "--files", "a.ts", "--git-diff"]).is_err());
    }

    #[test]
    fn run_requires_candidates() {
        assert!(Cli::try_parse_from(["arena", "run", "uag_score"]).is_err());
        let cli = Cli::try_parse_from([
            "arena", "run", "uag_score", "--candidates", "c", "--seed", "7", "--hell",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Run { seed: Some(7), hell: true, .. }
        ));
    }

    #[test]
    fn run_without_oracle_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let candidates = dir.path().join("candidates");
        std::fs::create_dir(&candidates).unwrap();
        std::fs::write(candidates.join("flat.sh"), "echo 50\n").unwrap();
        let results = dir.path().join("results");

        let cli = Cli::try_parse_from([
            "arena",
            "run",
            "uag_score",
            "--ext",
            "sh",
            "--candidates",
            candidates.to_str().unwrap(),
            "--results-dir",
            results.to_str().unwrap(),
        ])
        .unwrap();
        let err = run(cli).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ArenaError>(),
            Some(ArenaError::Config(msg)) if msg.contains("--oracle")
        ));
        assert!(!results.exists());
    }

    #[test]
    fn empty_oracle_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oracle.json");
        std::fs::write(&path, "[]").unwrap();
        assert!(matches!(
            load_oracle(Some(&path), "uag_score"),
            Err(ArenaError::Config(_))
        ));
        assert!(matches!(load_oracle(None, "uag_score"), Err(ArenaError::Config(_))));
    }

    #[test]
    fn results_file_is_named_by_task() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_results(&dir.path().join("results"), "uag_score", "{}").unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("uag_score-") && name.ends_with(".json"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "{}");
    }
}

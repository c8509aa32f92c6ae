/// Candidates backed by an interpreter process
///
/// Protocol: the candidate file is run as `program [args..] <file>` with the
/// input JSON on stdin (newline terminated) and the task entry name in
/// `ARENA_ENTRY`. It must print one JSON value on stdout and exit 0.
///
/// Each invocation gets its own process group. When the wall limit passes
/// the whole group is sent `SIGKILL`, so an invocation the runner has
/// already abandoned still cannot outlive its budget.
use crate::config::presets::InterpreterPreset;
use crate::core::candidate::EntryPoint;
use crate::core::types::CandidateFault;
use log::{debug, warn};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use serde_json::Value;
use std::io::{Read, Write};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(2);
const STDERR_TAIL: usize = 400;

#[derive(Debug, Clone)]
pub struct CommandEntryPoint {
    program: String,
    args: Vec<String>,
    file: PathBuf,
    entry_name: String,
    wall_limit: Duration,
}

impl CommandEntryPoint {
    pub fn new(
        preset: &InterpreterPreset,
        file: &Path,
        entry_name: &str,
        wall_limit: Duration,
    ) -> Self {
        Self {
            program: preset.program.clone(),
            args: preset.args.clone(),
            file: file.to_path_buf(),
            entry_name: entry_name.to_string(),
            wall_limit,
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    fn spawn(&self) -> Result<Child, CandidateFault> {
        Command::new(&self.program)
            .args(&self.args)
            .arg(&self.file)
            .env("ARENA_ENTRY", &self.entry_name)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .spawn()
            .map_err(|e| {
                CandidateFault::Raised(format!("failed to start '{}': {}", self.program, e))
            })
    }
}

fn drain<R: Read + Send + 'static>(source: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut source) = source {
            let _ = source.read_to_end(&mut buf);
        }
        buf
    })
}

fn kill_group(child: &mut Child) {
    let pgid = Pid::from_raw(child.id() as i32);
    if let Err(e) = killpg(pgid, Signal::SIGKILL) {
        debug!("killpg({}) failed: {}; killing leader only", pgid, e);
        let _ = child.kill();
    }
    let _ = child.wait();
}

fn parse_output(stdout: &[u8]) -> Result<Value, CandidateFault> {
    let text = String::from_utf8_lossy(stdout);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CandidateFault::InvalidOutput("no output on stdout".to_string()));
    }
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }
    // Diagnostic lines before the result are tolerated
    let last = trimmed.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
    serde_json::from_str(last.trim())
        .map_err(|e| CandidateFault::InvalidOutput(format!("stdout is not JSON: {}", e)))
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let start = text
        .char_indices()
        .rev()
        .nth(STDERR_TAIL)
        .map(|(i, _)| i)
        .unwrap_or(0);
    text[start..].to_string()
}

impl EntryPoint for CommandEntryPoint {
    fn invoke(&self, input: &Value) -> Result<Value, CandidateFault> {
        let payload = serde_json::to_vec(input)
            .map_err(|e| CandidateFault::InvalidOutput(format!("input not serialisable: {}", e)))?;

        let mut child = self.spawn()?;
        let started = Instant::now();

        let stdin = child.stdin.take();
        let writer = thread::spawn(move || {
            if let Some(mut stdin) = stdin {
                // A candidate that exits without reading closes the pipe
                let _ = stdin.write_all(&payload).and_then(|_| stdin.write_all(b"\n"));
            }
        });
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if started.elapsed() >= self.wall_limit => {
                    warn!(
                        "{} exceeded wall limit {:?}; killing process group",
                        self.file.display(),
                        self.wall_limit
                    );
                    kill_group(&mut child);
                    let _ = writer.join();
                    let _ = stdout.join();
                    let _ = stderr.join();
                    return Err(CandidateFault::Raised(format!(
                        "wall limit of {:?} exceeded",
                        self.wall_limit
                    )));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    kill_group(&mut child);
                    return Err(CandidateFault::Raised(format!("wait failed: {}", e)));
                }
            }
        };

        let _ = writer.join();
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if !status.success() {
            let code = status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(CandidateFault::Raised(format!(
                "exited with {}: {}",
                code,
                stderr_tail(&stderr)
            )));
        }
        parse_output(&stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::presets::InterpreterPresets;
    use serde_json::json;

    fn script(body: &str, wall_limit: Duration) -> (tempfile::TempDir, CommandEntryPoint) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("candidate.sh");
        std::fs::write(&path, body).unwrap();
        let presets = InterpreterPresets::new();
        let entry = CommandEntryPoint::new(
            presets.get("sh").unwrap(),
            &path,
            "calculateUAGScore",
            wall_limit,
        );
        (dir, entry)
    }

    #[test]
    fn stdin_to_stdout_round_trip() {
        let (_dir, entry) = script(
            "read input || true\necho \"$((input * 2))\"\n",
            Duration::from_secs(5),
        );
        assert_eq!(entry.invoke(&json!(2)).unwrap(), json!(4));
    }

    #[test]
    fn entry_name_is_exported() {
        let (_dir, entry) = script("printf '\"%s\"' \"$ARENA_ENTRY\"\n", Duration::from_secs(5));
        assert_eq!(entry.invoke(&json!(null)).unwrap(), json!("calculateUAGScore"));
    }

    #[test]
    fn diagnostics_before_result_are_tolerated() {
        let (_dir, entry) = script("echo debugging\necho '{\"ok\": true}'\n", Duration::from_secs(5));
        assert_eq!(entry.invoke(&json!(1)).unwrap(), json!({"ok": true}));
    }

    #[test]
    fn nonzero_exit_is_raised_with_stderr() {
        let (_dir, entry) = script("echo 'cannot read null' >&2\nexit 2\n", Duration::from_secs(5));
        match entry.invoke(&json!(null)) {
            Err(CandidateFault::Raised(msg)) => {
                assert!(msg.contains("exited with 2"));
                assert!(msg.contains("cannot read null"));
            }
            other => panic!("expected raised fault, got {:?}", other),
        }
    }

    #[test]
    fn garbage_output_is_invalid() {
        let (_dir, entry) = script("echo not json\n", Duration::from_secs(5));
        assert!(matches!(
            entry.invoke(&json!(1)),
            Err(CandidateFault::InvalidOutput(_))
        ));
    }

    #[test]
    fn wall_limit_kills_process_group() {
        let (_dir, entry) = script("sleep 10 &\nsleep 10\n", Duration::from_millis(150));
        let started = Instant::now();
        assert!(matches!(entry.invoke(&json!(1)), Err(CandidateFault::Raised(_))));
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}

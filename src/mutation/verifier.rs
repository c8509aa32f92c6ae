/// Verification commands run against a mutated tree
use crate::config::types::{ArenaError, Result};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyStatus {
    /// The verification still passes: the mutant survived
    Passed,
    /// The verification caught the mutant
    Failed,
}

/// Judges whether the current on-disk state passes verification
///
/// `Err` means the verifier itself could not run, which aborts the session.
pub trait Verifier {
    fn verify(&self, mutated_file: &Path) -> Result<VerifyStatus>;
}

impl<F> Verifier for F
where
    F: Fn(&Path) -> Result<VerifyStatus>,
{
    fn verify(&self, mutated_file: &Path) -> Result<VerifyStatus> {
        self(mutated_file)
    }
}

/// Runs a shell command; exit status 0 means the mutant survived
#[derive(Debug, Clone)]
pub struct CommandVerifier {
    command: String,
    working_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl CommandVerifier {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            working_dir: None,
            timeout: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// A command still running after `timeout` is killed and counts as a kill
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Verifier for CommandVerifier {
    fn verify(&self, mutated_file: &Path) -> Result<VerifyStatus> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&self.command)
            .env("ARENA_MUTANT_FILE", mutated_file)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            ArenaError::Verifier(format!("failed to run '{}': {}", self.command, e))
        })?;

        let Some(timeout) = self.timeout else {
            let status = child.wait()?;
            sweep_group(&child);
            return Ok(status_of(status.success()));
        };

        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                sweep_group(&child);
                return Ok(status_of(status.success()));
            }
            if started.elapsed() >= timeout {
                log::warn!(
                    "verification '{}' exceeded {:?}; counting mutant as killed",
                    self.command,
                    timeout
                );
                kill_group(&mut child);
                return Ok(VerifyStatus::Failed);
            }
            thread::sleep(Duration::from_millis(20));
        }
    }
}

// Nothing started by one verification may outlive it into the next cycle
fn sweep_group(child: &Child) {
    let pgid = Pid::from_raw(child.id() as i32);
    if killpg(pgid, Signal::SIGKILL).is_ok() {
        log::debug!("killed leftover processes in group {}", pgid);
    }
}

fn kill_group(child: &mut Child) {
    let pgid = Pid::from_raw(child.id() as i32);
    if let Err(e) = killpg(pgid, Signal::SIGKILL) {
        log::debug!("killpg({}) failed: {}; killing leader only", pgid, e);
        let _ = child.kill();
    }
    let _ = child.wait();
}

fn status_of(success: bool) -> VerifyStatus {
    if success {
        VerifyStatus::Passed
    } else {
        VerifyStatus::Failed
    }
}

/// Advisory exclusive locks on the files being mutated
///
/// The lock is taken on the target file itself and is released when the
/// handle is closed. Other cooperating processes see `EWOULDBLOCK` until then.
use crate::config::types::{ArenaError, Result};
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

const RETRY_INTERVAL: Duration = Duration::from_millis(25);

/// Default time to wait for a contended lock
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Open `path` read-write and take an exclusive `flock`, retrying until `wait` expires
    pub fn acquire(path: &Path, wait: Duration) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let started = Instant::now();

        loop {
            let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
            if rc == 0 {
                log::debug!("locked {}", path.display());
                return Ok(Self {
                    file,
                    path: path.to_path_buf(),
                });
            }

            let err = std::io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EWOULDBLOCK) if started.elapsed() < wait => {
                    thread::sleep(RETRY_INTERVAL);
                }
                Some(libc::EWOULDBLOCK) => {
                    return Err(ArenaError::Lock(format!(
                        "{} is locked by another process (waited {:?})",
                        path.display(),
                        wait
                    )));
                }
                _ => {
                    return Err(ArenaError::Lock(format!(
                        "failed to lock {}: {}",
                        path.display(),
                        err
                    )));
                }
            }
        }
    }

    pub fn file(&mut self) -> &mut File {
        &mut self.file
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_lock_on_same_file_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target.ts");
        std::fs::write(&path, "const a = 1;\n").unwrap();

        let _held = FileLock::acquire(&path, DEFAULT_LOCK_WAIT).unwrap();
        let second = FileLock::acquire(&path, Duration::from_millis(60));
        assert!(matches!(second, Err(ArenaError::Lock(_))));
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target.ts");
        std::fs::write(&path, "x").unwrap();

        drop(FileLock::acquire(&path, DEFAULT_LOCK_WAIT).unwrap());
        assert!(FileLock::acquire(&path, Duration::from_millis(60)).is_ok());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileLock::acquire(&dir.path().join("absent"), DEFAULT_LOCK_WAIT);
        assert!(matches!(result, Err(ArenaError::Io(_))));
    }
}

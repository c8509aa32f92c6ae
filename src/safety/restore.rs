/// Snapshot-and-restore guard for in-place source mutation
///
/// The guard holds the file's exclusive lock and its original bytes for one
/// mutate-verify cycle. [`RestoreGuard::restore`] writes the original back
/// and proves it by re-reading the file. If the guard is dropped without a
/// successful restore (early return, `?`, panic), `Drop` writes the original
/// back as a last resort.
use crate::config::types::{ArenaError, Result};
use crate::observability::events;
use crate::safety::file_lock::{FileLock, DEFAULT_LOCK_WAIT};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

pub struct RestoreGuard {
    lock: FileLock,
    original: Vec<u8>,
    restored: bool,
}

impl RestoreGuard {
    /// Lock `path` and snapshot its contents
    pub fn acquire(path: &Path) -> Result<Self> {
        let mut lock = FileLock::acquire(path, DEFAULT_LOCK_WAIT)?;
        let mut original = Vec::new();
        lock.file().read_to_end(&mut original)?;
        Ok(Self {
            lock,
            original,
            restored: false,
        })
    }

    pub fn original(&self) -> &[u8] {
        &self.original
    }

    pub fn path(&self) -> &Path {
        self.lock.path()
    }

    /// Replace the file's contents with `content`
    pub fn write(&mut self, content: &[u8]) -> Result<()> {
        self.restored = false;
        overwrite(&mut self.lock, content)?;
        Ok(())
    }

    /// Write the snapshot back and verify it byte for byte
    pub fn restore(mut self) -> Result<()> {
        let path = self.lock.path().to_path_buf();
        let restore_err = |details: String| ArenaError::Restore {
            path: path.display().to_string(),
            details,
        };

        overwrite(&mut self.lock, &self.original)
            .map_err(|e| restore_err(format!("write failed: {}", e)))?;
        let on_disk =
            std::fs::read(&path).map_err(|e| restore_err(format!("re-read failed: {}", e)))?;
        if on_disk != self.original {
            return Err(restore_err(format!(
                "content differs after restore ({} bytes on disk, {} expected)",
                on_disk.len(),
                self.original.len()
            )));
        }

        self.restored = true;
        Ok(())
    }
}

fn overwrite(lock: &mut FileLock, content: &[u8]) -> std::io::Result<()> {
    let file = lock.file();
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(content)?;
    file.sync_data()
}

impl Drop for RestoreGuard {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        let original = std::mem::take(&mut self.original);
        match overwrite(&mut self.lock, &original) {
            Ok(()) => log::warn!(
                "{} restored by drop guard after an interrupted cycle",
                self.lock.path().display()
            ),
            Err(e) => {
                events::log_event(&events::restore_failed(self.lock.path(), &e.to_string()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "if (a < b) {\n  return a + b;\n}\n";

    fn fixture() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calc.ts");
        std::fs::write(&path, SOURCE).unwrap();
        (dir, path)
    }

    #[test]
    fn explicit_restore_verifies_contents() {
        let (_dir, path) = fixture();
        let mut guard = RestoreGuard::acquire(&path).unwrap();
        guard.write(b"if (a <= b) {}\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "if (a <= b) {}\n");

        guard.restore().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), SOURCE);
    }

    #[test]
    fn drop_restores_after_early_return() {
        let (_dir, path) = fixture();
        let attempt = || -> Result<()> {
            let mut guard = RestoreGuard::acquire(&path)?;
            guard.write(b"broken")?;
            Err(ArenaError::Verifier("spawn failed".to_string()))
        };
        assert!(attempt().is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), SOURCE);
    }

    #[test]
    fn drop_restores_after_panic() {
        let (_dir, path) = fixture();
        let path_clone = path.clone();
        let outcome = std::panic::catch_unwind(move || {
            let mut guard = RestoreGuard::acquire(&path_clone).unwrap();
            guard.write(b"mutated").unwrap();
            panic!("verifier crashed");
        });
        assert!(outcome.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), SOURCE);
    }

    #[test]
    fn original_snapshot_is_exact_bytes() {
        let (_dir, path) = fixture();
        let guard = RestoreGuard::acquire(&path).unwrap();
        assert_eq!(guard.original(), SOURCE.as_bytes());
        assert_eq!(guard.path(), path.as_path());
        guard.restore().unwrap();
    }
}

//! File safety for in-place mutation.

pub mod file_lock;
pub mod restore;

pub use file_lock::FileLock;
pub use restore::RestoreGuard;

//! Selecting which files a mutation session touches.

use crate::config::types::{ArenaError, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Extensions mutated when the caller does not choose, in `--ext` form
pub const DEFAULT_EXTENSIONS: &str = "ts,tsx";

/// Parse a comma separated list such as `"ts, .tsx"` into bare extensions
pub fn parse_extensions(list: &str) -> Vec<String> {
    list.split(',')
        .map(|e| e.trim().trim_start_matches('.'))
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

/// An empty filter matches every path
pub fn matches_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| extensions.iter().any(|want| want == ext))
        .unwrap_or(false)
}

/// Files changed relative to `HEAD` in the repository at `repo`
pub fn changed_files(repo: &Path) -> Result<Vec<PathBuf>> {
    let output = Command::new("git")
        .args(["diff", "--name-only", "HEAD"])
        .current_dir(repo)
        .output()
        .map_err(|e| ArenaError::Config(format!("failed to run git in {}: {}", repo.display(), e)))?;

    if !output.status.success() {
        return Err(ArenaError::Config(format!(
            "git diff failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(parse_name_list(repo, &String::from_utf8_lossy(&output.stdout)))
}

fn parse_name_list(repo: &Path, stdout: &str) -> Vec<PathBuf> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| repo.join(l))
        .collect()
}

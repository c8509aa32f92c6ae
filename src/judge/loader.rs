use crate::config::presets::InterpreterPresets;
use crate::config::types::{ArenaError, Result};
use crate::core::candidate::Candidate;
use crate::judge::command::CommandEntryPoint;
use log::info;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Build one command-backed candidate per `*.{extension}` file in `dir`
///
/// Candidates are named by file stem and returned sorted by name so run
/// order does not depend on directory iteration order.
pub fn load_candidates(
    dir: &Path,
    extension: &str,
    entry_name: &str,
    interpreters: &InterpreterPresets,
    wall_limit: Duration,
) -> Result<Vec<Candidate>> {
    let extension = extension.trim_start_matches('.');
    let preset = interpreters.get(extension).ok_or_else(|| {
        ArenaError::Config(format!(
            "no interpreter for '.{}' candidates (known: {})",
            extension,
            interpreters.extensions().join(", ")
        ))
    })?;

    let entries = std::fs::read_dir(dir).map_err(|e| {
        ArenaError::Config(format!(
            "cannot read candidate directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    let mut candidates = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let source = std::fs::read_to_string(&path)?;
        let entry_point = CommandEntryPoint::new(preset, &path, entry_name, wall_limit);
        candidates.push(Candidate::new(name, source, Arc::new(entry_point)));
    }

    candidates.sort_by(|a, b| a.name().cmp(b.name()));
    info!(
        "loaded {} '.{}' candidates from {} via {}",
        candidates.len(),
        extension,
        dir.display(),
        preset.program
    );
    Ok(candidates)
}

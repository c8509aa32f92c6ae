/// Task registry: task key -> contract, input schema, representative input
use crate::config::presets::TaskPresets;
use crate::config::types::{ArenaError, Result, TaskContract};
use crate::config::validator;
use crate::generator::schema::InputSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Everything the arena needs to know about one task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    pub contract: TaskContract,
    pub schema: InputSchema,
    /// Fixed input for perf trials; generated representative records when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perf_input: Option<Value>,
}

#[derive(Clone, Debug, Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, TaskSpec>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in task presets
    pub fn with_presets() -> Self {
        let mut registry = Self::new();
        for (key, spec) in TaskPresets::all() {
            registry.insert(key, spec);
        }
        registry
    }

    pub fn insert(&mut self, key: impl Into<String>, spec: TaskSpec) {
        self.tasks.insert(key.into(), spec);
    }

    pub fn get(&self, key: &str) -> Result<&TaskSpec> {
        self.tasks
            .get(key)
            .ok_or_else(|| ArenaError::UnknownTask(key.to_string()))
    }

    /// Task keys in sorted order
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.tasks.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Merge a JSON object of `{ "<task>": TaskSpec, ... }` into the registry
    ///
    /// Keys already present are replaced by the file's definition. Every task
    /// is validated before any of them is inserted.
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ArenaError::Config(format!("Failed to read task file {}: {}", path.display(), e))
        })?;
        let tasks: HashMap<String, TaskSpec> = serde_json::from_str(&content)
            .map_err(|e| ArenaError::Config(format!("Failed to parse task JSON: {}", e)))?;

        for (key, spec) in &tasks {
            validator::validate_task(key, spec)?;
        }
        let count = tasks.len();
        for (key, spec) in tasks {
            log::debug!("Loaded task '{}' from {}", key, path.display());
            self.tasks.insert(key, spec);
        }
        Ok(count)
    }
}

/// Built-in task definitions and candidate interpreter presets
///
/// Task presets are immutable. A task file loaded through
/// [`crate::config::registry::TaskRegistry::load_from_file`] may shadow one
/// by key, but never edits it in place.
use crate::config::registry::TaskSpec;
use crate::config::types::TaskContract;
use crate::generator::schema::{FieldKind, FieldSpec, InputSchema};
use serde_json::json;
use std::collections::HashMap;

pub struct TaskPresets;

impl TaskPresets {
    pub fn all() -> Vec<(String, TaskSpec)> {
        vec![("uag_score".to_string(), Self::uag_score())]
    }

    /// Listing trust score: verification flags, responsiveness and review history
    pub fn uag_score() -> TaskSpec {
        let fields = vec![
            FieldSpec::new("hasVerifiedOwner", FieldKind::Bool),
            FieldSpec::new("hasRealPhotos", FieldKind::Bool),
            FieldSpec::new("hasPriceHistory", FieldKind::Bool),
            FieldSpec::new(
                "responseTimeHours",
                FieldKind::Number {
                    min: 0.0,
                    max: 72.0,
                },
            ),
            FieldSpec::new("reviewCount", FieldKind::Integer { min: 0, max: 100 }),
            FieldSpec::new("avgRating", FieldKind::Number { min: 1.0, max: 5.0 }),
            FieldSpec::new("listingAgeDays", FieldKind::Integer { min: 0, max: 365 }),
            FieldSpec::new(
                "updateFrequency",
                FieldKind::Number {
                    min: 0.0,
                    max: 10.0,
                },
            ),
        ];

        TaskSpec {
            contract: TaskContract {
                entry_name: "calculateUAGScore".to_string(),
                timeout_ms: 100,
                perf_rounds: 100,
                fuzz_rounds: 200,
                stress_data_size: 1000,
                max_function_lines: 50,
                max_nesting_depth: 4,
            },
            schema: InputSchema::Record { fields },
            perf_input: Some(json!({
                "hasVerifiedOwner": true,
                "hasRealPhotos": true,
                "avgRating": 4.5,
                "responseTimeHours": 2,
                "reviewCount": 10
            })),
        }
    }
}

/// How a command-backed candidate file is executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterPreset {
    /// File extension without the dot
    pub extension: String,
    pub program: String,
    /// Arguments placed before the candidate path
    pub args: Vec<String>,
    /// Startup cost to budget on top of the contract timeout
    pub startup_overhead_ms: u64,
}

/// Extension -> interpreter registry used by the directory loader
pub struct InterpreterPresets {
    presets: HashMap<String, InterpreterPreset>,
}

impl InterpreterPresets {
    pub fn new() -> Self {
        let mut registry = Self {
            presets: HashMap::new(),
        };
        registry.register("ts", "npx", &["tsx"], 800);
        registry.register("js", "node", &[], 60);
        registry.register("mjs", "node", &[], 60);
        registry.register("py", "python3", &["-B"], 40);
        registry.register("sh", "sh", &[], 5);
        registry
    }

    fn register(&mut self, extension: &str, program: &str, args: &[&str], overhead_ms: u64) {
        self.presets.insert(
            extension.to_string(),
            InterpreterPreset {
                extension: extension.to_string(),
                program: program.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
                startup_overhead_ms: overhead_ms,
            },
        );
    }

    pub fn get(&self, extension: &str) -> Option<&InterpreterPreset> {
        self.presets.get(extension.trim_start_matches('.'))
    }

    pub fn extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.presets.keys().map(String::as_str).collect();
        exts.sort_unstable();
        exts
    }
}

impl Default for InterpreterPresets {
    fn default() -> Self {
        Self::new()
    }
}

// Startup validation for contracts, schemas and scoring configuration.
// Invalid configuration refuses to run; warnings are logged and carried along.

use crate::arena::escalation::HellMode;
use crate::config::registry::TaskSpec;
use crate::config::types::{ArenaError, EliminationPolicy, Result, ScoringWeights, TaskContract};
use crate::generator::schema::{FieldKind, InputSchema};

/// Validation result with detailed errors
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: String) {
        self.valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    fn merge(&mut self, other: ValidationResult) {
        if !other.valid {
            self.valid = false;
        }
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Convert into a harness error when any check failed
    pub fn into_result(self) -> Result<ValidationResult> {
        if self.valid {
            for warning in &self.warnings {
                log::warn!("{}", warning);
            }
            Ok(self)
        } else {
            Err(ArenaError::Config(format!(
                "validation failed:\n{}",
                self.errors.join("\n")
            )))
        }
    }
}

pub fn validate_contract(contract: &TaskContract) -> ValidationResult {
    let mut result = ValidationResult::new();

    if contract.entry_name.trim().is_empty() {
        result.add_error("entryName cannot be empty".to_string());
    }

    for (name, value) in [
        ("timeoutMs", contract.timeout_ms),
        ("perfRounds", contract.perf_rounds),
        ("fuzzRounds", contract.fuzz_rounds),
        ("stressDataSize", contract.stress_data_size),
        ("maxFunctionLines", contract.max_function_lines),
        ("maxNestingDepth", contract.max_nesting_depth),
    ] {
        if value == 0 {
            result.add_error(format!("{} must be greater than zero", name));
        }
    }

    if contract.timeout_ms > 60_000 {
        result.add_warning(format!(
            "timeoutMs {} is above one minute; a hanging candidate will stall the run",
            contract.timeout_ms
        ));
    }

    result
}

pub fn validate_schema(schema: &InputSchema) -> ValidationResult {
    let mut result = ValidationResult::new();

    let kinds: Vec<(&str, &FieldKind)> = match schema {
        InputSchema::Scalar { kind } => vec![("<scalar>", kind)],
        InputSchema::Record { fields } => {
            if fields.is_empty() {
                result.add_warning("record schema declares no fields".to_string());
            }
            let mut seen = std::collections::HashSet::new();
            for field in fields {
                if !seen.insert(field.name.as_str()) {
                    result.add_error(format!("duplicate field '{}'", field.name));
                }
            }
            fields.iter().map(|f| (f.name.as_str(), &f.kind)).collect()
        }
    };

    for (name, kind) in kinds {
        match kind {
            FieldKind::Number { min, max } => {
                if !min.is_finite() || !max.is_finite() {
                    result.add_error(format!("field '{}' has a non-finite range", name));
                } else if min > max {
                    result.add_error(format!("field '{}': min {} > max {}", name, min, max));
                } else if !(max - min).is_finite() {
                    result.add_error(format!(
                        "field '{}': range {}..{} is too wide to sample",
                        name, min, max
                    ));
                }
            }
            FieldKind::Integer { min, max } if min > max => {
                result.add_error(format!("field '{}': min {} > max {}", name, min, max));
            }
            FieldKind::Text { choices } if choices.is_empty() => {
                result.add_warning(format!(
                    "field '{}' has no choices; typical values will be empty strings",
                    name
                ));
            }
            _ => {}
        }
    }

    result
}

pub fn validate_weights(weights: &ScoringWeights) -> ValidationResult {
    let mut result = ValidationResult::new();

    if !weights.performance.is_finite() || weights.performance < 0.0 {
        result.add_error(format!(
            "performance weight must be non-negative, got {}",
            weights.performance
        ));
    }
    if !weights.code_size.is_finite() || weights.code_size < 0.0 {
        result.add_error(format!(
            "codeSize weight must be non-negative, got {}",
            weights.code_size
        ));
    }
    if result.is_valid() && weights.performance + weights.code_size <= 0.0 {
        result.add_error("scoring weights must sum to a positive value".to_string());
    }

    result
}

pub fn validate_policy(policy: &EliminationPolicy) -> ValidationResult {
    let mut result = ValidationResult::new();
    if !(0.0..=1.0).contains(&policy.max_fuzz_fail_rate) {
        result.add_error(format!(
            "maxFuzzFailRate must be within [0, 1], got {}",
            policy.max_fuzz_fail_rate
        ));
    }
    result
}

pub fn validate_hell_mode(mode: &HellMode) -> ValidationResult {
    let mut result = ValidationResult::new();
    for (name, value) in [
        ("fuzzMultiplier", mode.fuzz_multiplier),
        ("stressMultiplier", mode.stress_multiplier),
        ("perfMultiplier", mode.perf_multiplier),
        ("timeoutDivisor", mode.timeout_divisor),
    ] {
        if value == 0 {
            result.add_error(format!("{} must be at least 1", name));
        }
    }
    result
}

/// Validate a whole task definition, failing fast on any error
pub fn validate_task(key: &str, spec: &TaskSpec) -> Result<ValidationResult> {
    let mut result = validate_contract(&spec.contract);
    result.merge(validate_schema(&spec.schema));
    result
        .into_result()
        .map_err(|e| ArenaError::Config(format!("task '{}': {}", key, e)))
}

/// Reference oracle: the fixed, visible correctness cases of a task
use crate::config::types::{ArenaError, Result};
use crate::core::types::TestCase;
use serde_json::Value;
use std::path::Path;

#[derive(Clone, Debug, Default)]
pub struct ReferenceOracle {
    cases: Vec<TestCase>,
}

impl ReferenceOracle {
    pub fn new(cases: Vec<TestCase>) -> Result<Self> {
        if let Some(case) = cases.iter().find(|c| c.expected.is_none()) {
            return Err(ArenaError::Config(format!(
                "reference case '{}' has no expected value",
                case.name
            )));
        }
        Ok(Self { cases })
    }

    /// Load an ordered JSON array of `{name, input, expected}` triples
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ArenaError::Config(format!(
                "Failed to read oracle file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let cases: Vec<TestCase> = serde_json::from_str(&content)
            .map_err(|e| ArenaError::Config(format!("Failed to parse oracle JSON: {}", e)))?;
        Self::new(cases)
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

/// Structural equality over JSON values
///
/// Numbers compare numerically so `4` and `4.0` are equal, matching how
/// candidates in dynamically typed hosts report integral floats.
pub fn deep_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
                return x == y;
            }
            if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
                return x == y;
            }
            match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| deep_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(k, v)| b.get(k).is_some_and(|other| deep_equal(v, other)))
        }
        _ => left == right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_compare_numerically() {
        assert!(deep_equal(&json!(4), &json!(4.0)));
        assert!(!deep_equal(&json!(4), &json!(4.5)));
        assert!(!deep_equal(&json!(4), &json!("4")));
    }

    #[test]
    fn nested_structures() {
        let a = json!({"score": 80, "tags": ["a", "b"], "meta": {"v": 1}});
        let b = json!({"tags": ["a", "b"], "meta": {"v": 1.0}, "score": 80});
        assert!(deep_equal(&a, &b));

        let c = json!({"score": 80, "tags": ["b", "a"], "meta": {"v": 1}});
        assert!(!deep_equal(&a, &c));

        let d = json!({"score": 80, "tags": ["a", "b"], "meta": {"v": 1}, "extra": null});
        assert!(!deep_equal(&a, &d));
    }

    #[test]
    fn oracle_rejects_case_without_expected() {
        let result = ReferenceOracle::new(vec![TestCase::new("t", json!(1))]);
        assert!(matches!(result, Err(ArenaError::Config(_))));
    }

    #[test]
    fn oracle_loads_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oracle.json");
        std::fs::write(
            &path,
            r#"[{"name": "two", "input": 2, "expected": 4}, {"name": "zero", "input": 0, "expected": 0}]"#,
        )
        .unwrap();

        let oracle = ReferenceOracle::load_from_file(&path).unwrap();
        assert_eq!(oracle.len(), 2);
        assert_eq!(oracle.cases()[0].name, "two");
        assert_eq!(oracle.cases()[1].expected, Some(json!(0)));
    }
}

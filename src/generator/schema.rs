/// Input schema describing the shape of a task's well-formed input
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Magnitude used for "extremely large" numeric probes
pub const HUGE_NUMBER: f64 = 1.0e308;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FieldKind {
    Bool,
    Number { min: f64, max: f64 },
    Integer { min: i64, max: i64 },
    Text { choices: Vec<String> },
}

impl FieldKind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Number { .. } | FieldKind::Integer { .. })
    }

    /// Well-formed value drawn from the declared domain
    pub fn typical<R: Rng + ?Sized>(&self, rng: &mut R) -> Value {
        match self {
            FieldKind::Bool => json!(rng.gen_bool(0.5)),
            FieldKind::Number { min, max } => json!(rng.gen_range(*min..=*max)),
            FieldKind::Integer { min, max } => json!(rng.gen_range(*min..=*max)),
            FieldKind::Text { choices } => match choices.choose(rng) {
                Some(choice) => json!(choice),
                None => json!(""),
            },
        }
    }

    /// Value of the wrong JSON type for this field
    pub fn mismatched(&self) -> Value {
        match self {
            FieldKind::Bool => json!("yes"),
            FieldKind::Number { .. } => json!("fast"),
            FieldKind::Integer { .. } => json!([]),
            FieldKind::Text { .. } => json!({}),
        }
    }

    /// Values sitting on or just past the edges of the domain
    pub fn boundary_values(&self) -> Vec<Value> {
        match self {
            FieldKind::Bool => vec![json!(true), json!(false), Value::Null],
            FieldKind::Number { min, max } => vec![
                json!(0.0),
                json!(-0.001),
                json!(*min),
                json!(*min - 0.001),
                json!(*min + 0.001),
                json!(*max),
                json!(*max - 0.001),
                json!(*max + 0.001),
            ],
            FieldKind::Integer { min, max } => vec![
                json!(0),
                json!(-1),
                json!(*min),
                json!(min.saturating_sub(1)),
                json!(*max),
                json!(max.saturating_add(1)),
            ],
            FieldKind::Text { choices } => {
                let mut values = vec![json!(""), Value::Null];
                values.extend(choices.first().map(|c| json!(c)));
                values
            }
        }
    }

    /// Extreme value used by the "extreme values" fuzz family
    pub fn extreme<R: Rng + ?Sized>(&self, rng: &mut R) -> Value {
        match self {
            FieldKind::Bool => json!(true),
            FieldKind::Number { .. } => {
                if rng.gen_bool(0.5) {
                    json!(-999.0)
                } else {
                    json!(HUGE_NUMBER)
                }
            }
            FieldKind::Integer { .. } => {
                if rng.gen_bool(0.5) {
                    json!(-100)
                } else {
                    json!(i64::MAX)
                }
            }
            FieldKind::Text { .. } => json!("x".repeat(4096)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Shape of a task's input: a single scalar or a flat record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "camelCase")]
pub enum InputSchema {
    Scalar { kind: FieldKind },
    Record { fields: Vec<FieldSpec> },
}

impl InputSchema {
    pub fn typical<R: Rng + ?Sized>(&self, rng: &mut R) -> Value {
        match self {
            InputSchema::Scalar { kind } => kind.typical(rng),
            InputSchema::Record { fields } => Value::Object(
                fields
                    .iter()
                    .map(|f| (f.name.clone(), f.kind.typical(rng)))
                    .collect(),
            ),
        }
    }

    /// Every field (or the scalar) replaced by a wrongly typed value
    pub fn mismatched(&self) -> Value {
        match self {
            InputSchema::Scalar { kind } => kind.mismatched(),
            InputSchema::Record { fields } => Value::Object(
                fields
                    .iter()
                    .map(|f| (f.name.clone(), f.kind.mismatched()))
                    .collect(),
            ),
        }
    }

    pub fn has_numeric(&self) -> bool {
        match self {
            InputSchema::Scalar { kind } => kind.is_numeric(),
            InputSchema::Record { fields } => fields.iter().any(|f| f.kind.is_numeric()),
        }
    }

    /// Typical input with all numeric slots forced to `value`
    ///
    /// Falls back to the bare number when the schema has nowhere numeric to
    /// put it.
    pub fn with_numeric<R: Rng + ?Sized>(&self, rng: &mut R, value: f64) -> Value {
        match self {
            InputSchema::Record { fields } if self.has_numeric() => Value::Object(
                fields
                    .iter()
                    .map(|f| {
                        let v = match f.kind {
                            FieldKind::Integer { .. } => json!(to_integer(value)),
                            FieldKind::Number { .. } => json!(value),
                            _ => f.kind.typical(rng),
                        };
                        (f.name.clone(), v)
                    })
                    .collect(),
            ),
            InputSchema::Scalar {
                kind: FieldKind::Integer { .. },
            } => json!(to_integer(value)),
            _ => json!(value),
        }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        match self {
            InputSchema::Scalar { .. } => &[],
            InputSchema::Record { fields } => fields,
        }
    }

    /// Record fields mapped through `f`; scalars map their single value
    pub fn map_fields<F>(&self, mut f: F) -> Value
    where
        F: FnMut(&FieldKind) -> Option<Value>,
    {
        match self {
            InputSchema::Scalar { kind } => f(kind).unwrap_or(Value::Null),
            InputSchema::Record { fields } => {
                let mut map = Map::new();
                for field in fields {
                    if let Some(v) = f(&field.kind) {
                        map.insert(field.name.clone(), v);
                    }
                }
                Value::Object(map)
            }
        }
    }
}

// `as` saturates at the i64 bounds
fn to_integer(value: f64) -> i64 {
    value as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn listing_schema() -> InputSchema {
        InputSchema::Record {
            fields: vec![
                FieldSpec::new("verified", FieldKind::Bool),
                FieldSpec::new("rating", FieldKind::Number { min: 1.0, max: 5.0 }),
                FieldSpec::new("reviews", FieldKind::Integer { min: 0, max: 100 }),
            ],
        }
    }

    #[test]
    fn typical_record_respects_domains() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let value = listing_schema().typical(&mut rng);
            assert!(value["verified"].is_boolean());
            let rating = value["rating"].as_f64().unwrap();
            assert!((1.0..=5.0).contains(&rating));
            let reviews = value["reviews"].as_i64().unwrap();
            assert!((0..=100).contains(&reviews));
        }
    }

    #[test]
    fn mismatched_changes_every_type() {
        let value = listing_schema().mismatched();
        assert!(value["verified"].is_string());
        assert!(value["rating"].is_string());
        assert!(value["reviews"].is_array());
    }

    #[test]
    fn numeric_override_falls_back_to_bare_number() {
        let mut rng = StdRng::seed_from_u64(1);
        let schema = InputSchema::Record {
            fields: vec![FieldSpec::new("flag", FieldKind::Bool)],
        };
        assert_eq!(schema.with_numeric(&mut rng, -1.0), json!(-1.0));

        let record = listing_schema().with_numeric(&mut rng, 0.0);
        assert_eq!(record["reviews"], json!(0));
        assert_eq!(record["rating"], json!(0.0));
    }

    #[test]
    fn schema_round_trips_through_json() {
        let text = r#"{"shape": "record", "fields": [
            {"name": "rating", "type": "number", "min": 1.0, "max": 5.0},
            {"name": "tier", "type": "text", "choices": ["gold", "silver"]}
        ]}"#;
        let schema: InputSchema = serde_json::from_str(text).unwrap();
        assert_eq!(schema.fields().len(), 2);
        assert_eq!(
            schema.fields()[1].kind,
            FieldKind::Text {
                choices: vec!["gold".to_string(), "silver".to_string()]
            }
        );
    }
}

use crate::config::types::{ArenaError, Result, TaskContract};
use crate::core::types::TestCase;
use crate::generator::schema::{InputSchema, HUGE_NUMBER};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

/// Upper bound on a single generated set
pub const MAX_GENERATED_CASES: u64 = 10_000_000;

/// Fuzz families drawn for the non-mandatory slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuzzFamily {
    Empty,
    Null,
    WrongType,
    PartialFields,
    ExtremeValues,
    WrongTypedFields,
    ExtraFields,
    Boundary,
}

impl FuzzFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            FuzzFamily::Empty => "empty",
            FuzzFamily::Null => "null",
            FuzzFamily::WrongType => "wrong-type",
            FuzzFamily::PartialFields => "partial",
            FuzzFamily::ExtremeValues => "extreme",
            FuzzFamily::WrongTypedFields => "wrong-fields",
            FuzzFamily::ExtraFields => "extra-fields",
            FuzzFamily::Boundary => "boundary",
        }
    }

    /// 10% each for the seven malformed families, 30% boundary values
    fn draw<R: Rng + ?Sized>(rng: &mut R) -> Self {
        match rng.gen_range(0..10u8) {
            0 => FuzzFamily::Empty,
            1 => FuzzFamily::Null,
            2 => FuzzFamily::WrongType,
            3 => FuzzFamily::PartialFields,
            4 => FuzzFamily::ExtremeValues,
            5 => FuzzFamily::WrongTypedFields,
            6 => FuzzFamily::ExtraFields,
            _ => FuzzFamily::Boundary,
        }
    }
}

/// Schema-driven generator for fuzz, stress and perf inputs
///
/// With an explicit seed every set is a pure function of
/// `(schema, contract, multiplier, seed)` and of the call order.
pub struct AdversarialGenerator {
    schema: InputSchema,
    perf_input: Option<Value>,
    rng: StdRng,
}

impl AdversarialGenerator {
    pub fn new(schema: InputSchema, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            schema,
            perf_input: None,
            rng,
        }
    }

    /// Use a fixed representative input for every perf trial
    pub fn with_perf_input(mut self, input: Option<Value>) -> Self {
        self.perf_input = input;
        self
    }

    pub fn schema(&self) -> &InputSchema {
        &self.schema
    }

    /// Inputs every fuzz set contains, in this order
    pub fn mandatory_probes(&mut self) -> Vec<(&'static str, Value)> {
        let rng = &mut self.rng;
        vec![
            ("null", Value::Null),
            ("empty-object", json!({})),
            ("top-level-string", json!("not an object")),
            ("all-fields-mismatched", self.schema.mismatched()),
            ("boundary-zero", self.schema.with_numeric(rng, 0.0)),
            ("boundary-negative", self.schema.with_numeric(rng, -1.0)),
            ("boundary-huge", self.schema.with_numeric(rng, HUGE_NUMBER)),
            ("typical", self.schema.typical(rng)),
        ]
    }

    pub fn generate_fuzz(
        &mut self,
        contract: &TaskContract,
        round_multiplier: u64,
    ) -> Result<Vec<TestCase>> {
        let total = volume("fuzz", contract.fuzz_rounds, round_multiplier)?;
        let probes = self.mandatory_probes();
        if total < probes.len() as u64 {
            return Err(ArenaError::Generator(format!(
                "fuzz volume {} is smaller than the {} mandatory probes",
                total,
                probes.len()
            )));
        }

        let mut cases = Vec::with_capacity(total as usize);
        for (i, (label, input)) in probes.into_iter().enumerate() {
            cases.push(TestCase::new(format!("fuzz-{}-{}", i, label), input));
        }
        while (cases.len() as u64) < total {
            let family = FuzzFamily::draw(&mut self.rng);
            let input = self.fuzz_input(family);
            cases.push(TestCase::new(
                format!("fuzz-{}-{}", cases.len(), family.as_str()),
                input,
            ));
        }

        log::debug!("generated {} fuzz cases", cases.len());
        Ok(cases)
    }

    pub fn generate_stress(
        &mut self,
        contract: &TaskContract,
        round_multiplier: u64,
    ) -> Result<Vec<TestCase>> {
        let total = volume("stress", contract.stress_data_size, round_multiplier)?;
        let cases: Vec<TestCase> = (0..total)
            .map(|i| TestCase::new(format!("stress-{}", i), self.schema.typical(&mut self.rng)))
            .collect();
        log::debug!("generated {} stress cases", cases.len());
        Ok(cases)
    }

    pub fn generate_perf(
        &mut self,
        contract: &TaskContract,
        round_multiplier: u64,
    ) -> Result<Vec<TestCase>> {
        let total = volume("perf", contract.perf_rounds, round_multiplier)?;
        let cases = (0..total)
            .map(|i| {
                let input = match &self.perf_input {
                    Some(fixed) => fixed.clone(),
                    None => self.schema.typical(&mut self.rng),
                };
                TestCase::new(format!("perf-{}", i), input)
            })
            .collect();
        Ok(cases)
    }

    fn fuzz_input(&mut self, family: FuzzFamily) -> Value {
        let schema = &self.schema;
        let rng = &mut self.rng;
        match family {
            FuzzFamily::Empty => json!({}),
            FuzzFamily::Null => Value::Null,
            FuzzFamily::WrongType => json!("invalid"),
            FuzzFamily::PartialFields => {
                let fields = schema.fields();
                if fields.is_empty() {
                    return schema.typical(rng);
                }
                let keep = rng.gen_range(0..fields.len());
                let mut chosen: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
                chosen.shuffle(rng);
                chosen.truncate(keep);
                let full = schema.typical(rng);
                match full {
                    Value::Object(map) => Value::Object(
                        map.into_iter()
                            .filter(|(k, _)| chosen.contains(&k.as_str()))
                            .collect(),
                    ),
                    other => other,
                }
            }
            FuzzFamily::ExtremeValues => schema.map_fields(|kind| Some(kind.extreme(rng))),
            FuzzFamily::WrongTypedFields => {
                schema.map_fields(|kind| Some(if rng.gen_bool(0.5) {
                    kind.mismatched()
                } else {
                    kind.typical(rng)
                }))
            }
            FuzzFamily::ExtraFields => {
                let base = schema.typical(rng);
                let mut map = match base {
                    Value::Object(map) => map,
                    other => {
                        let mut map = serde_json::Map::new();
                        map.insert("value".to_string(), other);
                        map
                    }
                };
                map.insert("__proto__".to_string(), json!({"polluted": true}));
                map.insert("constructor".to_string(), Value::Null);
                map.insert("extraField".to_string(), json!("should be ignored"));
                Value::Object(map)
            }
            FuzzFamily::Boundary => schema.map_fields(|kind| {
                // Occasionally drop the field entirely
                if schema.fields().len() > 1 && rng.gen_bool(0.1) {
                    return None;
                }
                let mut values = kind.boundary_values();
                values.shuffle(rng);
                values.pop()
            }),
        }
    }
}

/// `base × multiplier`, rejecting overflow and oversize requests
fn volume(set: &str, base: u64, multiplier: u64) -> Result<u64> {
    let total = base.checked_mul(multiplier).ok_or_else(|| {
        ArenaError::Generator(format!(
            "{} volume {} x {} overflows",
            set, base, multiplier
        ))
    })?;
    if total > MAX_GENERATED_CASES {
        return Err(ArenaError::Generator(format!(
            "cannot produce {} {} cases (limit {})",
            total, set, MAX_GENERATED_CASES
        )));
    }
    Ok(total)
}

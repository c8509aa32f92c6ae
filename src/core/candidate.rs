use crate::core::types::CandidateFault;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Single-operation capability every candidate implementation exposes.
pub trait EntryPoint: Send + Sync {
    fn invoke(&self, input: &Value) -> Result<Value, CandidateFault>;
}

/// Adapts a plain closure into an [`EntryPoint`].
pub struct FnEntryPoint<F>(F);

impl<F> FnEntryPoint<F>
where
    F: Fn(&Value) -> Result<Value, CandidateFault> + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> EntryPoint for FnEntryPoint<F>
where
    F: Fn(&Value) -> Result<Value, CandidateFault> + Send + Sync + 'static,
{
    fn invoke(&self, input: &Value) -> Result<Value, CandidateFault> {
        (self.0)(input)
    }
}

/// One submitted implementation under evaluation
#[derive(Clone)]
pub struct Candidate {
    name: String,
    source_text: String,
    entry_point: Arc<dyn EntryPoint>,
}

impl Candidate {
    pub fn new(
        name: impl Into<String>,
        source_text: impl Into<String>,
        entry_point: Arc<dyn EntryPoint>,
    ) -> Self {
        Self {
            name: name.into(),
            source_text: source_text.into(),
            entry_point,
        }
    }

    /// Convenience constructor for in-process closures
    pub fn from_fn<F>(name: impl Into<String>, source_text: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, CandidateFault> + Send + Sync + 'static,
    {
        Self::new(name, source_text, Arc::new(FnEntryPoint::new(f)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn entry_point(&self) -> Arc<dyn EntryPoint> {
        Arc::clone(&self.entry_point)
    }

    /// SHA256 of the source text, recorded in evaluation events
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.source_text.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate")
            .field("name", &self.name)
            .field("source_bytes", &self.source_text.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn closure_candidate_invokes() {
        let candidate = Candidate::from_fn("double", "const f = x => x * 2;", |v| {
            Ok(json!(v.as_i64().unwrap_or(0) * 2))
        });
        let out = candidate.entry_point().invoke(&json!(21)).unwrap();
        assert_eq!(out, json!(42));
        assert_eq!(candidate.name(), "double");
    }

    #[test]
    fn fingerprint_is_stable_and_source_sensitive() {
        let a = Candidate::from_fn("a", "x", |v| Ok(v.clone()));
        let b = Candidate::from_fn("b", "x", |v| Ok(v.clone()));
        let c = Candidate::from_fn("c", "y", |v| Ok(v.clone()));
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }
}

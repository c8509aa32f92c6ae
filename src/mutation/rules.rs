/// Line mutation rules
///
/// Operator rules only touch whitespace-delimited tokens, so `=>`, `<T>` and
/// `i++` are left alone. A matching rule rewrites every occurrence on the line.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationKind {
    ConditionalBoundary,
    NegateConditional,
    RemoveConditional,
    MathMutator,
}

impl MutationKind {
    /// Priority order
    pub const ALL: [MutationKind; 4] = [
        MutationKind::ConditionalBoundary,
        MutationKind::NegateConditional,
        MutationKind::RemoveConditional,
        MutationKind::MathMutator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::ConditionalBoundary => "ConditionalBoundary",
            MutationKind::NegateConditional => "NegateConditional",
            MutationKind::RemoveConditional => "RemoveConditional",
            MutationKind::MathMutator => "MathMutator",
        }
    }

    /// The mutated line, or `None` when the rule does not apply
    pub fn apply(&self, line: &str) -> Option<String> {
        let mutated = match self {
            MutationKind::ConditionalBoundary => swap_tokens(line, boundary_swap),
            MutationKind::NegateConditional => swap_tokens(line, negate_swap),
            MutationKind::MathMutator => swap_tokens(line, math_swap),
            MutationKind::RemoveConditional => remove_conditionals(line),
        };
        match mutated {
            Some(m) if m != line => Some(m),
            _ => None,
        }
    }
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn boundary_swap(token: &str) -> Option<&'static str> {
    match token {
        "<" => Some("<="),
        "<=" => Some("<"),
        ">" => Some(">="),
        ">=" => Some(">"),
        _ => None,
    }
}

fn negate_swap(token: &str) -> Option<&'static str> {
    match token {
        "==" => Some("!="),
        "!=" => Some("=="),
        "===" => Some("!=="),
        "!==" => Some("==="),
        _ => None,
    }
}

fn math_swap(token: &str) -> Option<&'static str> {
    match token {
        "+" => Some("-"),
        "-" => Some("+"),
        "*" => Some("/"),
        "/" => Some("*"),
        _ => None,
    }
}

fn token_pattern() -> &'static Regex {
    static TOKENS: OnceLock<Regex> = OnceLock::new();
    TOKENS.get_or_init(|| Regex::new(r"\S+|\s+").expect("token pattern is a valid regex"))
}

fn conditional_pattern() -> &'static Regex {
    static CONDITIONAL: OnceLock<Regex> = OnceLock::new();
    CONDITIONAL.get_or_init(|| {
        Regex::new(r"\bif\s*\(([^)]+)\)").expect("conditional pattern is a valid regex")
    })
}

fn swap_tokens(line: &str, swap: fn(&str) -> Option<&'static str>) -> Option<String> {
    let mut changed = false;
    let mut out = String::with_capacity(line.len() + 4);
    for token in token_pattern().find_iter(line) {
        match swap(token.as_str()) {
            Some(replacement) => {
                out.push_str(replacement);
                changed = true;
            }
            None => out.push_str(token.as_str()),
        }
    }
    changed.then_some(out)
}

fn remove_conditionals(line: &str) -> Option<String> {
    let pattern = conditional_pattern();
    let applies = pattern
        .captures_iter(line)
        .any(|c| c.get(1).map(|m| m.as_str().trim() != "true").unwrap_or(false));
    applies.then(|| pattern.replace_all(line, "if (true)").into_owned())
}

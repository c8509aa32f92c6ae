/// Source-text heuristics for the structural stage
///
/// These work on raw text without parsing. They are approximations; the
/// arena only needs them to be deterministic and monotone in obvious cases.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureReport {
    pub code_lines: u64,
    /// Longest function span, or `code_lines` when no header was detected
    pub function_lines: u64,
    pub nesting_depth: u64,
    pub functions_detected: u64,
}

pub fn analyze(source: &str) -> StructureReport {
    let code_lines = code_lines(source);
    let (longest, detected) = function_spans(source);
    StructureReport {
        code_lines,
        function_lines: if detected == 0 { code_lines } else { longest },
        nesting_depth: nesting_depth(source),
        functions_detected: detected,
    }
}

/// Neither blank nor led by a comment marker
pub fn is_code_line(line: &str) -> bool {
    let trimmed = line.trim();
    !(trimmed.is_empty()
        || trimmed.starts_with("//")
        || trimmed.starts_with("/*")
        || trimmed.starts_with('*'))
}

/// Lines that are neither blank nor comment-led
pub fn code_lines(source: &str) -> u64 {
    source.lines().filter(|l| is_code_line(l)).count() as u64
}

fn function_header() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER.get_or_init(|| {
        Regex::new(concat!(
            r"(?:\bfunction\s+\w+",
            r"|\b(?:const|let|var)\s+\w+\s*=\s*(?:async\s*)?\([^)]*\)\s*(?::\s*[\w<>\[\]]+)?\s*=>",
            r"|\b(?:async\s+)?function\s*\(",
            r"|\bfn\s+\w+)"
        ))
        .expect("function header pattern is a valid regex")
    })
}

/// Longest detected function in code lines, and the number detected
///
/// Nested functions count towards the enclosing span.
pub fn longest_function_lines(source: &str) -> Option<u64> {
    match function_spans(source) {
        (_, 0) => None,
        (longest, _) => Some(longest),
    }
}

fn function_spans(source: &str) -> (u64, u64) {
    let header = function_header();
    let mut longest = 0u64;
    let mut detected = 0u64;
    let mut current = 0u64;
    let mut depth = 0i64;
    let mut opened = false;
    let mut tracking = false;

    for line in source.lines() {
        if !is_code_line(line) {
            continue;
        }
        if !tracking && header.is_match(line) {
            tracking = true;
            detected += 1;
            current = 0;
            depth = 0;
            opened = false;
        }
        if !tracking {
            continue;
        }

        current += 1;
        let opens = line.matches('{').count() as i64;
        let closes = line.matches('}').count() as i64;
        depth += opens - closes;
        opened |= opens > 0;

        let expression_body = !opened && line.trim_end().ends_with(';');
        if (opened && depth <= 0) || expression_body {
            longest = longest.max(current);
            tracking = false;
        }
    }

    // Unterminated function runs to end of file
    if tracking {
        longest = longest.max(current);
    }
    (longest, detected)
}

/// Maximum `{` nesting outside strings and comments
///
/// A function body counts as depth 1.
pub fn nesting_depth(source: &str) -> u64 {
    #[derive(PartialEq)]
    enum Mode {
        Code,
        LineComment,
        BlockComment,
        Str(char),
    }

    let mut mode = Mode::Code;
    let mut depth = 0i64;
    let mut max_depth = 0i64;
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match mode {
            Mode::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    mode = Mode::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    mode = Mode::BlockComment;
                }
                '"' | '\'' | '`' => mode = Mode::Str(c),
                '{' => {
                    depth += 1;
                    max_depth = max_depth.max(depth);
                }
                '}' => depth = (depth - 1).max(0),
                _ => {}
            },
            Mode::LineComment => {
                if c == '\n' {
                    mode = Mode::Code;
                }
            }
            Mode::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    mode = Mode::Code;
                }
            }
            Mode::Str(quote) => {
                if c == '\\' {
                    chars.next();
                } else if c == quote {
                    mode = Mode::Code;
                }
            }
        }
    }

    max_depth as u64
}

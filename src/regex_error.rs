//! Regex Error Handling
//!
//! This module compiles operation patterns and turns compilation failures into
//! classified errors with a short suggestion, so callers see more than the raw
//! parser output.

use regex::{Regex, RegexBuilder};
use std::fmt;
use thiserror::Error;

use crate::engine::RegexLimits;
use crate::operation::Flags;

/// A pattern that failed to compile
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid regex pattern: {error_type}")]
pub struct PatternError {
    /// The original pattern that failed to compile
    pub pattern: String,
    /// The type of error that occurred
    pub error_type: RegexErrorType,
    /// Suggested fix for the error
    pub suggestion: Option<String>,
}

/// Types of regex errors with specific diagnostic information
#[derive(Debug, Clone, PartialEq)]
pub enum RegexErrorType {
    /// Syntax error in the regex pattern
    Syntax { message: String },
    /// Invalid escape sequence
    InvalidEscape { sequence: String, position: usize },
    /// Unclosed group/bracket/brace
    UnclosedDelimiter {
        delimiter: char, // '(', '[', '{'
        position: usize,
    },
    /// Invalid quantifier (e.g. `*` with nothing to repeat)
    InvalidQuantifier { message: String },
    /// Look-ahead/look-behind, which the regex crate rejects
    Lookaround { message: String },
    /// Backreferences inside a pattern
    Backreference { message: String },
    /// Compiled program exceeded the configured size limit
    TooBig { limit: usize },
}

impl fmt::Display for RegexErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegexErrorType::Syntax { message }
            | RegexErrorType::InvalidQuantifier { message }
            | RegexErrorType::Lookaround { message }
            | RegexErrorType::Backreference { message } => f.write_str(message),
            RegexErrorType::InvalidEscape { sequence, position } => {
                write!(f, "invalid escape sequence '{}' at position {}", sequence, position)
            }
            RegexErrorType::UnclosedDelimiter {
                delimiter,
                position,
            } => write!(
                f,
                "unclosed '{}' at position {} (missing '{}')",
                delimiter,
                position,
                closer_for(*delimiter)
            ),
            RegexErrorType::TooBig { limit } => {
                write!(f, "compiled pattern exceeds size limit of {} bytes", limit)
            }
        }
    }
}

impl PatternError {
    /// Create a pattern error from a regex::Error
    pub fn from_regex_error(err: &regex::Error, pattern: &str) -> Self {
        let error_type = match err {
            regex::Error::CompiledTooBig(limit) => RegexErrorType::TooBig { limit: *limit },
            regex::Error::Syntax(raw) => classify_error(short_message(raw), pattern),
            other => RegexErrorType::Syntax {
                message: other.to_string(),
            },
        };
        let suggestion = generate_suggestion(&error_type);

        PatternError {
            pattern: pattern.to_string(),
            error_type,
            suggestion,
        }
    }

    /// Multi-line rendering for terminal output
    pub fn display(&self) -> String {
        let mut output = String::from("Regex Error\n");
        output.push_str(&format!("  Pattern: \"{}\"\n", self.pattern));
        output.push_str(&format!("  Details: {}\n", self.error_type));
        if let Some(ref suggestion) = self.suggestion {
            output.push_str(&format!("  Suggestion: {}\n", suggestion));
        }
        output
    }
}

/// The regex crate reports syntax errors as a multi-line block ending in
/// `error: <message>`; keep only that message.
fn short_message(raw: &str) -> &str {
    raw.lines()
        .rev()
        .find_map(|line| line.trim().strip_prefix("error: "))
        .unwrap_or(raw.trim())
}

/// Classify the regex error into a specific type
fn classify_error(message: &str, pattern: &str) -> RegexErrorType {
    let lower_msg = message.to_lowercase();

    if lower_msg.contains("unclosed") {
        let delimiter = if lower_msg.contains("group") {
            Some(('(', ')'))
        } else if lower_msg.contains("character class") {
            Some(('[', ']'))
        } else if lower_msg.contains("counted repetition") {
            Some(('{', '}'))
        } else {
            None
        };
        if let Some((open, close)) = delimiter {
            if let Some(position) = find_unclosed_delimiter(pattern, open, close) {
                return RegexErrorType::UnclosedDelimiter {
                    delimiter: open,
                    position,
                };
            }
        }
    }

    if lower_msg.contains("look-around") || lower_msg.contains("look-ahead") {
        return RegexErrorType::Lookaround {
            message: message.to_string(),
        };
    }

    if lower_msg.contains("backreference") {
        return RegexErrorType::Backreference {
            message: message.to_string(),
        };
    }

    if lower_msg.contains("escape") {
        if let Some(position) = find_invalid_escape(pattern) {
            return RegexErrorType::InvalidEscape {
                sequence: extract_escape_at(pattern, position),
                position,
            };
        }
    }

    if lower_msg.contains("repetition") || lower_msg.contains("quantifier") {
        return RegexErrorType::InvalidQuantifier {
            message: message.to_string(),
        };
    }

    RegexErrorType::Syntax {
        message: message.to_string(),
    }
}

fn generate_suggestion(error_type: &RegexErrorType) -> Option<String> {
    match error_type {
        RegexErrorType::UnclosedDelimiter {
            delimiter,
            position,
        } => Some(format!(
            "Add a closing '{}' to match the opening '{}' at position {}, \
             or escape it as '\\{}' to match it literally.",
            closer_for(*delimiter),
            delimiter,
            position,
            delimiter
        )),

        RegexErrorType::InvalidEscape { sequence, .. } => Some(format!(
            "The escape sequence '{}' is not recognized. Common escapes are \
             \\n, \\t, \\d, \\w, \\s, \\b and \\xHH. For a literal backslash use '\\\\'.",
            sequence
        )),

        RegexErrorType::InvalidQuantifier { message } => {
            if message.contains("missing expression") {
                Some(
                    "A quantifier (*, +, ?, {n}) has nothing to repeat. \
                     Place it after a character or group, e.g. 'a*', '(foo)+'."
                        .to_string(),
                )
            } else {
                Some(
                    "Quantifier ranges must be '{n}', '{n,}' or '{n,m}' with n <= m."
                        .to_string(),
                )
            }
        }

        RegexErrorType::Lookaround { .. } => Some(
            "Look-ahead and look-behind are not supported. Match the surrounding \
             text with a capture group and re-insert it with $1 in the replacement."
                .to_string(),
        ),

        RegexErrorType::Backreference { .. } => Some(
            "Backreferences are not supported inside patterns. \
             Use $1, ${name} in the replacement instead."
                .to_string(),
        ),

        RegexErrorType::TooBig { .. } => Some(
            "Simplify the pattern (fewer large repetitions or Unicode classes) \
             or raise engine.regex_size_limit_mb in the configuration."
                .to_string(),
        ),

        RegexErrorType::Syntax { .. } => None,
    }
}

fn closer_for(delimiter: char) -> char {
    match delimiter {
        '(' => ')',
        '[' => ']',
        '{' => '}',
        _ => '?',
    }
}

/// Helper: position (in chars) of the last unmatched opening delimiter
fn find_unclosed_delimiter(pattern: &str, open: char, close: char) -> Option<usize> {
    let mut stack = Vec::new();
    let mut in_char_class = false;
    let mut escaped = false;

    for (i, c) in pattern.chars().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
            continue;
        }

        if open != '[' {
            if c == '[' {
                in_char_class = true;
                continue;
            }
            if c == ']' {
                in_char_class = false;
                continue;
            }
            if in_char_class {
                continue;
            }
        }

        if c == open {
            stack.push(i);
        } else if c == close {
            stack.pop();
        }
    }

    stack.last().copied()
}

/// Helper: find an escape the regex crate does not accept
fn find_invalid_escape(pattern: &str) -> Option<usize> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '\\' {
            let Some(&next) = chars.get(i + 1) else {
                return Some(i);
            };
            let is_valid = next.is_ascii_punctuation()
                || matches!(
                    next,
                    'n' | 't' | 'r' | 'f' | 'v' | 'a' | '0'..='7'
                        | 'x' | 'u' | 'U'
                        | 'w' | 'W' | 'd' | 'D' | 's' | 'S' | 'b' | 'B'
                        | 'p' | 'P' | 'A' | 'z' | 'Z'
                );
            if !is_valid {
                return Some(i);
            }
            i += 2;
        } else {
            i += 1;
        }
    }

    None
}

/// Helper: extract the escape sequence at a given position
fn extract_escape_at(pattern: &str, pos: usize) -> String {
    pattern.chars().skip(pos).take(2).collect()
}

/// Compile a pattern with the operation's flags mapped to regex options
pub fn compile_pattern(
    pattern: &str,
    flags: &Flags,
    limits: &RegexLimits,
) -> Result<Regex, PatternError> {
    RegexBuilder::new(pattern)
        .case_insensitive(flags.case_insensitive)
        .multi_line(flags.multi_line)
        .dot_matches_new_line(flags.dot_matches_new_line)
        .size_limit(limits.size_limit)
        .dfa_size_limit(limits.dfa_size_limit)
        .build()
        .map_err(|err| PatternError::from_regex_error(&err, pattern))
}

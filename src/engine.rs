//! Transformation engine
//!
//! Stateless application of substitute, delete and print operations to a block
//! of text. Every entry point except [`Engine::validate`] is total: failures
//! come back as a report with `success == false`, never as an error.

use regex::Regex;
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::operation::{Flags, Operation, OperationKind, Selector};
use crate::outcome::{OutcomeReport, Transformation};
use crate::regex_error::compile_pattern;

/// Compile limits handed to the regex builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegexLimits {
    /// Approximate maximum size of a compiled program, in bytes
    pub size_limit: usize,
    /// Approximate maximum cache size of the lazy DFA, in bytes
    pub dfa_size_limit: usize,
}

impl Default for RegexLimits {
    fn default() -> Self {
        Self {
            size_limit: 10 * 1024 * 1024,
            dfa_size_limit: 2 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Engine {
    limits: RegexLimits,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: RegexLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> RegexLimits {
        self.limits
    }

    /// True only for substitute, delete and print.
    pub fn supports(&self, kind: OperationKind) -> bool {
        kind.is_executable()
    }

    /// Check that `op` can run: supported kind, required fields present and
    /// non-blank, and a pattern that compiles with the operation's flags.
    pub fn validate(&self, op: &Operation) -> Result<(), EngineError> {
        self.prepare(op).map(|_| ())
    }

    /// Apply `op` to `content`, timing the call.
    pub fn execute(&self, content: &str, op: &Operation) -> OutcomeReport {
        debug!(
            "Executing {} operation on content length: {}",
            op.kind(),
            content.len()
        );
        let start = Instant::now();

        match self.run(content, op) {
            Ok(transformation) => {
                OutcomeReport::succeeded(content, transformation, elapsed_ms(start))
            }
            Err(e) => {
                warn!("Error executing {} operation: {}", op.kind(), e);
                OutcomeReport::failure(content, e.to_string(), elapsed_ms(start))
            }
        }
    }

    /// Same computation as [`execute`](Self::execute); reports zero execution time.
    pub fn preview(&self, content: &str, op: &Operation) -> OutcomeReport {
        debug!("Previewing {} operation", op.kind());

        match self.run(content, op) {
            Ok(transformation) => OutcomeReport::succeeded(content, transformation, 0),
            Err(e) => {
                warn!("Error previewing {} operation: {}", op.kind(), e);
                OutcomeReport::failure(content, e.to_string(), 0)
            }
        }
    }

    /// Apply `ops` in order, each step consuming the previous step's output.
    ///
    /// Stops at the first failing step. The failure report names the 1-based
    /// step, keeps the original input as its content and carries the changes
    /// and warnings of the steps that succeeded before it.
    pub fn execute_batch(&self, content: &str, ops: &[Operation]) -> OutcomeReport {
        debug!("Executing batch of {} sed operations", ops.len());
        let start = Instant::now();

        let mut current = content.to_string();
        let mut changes = Vec::new();
        let mut warnings = Vec::new();
        let mut lines_modified = 0;
        let mut any_modified = false;

        for (i, op) in ops.iter().enumerate() {
            debug!(
                "Executing batch operation {}/{}: {}",
                i + 1,
                ops.len(),
                op.kind()
            );

            let step = self.execute(&current, op);
            if !step.success() {
                let error = EngineError::BatchStep {
                    step: i + 1,
                    message: step.error().unwrap_or_default().to_string(),
                };
                warn!("{}", error);
                return OutcomeReport::failure(content, error.to_string(), elapsed_ms(start))
                    .with_history(changes, warnings);
            }

            lines_modified += step.lines_modified();
            any_modified |= step.modified();
            changes.extend_from_slice(step.changes_applied());
            warnings.extend_from_slice(step.warnings());
            current = step.into_modified_content();
        }

        OutcomeReport::succeeded(
            content,
            Transformation {
                text: current,
                modified: any_modified,
                lines_modified,
                changes,
                warnings,
            },
            elapsed_ms(start),
        )
    }

    fn run(&self, content: &str, op: &Operation) -> Result<Transformation, EngineError> {
        let (re, op) = self.prepare(op)?;
        Ok(match op {
            Prepared::Substitute {
                replacement,
                global,
            } => substitute(&re, content, replacement, global),
            Prepared::Delete => delete_lines(&re, content),
            Prepared::Print => print_lines(&re, content),
        })
    }

    /// Validation and compilation share one path so `execute` re-checks
    /// exactly what `validate` checks.
    fn prepare<'a>(&self, op: &'a Operation) -> Result<(Regex, Prepared<'a>), EngineError> {
        let kind = op.kind();
        if !self.supports(kind) {
            return Err(EngineError::UnsupportedKind(kind));
        }

        let (pattern, flags, prepared) = match op {
            Operation::Substitute {
                pattern,
                replacement,
                flags,
            } => (
                pattern.as_str(),
                *flags,
                Prepared::Substitute {
                    replacement: replacement.as_str(),
                    global: flags.global,
                },
            ),
            Operation::Delete { selector, flags } => {
                (selected_pattern(kind, selector)?, *flags, Prepared::Delete)
            }
            Operation::Print { selector, flags } => {
                (selected_pattern(kind, selector)?, *flags, Prepared::Print)
            }
            _ => return Err(EngineError::UnsupportedKind(kind)),
        };

        if pattern.trim().is_empty() {
            return Err(EngineError::MissingPattern(kind));
        }

        let re = self.compile(pattern, &flags)?;
        Ok((re, prepared))
    }

    fn compile(&self, pattern: &str, flags: &Flags) -> Result<Regex, EngineError> {
        Ok(compile_pattern(pattern, flags, &self.limits)?)
    }
}

/// An operation that passed validation, reduced to what its algorithm needs.
enum Prepared<'a> {
    Substitute { replacement: &'a str, global: bool },
    Delete,
    Print,
}

fn selected_pattern(kind: OperationKind, selector: &Selector) -> Result<&str, EngineError> {
    match selector {
        Selector::Pattern(pattern) => Ok(pattern),
        Selector::Address(address) if address.trim().is_empty() => {
            Err(EngineError::MissingPattern(kind))
        }
        Selector::Address(address) => Err(EngineError::UnsupportedAddress {
            kind,
            address: address.clone(),
        }),
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Replace the first match, or every non-overlapping match when `global`,
/// across the whole text.
fn substitute(re: &Regex, content: &str, replacement: &str, global: bool) -> Transformation {
    let mut result = String::with_capacity(content.len());
    let mut changes = Vec::new();
    let mut last_end = 0;

    for caps in re.captures_iter(content) {
        let Some(mat) = caps.get(0) else {
            continue;
        };

        let mut expanded = String::new();
        caps.expand(replacement, &mut expanded);

        result.push_str(&content[last_end..mat.start()]);
        result.push_str(&expanded);
        changes.push(format!("Replaced '{}' with '{}'", mat.as_str(), expanded));
        last_end = mat.end();

        if !global {
            break;
        }
    }
    result.push_str(&content[last_end..]);

    let modified = result != content;
    Transformation {
        text: result,
        modified,
        lines_modified: changes.len(),
        changes,
        warnings: Vec::new(),
    }
}

/// Drop every line the pattern matches.
fn delete_lines(re: &Regex, content: &str) -> Transformation {
    let mut kept = Vec::new();
    let mut changes = Vec::new();

    for (i, line) in content.split('\n').enumerate() {
        if re.is_match(line) {
            changes.push(format!("Deleted line {}: '{}'", i + 1, line));
        } else {
            kept.push(line);
        }
    }

    let result = kept.join("\n");
    let modified = result != content;
    Transformation {
        text: result,
        modified,
        lines_modified: changes.len(),
        changes,
        warnings: Vec::new(),
    }
}

/// Keep only the lines the pattern matches.
fn print_lines(re: &Regex, content: &str) -> Transformation {
    let mut matched = Vec::new();
    let mut changes = Vec::new();

    for (i, line) in content.split('\n').enumerate() {
        if re.is_match(line) {
            matched.push(line);
            changes.push(format!("Matched line {}: '{}'", i + 1, line));
        }
    }

    Transformation {
        text: matched.join("\n"),
        // Filtering always counts as a modification, even when nothing was dropped.
        modified: true,
        lines_modified: matched.len(),
        changes,
        warnings: Vec::new(),
    }
}

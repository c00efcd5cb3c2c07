//! Result of applying one or more operations

use serde::Serialize;

/// Immutable account of an execute, preview or batch call.
///
/// A failed report always carries an error and leaves `modified_content`
/// equal to `original_content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeReport {
    original_content: String,
    modified_content: String,
    modified: bool,
    lines_modified: usize,
    changes_applied: Vec<String>,
    warnings: Vec<String>,
    success: bool,
    error: Option<String>,
    execution_time_ms: u64,
}

/// What a single algorithm produced, before timing is attached.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Transformation {
    pub text: String,
    pub modified: bool,
    pub lines_modified: usize,
    pub changes: Vec<String>,
    pub warnings: Vec<String>,
}

impl OutcomeReport {
    pub(crate) fn succeeded(
        original: &str,
        transformation: Transformation,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            original_content: original.to_string(),
            modified_content: transformation.text,
            modified: transformation.modified,
            lines_modified: transformation.lines_modified,
            changes_applied: transformation.changes,
            warnings: transformation.warnings,
            success: true,
            error: None,
            execution_time_ms,
        }
    }

    pub(crate) fn failure(original: &str, error: impl Into<String>, execution_time_ms: u64) -> Self {
        Self {
            original_content: original.to_string(),
            modified_content: original.to_string(),
            modified: false,
            lines_modified: 0,
            changes_applied: Vec::new(),
            warnings: Vec::new(),
            success: false,
            error: Some(error.into()),
            execution_time_ms,
        }
    }

    /// Failure that keeps the log of the steps that ran before it.
    pub(crate) fn with_history(mut self, changes: Vec<String>, warnings: Vec<String>) -> Self {
        self.changes_applied = changes;
        self.warnings = warnings;
        self
    }

    pub fn original_content(&self) -> &str {
        &self.original_content
    }

    pub fn modified_content(&self) -> &str {
        &self.modified_content
    }

    pub fn into_modified_content(self) -> String {
        self.modified_content
    }

    /// For substitute/delete: the text changed. For print: always true on success.
    pub fn modified(&self) -> bool {
        self.modified
    }

    pub fn lines_modified(&self) -> usize {
        self.lines_modified
    }

    pub fn changes_applied(&self) -> &[String] {
        &self.changes_applied
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn execution_time_ms(&self) -> u64 {
        self.execution_time_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_keeps_original_content() {
        let report = OutcomeReport::failure("abc", "boom", 3);
        assert!(!report.success());
        assert_eq!(report.modified_content(), "abc");
        assert_eq!(report.original_content(), "abc");
        assert_eq!(report.error(), Some("boom"));
        assert!(!report.modified());
        assert_eq!(report.execution_time_ms(), 3);
    }

    #[test]
    fn test_serializes_camel_case() {
        let report = OutcomeReport::succeeded(
            "a",
            Transformation {
                text: "b".to_string(),
                modified: true,
                lines_modified: 1,
                changes: vec!["Replaced 'a' with 'b'".to_string()],
                warnings: Vec::new(),
            },
            0,
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["modifiedContent"], "b");
        assert_eq!(json["linesModified"], 1);
        assert_eq!(json["executionTimeMs"], 0);
        assert!(json["error"].is_null());
        assert_eq!(json["changesApplied"].as_array().unwrap().len(), 1);
    }
}

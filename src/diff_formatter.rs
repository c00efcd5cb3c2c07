use colored::*;
use similar::{ChangeTag, TextDiff};
use std::io::IsTerminal;

use crate::outcome::OutcomeReport;

pub struct DiffFormatter;

impl DiffFormatter {
    /// Auto-detect if we should use colors
    pub fn should_use_color(enabled: bool) -> bool {
        // Check NO_COLOR env var (https://no-color.org/)
        if !enabled || std::env::var_os("NO_COLOR").is_some() {
            return false;
        }

        std::io::stdout().is_terminal()
    }

    /// Plain-text summary of a report, as returned by the RPC tools
    pub fn format_outcome(report: &OutcomeReport) -> String {
        if !report.success() {
            return format!("❌ Error: {}", report.error().unwrap_or("unknown error"));
        }

        let mut output = String::new();
        output.push_str("✅ Success!\n");
        output.push_str(&format!("Modified: {}\n", report.modified()));
        output.push_str(&format!("Lines modified: {}\n", report.lines_modified()));
        output.push_str(&format!("Execution time: {}ms\n\n", report.execution_time_ms()));
        output.push_str("Result:\n");
        output.push_str(report.modified_content());

        if !report.changes_applied().is_empty() {
            output.push_str("\n\nChanges applied:\n");
            for change in report.changes_applied() {
                output.push_str(&format!("- {}\n", change));
            }
        }

        if report.has_warnings() {
            output.push_str("\nWarnings:\n");
            for warning in report.warnings() {
                output.push_str(&format!("- {}\n", warning));
            }
        }

        output
    }

    /// Line diff between input and output with `context_size` unchanged lines
    /// around each change, followed by the change log.
    pub fn format_preview(report: &OutcomeReport, context_size: usize, use_color: bool) -> String {
        let mut output = String::new();

        if !report.success() {
            let error = report.error().unwrap_or("unknown error");
            if use_color {
                output.push_str(&format!("{} {}\n", "Error:".red().bold(), error));
            } else {
                output.push_str(&format!("Error: {}\n", error));
            }
            return output;
        }

        if use_color {
            output.push_str(&format!("{}\n", "🔍 Preview".bold().cyan()));
        } else {
            output.push_str("Preview\n");
        }

        let diff = TextDiff::from_lines(report.original_content(), report.modified_content());
        let groups = diff.grouped_ops(context_size);

        if groups.is_empty() {
            output.push_str("No changes would be made.\n");
        }

        for (group_idx, group) in groups.iter().enumerate() {
            if group_idx > 0 {
                if use_color {
                    output.push_str(&format!("{}\n", "...".dimmed()));
                } else {
                    output.push_str("...\n");
                }
            }

            for op in group {
                for change in diff.iter_changes(op) {
                    let (indicator, line_num) = match change.tag() {
                        ChangeTag::Equal => ("=", change.new_index()),
                        ChangeTag::Delete => ("-", change.old_index()),
                        ChangeTag::Insert => ("+", change.new_index()),
                    };
                    let line_num = line_num.map(|n| n + 1).unwrap_or(0);
                    let content = change.value().trim_end_matches('\n');

                    if use_color {
                        let colored_line = match change.tag() {
                            ChangeTag::Equal => format!("L{}: {} {}\n", line_num, indicator.dimmed(), content.dimmed()),
                            ChangeTag::Delete => format!("L{}: {} {}\n", line_num, indicator.red().bold(), content.red()),
                            ChangeTag::Insert => format!("L{}: {} {}\n", line_num, indicator.green().bold(), content.green().bold()),
                        };
                        output.push_str(&colored_line);
                    } else {
                        output.push_str(&format!("L{}: {} {}\n", line_num, indicator, content));
                    }
                }
            }
        }

        output.push_str(&Self::format_summary(report, use_color));
        output
    }

    fn format_summary(report: &OutcomeReport, use_color: bool) -> String {
        let mut output = String::new();
        let count = report.lines_modified();

        if use_color {
            output.push_str(&format!(
                "\nTotal: {} change{}\n",
                count.to_string().bold().white(),
                if count == 1 { "" } else { "s" }
            ));
        } else {
            output.push_str(&format!(
                "\nTotal: {} change{}\n",
                count,
                if count == 1 { "" } else { "s" }
            ));
        }

        for change in report.changes_applied() {
            if use_color {
                output.push_str(&format!("  {} {}\n", "•".yellow(), change));
            } else {
                output.push_str(&format!("  - {}\n", change));
            }
        }

        for warning in report.warnings() {
            if use_color {
                output.push_str(&format!("  {} {}\n", "warning:".yellow().bold(), warning));
            } else {
                output.push_str(&format!("  warning: {}\n", warning));
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Engine, Operation};

    #[test]
    fn test_format_outcome_success() {
        let report = Engine::new().preview("hello world", &Operation::substitute("world", "there", ""));
        let text = DiffFormatter::format_outcome(&report);

        assert!(text.starts_with("✅ Success!"));
        assert!(text.contains("Modified: true"));
        assert!(text.contains("Lines modified: 1"));
        assert!(text.contains("Result:\nhello there"));
        assert!(text.contains("- Replaced 'world' with 'there'"));
    }

    #[test]
    fn test_format_outcome_failure() {
        let report = Engine::new().execute("x", &Operation::delete("(", ""));
        let text = DiffFormatter::format_outcome(&report);
        assert!(text.starts_with("❌ Error: Invalid regex pattern"));
    }

    #[test]
    fn test_format_preview_plain() {
        let content = "one\ntwo\nthree\nfour\nfive\nsix\nseven\neight";
        let report = Engine::new().preview(content, &Operation::delete("^two$", ""));
        let text = DiffFormatter::format_preview(&report, 1, false);

        assert!(text.contains("L1: = one"));
        assert!(text.contains("L2: - two"));
        assert!(text.contains("L2: = three"));
        assert!(!text.contains("six"));
        assert!(text.contains("Total: 1 change\n"));
        assert!(text.contains("- Deleted line 2: 'two'"));
    }

    #[test]
    fn test_format_preview_no_changes() {
        let report = Engine::new().preview("abc", &Operation::substitute("z", "y", ""));
        let text = DiffFormatter::format_preview(&report, 2, false);
        assert!(text.contains("No changes would be made."));
        assert!(text.contains("Total: 0 changes"));
    }
}

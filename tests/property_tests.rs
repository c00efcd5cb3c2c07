//! Property-based tests for sedmcp
//!
//! This module uses proptest to verify core invariants of the engine.
//! Property-based testing generates hundreds of random inputs to verify
//! that certain properties always hold true.

use regex::Regex;

use sedmcp::{Engine, Operation};

// Import proptest macro
use proptest::prelude::*;

/// Patterns that always compile and match some of the generated text.
fn live_pattern() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("a"),
        Just("b+"),
        Just("ab"),
        Just("[ac]"),
        Just("^c"),
        Just("a$"),
        Just(r"\s"),
    ]
}

/// Text over a small alphabet so the live patterns hit often.
fn text() -> impl Strategy<Value = String> {
    "[abc \n]{0,80}"
}

fn valid_op() -> impl Strategy<Value = Operation> {
    prop_oneof![
        (live_pattern(), "[a-z]{0,3}", any::<bool>()).prop_map(|(p, r, g)| {
            Operation::substitute(p, r, if g { "g" } else { "" })
        }),
        live_pattern().prop_map(|p| Operation::delete(p, "")),
        live_pattern().prop_map(|p| Operation::print(p, "")),
    ]
}

// ============================================================================
// Property 1: No-match identity
// ============================================================================
// Substitute and delete leave content untouched when nothing matches

proptest! {
    #[test]
    fn prop_substitute_no_match_is_identity(
        text in "[a-m \n]{0,100}",
        pattern in "[x-z]{1,5}",
        global in any::<bool>()
    ) {
        let op = Operation::substitute(pattern, "REPLACED", if global { "g" } else { "" });
        let result = Engine::new().execute(&text, &op);

        prop_assert!(result.success());
        prop_assert_eq!(result.modified_content(), text.as_str());
        prop_assert!(!result.modified());
        prop_assert_eq!(result.lines_modified(), 0);
        prop_assert!(result.changes_applied().is_empty());
    }

    #[test]
    fn prop_delete_no_match_is_identity(
        text in "[a-m \n]{0,100}",
        pattern in "[x-z]{1,5}"
    ) {
        let result = Engine::new().execute(&text, &Operation::delete(pattern, ""));

        prop_assert!(result.success());
        prop_assert_eq!(result.modified_content(), text.as_str());
        prop_assert!(!result.modified());
        prop_assert_eq!(result.lines_modified(), 0);
    }
}

// ============================================================================
// Property 2: Substitution counts
// ============================================================================
// Global substitution reports one change per match; non-global at most one

proptest! {
    #[test]
    fn prop_global_count_equals_match_count(
        text in text(),
        pattern in live_pattern()
    ) {
        let expected = Regex::new(pattern).unwrap().find_iter(&text).count();
        let result = Engine::new().execute(&text, &Operation::substitute(pattern, "X", "g"));

        prop_assert!(result.success());
        prop_assert_eq!(result.lines_modified(), expected);
        prop_assert_eq!(result.changes_applied().len(), expected);
    }

    #[test]
    fn prop_non_global_replaces_at_most_once(
        text in text(),
        pattern in live_pattern()
    ) {
        let re = Regex::new(pattern).unwrap();
        let result = Engine::new().execute(&text, &Operation::substitute(pattern, "X", ""));

        prop_assert!(result.success());
        prop_assert!(result.lines_modified() <= 1);
        prop_assert_eq!(result.lines_modified() == 1, re.is_match(&text));
        let expected = re.replace(&text, "X").into_owned();
        prop_assert_eq!(result.modified_content(), expected.as_str());
    }

    /// An escaped literal pattern with a `$`-free replacement behaves like str::replace
    #[test]
    fn prop_literal_global_matches_str_replace(
        text in "[a-d.*+ ]{0,60}",
        needle in "[a-d.*+]{1,3}",
        replacement in "[A-Z]{0,4}"
    ) {
        let op = Operation::substitute(regex::escape(&needle), replacement.clone(), "g");
        let result = Engine::new().execute(&text, &op);

        prop_assert!(result.success());
        prop_assert_eq!(result.modified_content(), text.replace(&needle, &replacement));
    }
}

// ============================================================================
// Property 3: Line filtering
// ============================================================================
// Delete drops exactly the matching lines; print keeps exactly them

proptest! {
    #[test]
    fn prop_delete_line_accounting(
        text in text(),
        pattern in live_pattern()
    ) {
        let re = Regex::new(pattern).unwrap();
        let lines: Vec<&str> = text.split('\n').collect();
        let deleted = lines.iter().filter(|l| re.is_match(l)).count();
        let kept: Vec<&str> = lines.iter().copied().filter(|l| !re.is_match(l)).collect();

        let result = Engine::new().execute(&text, &Operation::delete(pattern, ""));

        prop_assert!(result.success());
        prop_assert_eq!(result.lines_modified(), deleted);
        prop_assert_eq!(kept.len() + deleted, lines.len());
        prop_assert_eq!(result.modified_content(), kept.join("\n"));
        prop_assert!(result
            .changes_applied()
            .iter()
            .all(|c| c.starts_with("Deleted line ")));
    }

    #[test]
    fn prop_print_keeps_matching_lines(
        text in text(),
        pattern in live_pattern()
    ) {
        let re = Regex::new(pattern).unwrap();
        let matched: Vec<&str> = text.split('\n').filter(|l| re.is_match(l)).collect();

        let result = Engine::new().execute(&text, &Operation::print(pattern, ""));

        prop_assert!(result.success());
        prop_assert!(result.modified());
        prop_assert_eq!(result.lines_modified(), matched.len());
        prop_assert_eq!(result.modified_content(), matched.join("\n"));
    }
}

// ============================================================================
// Property 4: Batch composition
// ============================================================================
// A batch is the left fold of its steps; any failure returns the original

proptest! {
    #[test]
    fn prop_batch_equals_fold(
        text in text(),
        ops in prop::collection::vec(valid_op(), 0..6)
    ) {
        let engine = Engine::new();
        let batch = engine.execute_batch(&text, &ops);

        let mut current = text.clone();
        let mut lines = 0;
        let mut changes = Vec::new();
        for op in &ops {
            let step = engine.execute(&current, op);
            prop_assert!(step.success());
            lines += step.lines_modified();
            changes.extend_from_slice(step.changes_applied());
            current = step.into_modified_content();
        }

        prop_assert!(batch.success());
        prop_assert_eq!(batch.original_content(), text.as_str());
        prop_assert_eq!(batch.modified_content(), current.as_str());
        prop_assert_eq!(batch.lines_modified(), lines);
        prop_assert_eq!(batch.changes_applied(), changes.as_slice());
    }

    #[test]
    fn prop_batch_failure_returns_original(
        text in text(),
        ops in prop::collection::vec(valid_op(), 0..5),
        bad_at in 0usize..5,
        tail in "[a-z]{0,4}"
    ) {
        let mut ops = ops;
        let bad_at = bad_at.min(ops.len());
        ops.insert(bad_at, Operation::delete(format!("({}", tail), ""));

        let result = Engine::new().execute_batch(&text, &ops);

        prop_assert!(!result.success());
        prop_assert!(!result.modified());
        prop_assert_eq!(result.lines_modified(), 0);
        prop_assert_eq!(result.modified_content(), text.as_str());
        let error = result.error().unwrap();
        let expected_prefix = format!("Batch operation failed at step {}:", bad_at + 1);
        prop_assert!(error.starts_with(&expected_prefix), "error was: {}", error);
    }
}

// ============================================================================
// Property 5: Preview agreement and invalid patterns
// ============================================================================

proptest! {
    #[test]
    fn prop_preview_agrees_with_execute(
        text in text(),
        op in valid_op()
    ) {
        let engine = Engine::new();
        let executed = engine.execute(&text, &op);
        let previewed = engine.preview(&text, &op);

        prop_assert_eq!(previewed.success(), executed.success());
        prop_assert_eq!(previewed.modified_content(), executed.modified_content());
        prop_assert_eq!(previewed.modified(), executed.modified());
        prop_assert_eq!(previewed.lines_modified(), executed.lines_modified());
        prop_assert_eq!(previewed.changes_applied(), executed.changes_applied());
        prop_assert_eq!(previewed.execution_time_ms(), 0);
    }

    #[test]
    fn prop_unbalanced_group_is_rejected(
        text in text(),
        tail in "[a-z]{0,6}"
    ) {
        let engine = Engine::new();
        let op = Operation::substitute(format!("({}", tail), "x", "g");

        prop_assert!(engine.validate(&op).is_err());

        let result = engine.execute(&text, &op);
        prop_assert!(!result.success());
        prop_assert_eq!(result.modified_content(), text.as_str());
        prop_assert!(result.error().unwrap().starts_with("Invalid regex pattern"));
    }
}

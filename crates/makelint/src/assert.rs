//! Panicking assertions for use in Makefile test suites.
//!
//! Each assertion runs one validator from [`crate::validate`] and panics with a readable
//! message when it fails, so a project can check its own Makefile from a plain `#[test]`:
//!
//! ```
//! use makelint::{assert, parse_makefile};
//!
//! let rules = parse_makefile(".PHONY: test\ntest: ## Runs the tests\ntest:\n\tcargo test\n")?;
//!
//! assert::assert_has_valid_phony_target_declarations(&rules);
//! assert::assert_no_duplicate_target(&rules);
//! # Ok::<(), makelint::ParseError>(())
//! ```

use crate::makefile::Rule;
use crate::validate::{
    check_command_declarations, check_no_duplicate_target, check_single_prerequisite_phony,
    ValidationError,
};

/// Renders a validation failure the way the assertions report it.
///
/// The message reads `Failed asserting that <failure>.`; target mismatches are followed by a
/// unified diff of the expected and actual targets.
#[must_use]
pub fn failure_message(error: &ValidationError) -> String {
    let diff = error
        .comparison()
        .map(|(expected, actual)| {
            format!("\n--- Expected\n+++ Actual\n@@ @@\n-{expected}\n+{actual}")
        })
        .unwrap_or_default();

    format!("Failed asserting that {error}.{diff}\n")
}

/// Asserts that the rule is a `.PHONY` declaration with one and only one prerequisite.
///
/// # Panics
///
/// Panics with the rendered failure if the check fails.
#[track_caller]
pub fn assert_single_prerequisite_phony(rule: &Rule) {
    assert_single_prerequisite_phony_with_message(rule, "");
}

/// Same as [`assert_single_prerequisite_phony`], with `message` on the line before the failure.
///
/// # Panics
///
/// Panics with the message and the rendered failure if the check fails.
#[track_caller]
pub fn assert_single_prerequisite_phony_with_message(rule: &Rule, message: &str) {
    report(check_single_prerequisite_phony(rule), message);
}

/// Asserts that every `.PHONY` declaration names a single target, optionally followed by a
/// `##` help comment for it, and then by the rule declaring the command itself.
///
/// # Panics
///
/// Panics with the rendered failure if the check fails.
#[track_caller]
pub fn assert_has_valid_phony_target_declarations(rules: &[Rule]) {
    assert_has_valid_phony_target_declarations_with_message(rules, "");
}

/// Same as [`assert_has_valid_phony_target_declarations`], with `message` on the line before
/// the failure.
///
/// # Panics
///
/// Panics with the message and the rendered failure if the check fails.
#[track_caller]
pub fn assert_has_valid_phony_target_declarations_with_message(rules: &[Rule], message: &str) {
    report(check_command_declarations(rules), message);
}

/// Asserts that no target is declared twice.
///
/// # Panics
///
/// Panics with the rendered failure if the check fails.
#[track_caller]
pub fn assert_no_duplicate_target(rules: &[Rule]) {
    assert_no_duplicate_target_with_message(rules, "");
}

/// Same as [`assert_no_duplicate_target`], with `message` on the line before the failure.
///
/// # Panics
///
/// Panics with the message and the rendered failure if the check fails.
#[track_caller]
pub fn assert_no_duplicate_target_with_message(rules: &[Rule], message: &str) {
    report(check_no_duplicate_target(rules), message);
}

#[track_caller]
fn report(result: Result<(), ValidationError>, message: &str) {
    let Err(error) = result else {
        return;
    };

    if message.is_empty() {
        panic!("{}", failure_message(&error));
    }

    panic!("{message}\n{}", failure_message(&error));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_without_comparison() {
        let error = ValidationError::PrerequisiteCount {
            rule: ".PHONY:".to_owned(),
            count: 0,
        };

        assert_eq!(
            failure_message(&error),
            "Failed asserting that the rule \".PHONY:\" has one and only one pre-requisite. 0 pre-requisite found.\n"
        );
    }

    #[test]
    fn test_message_with_target_diff() {
        let rules = [
            Rule::phony(["command2"]),
            Rule::new("command1", ["## Command1 Help"]),
            Rule::new("command1", ["progA", "progB"]),
        ];
        let error = check_command_declarations(&rules).unwrap_err();

        assert_eq!(
            failure_message(&error),
            "Failed asserting that the rule \"command1: ## Command1 Help\" has the same target as the previous PHONY declaration.
--- Expected
+++ Actual
@@ @@
-command2
+command1
"
        );
    }

    #[test]
    fn test_plain_comment_message() {
        let rules = [
            Rule::phony(["command1"]),
            Rule::new("command1", ["# Command1 Help"]),
            Rule::new("command1", ["progA", "progB"]),
        ];
        let error = check_command_declarations(&rules).unwrap_err();

        assert_eq!(
            failure_message(&error),
            "Failed asserting that the rule \"command1: # Command1 Help\" is a command help comment. It should either start with \"##\" to be one or made into a simple Makefile comment (without the target declaration).\n"
        );
    }

    #[test]
    fn test_passing_assertions() {
        assert_single_prerequisite_phony(&Rule::phony(["command"]));
        assert_has_valid_phony_target_declarations(&[
            Rule::phony(["command"]),
            Rule::new("command", ["## Command Help"]),
            Rule::new("command", ["progA", "progB"]),
        ]);
        assert_no_duplicate_target(&[
            Rule::new("command", ["## Command Help"]),
            Rule::new("command", ["progA", "progB"]),
        ]);
    }

    #[test]
    #[should_panic(expected = "Failed asserting that the rule \"command: object\" is not a .PHONY rule.")]
    fn test_non_phony_rule_panics() {
        assert_single_prerequisite_phony(&Rule::new("command", ["object"]));
    }

    #[test]
    #[should_panic(expected = "Found 2 declarations.")]
    fn test_duplicate_target_panics() {
        assert_no_duplicate_target(&[Rule::new("a", ["x"]), Rule::new("a", ["y"])]);
    }

    #[test]
    #[should_panic(expected = "More than one found.")]
    fn test_second_help_comment_panics() {
        assert_has_valid_phony_target_declarations(&[
            Rule::phony(["command1"]),
            Rule::new("command1", ["## Command1 Help1"]),
            Rule::new("command1", ["## Command1 Help2"]),
            Rule::new("command1", ["progA", "progB"]),
        ]);
    }

    #[test]
    fn test_passing_assertions_with_message() {
        assert_single_prerequisite_phony_with_message(&Rule::phony(["command"]), "phony");
        assert_no_duplicate_target_with_message(&[Rule::new("command", ["x"])], "duplicates");
    }

    #[test]
    #[should_panic(
        expected = "root Makefile\nFailed asserting that the target \"a\" is declared only once. Found 2 declarations.\n"
    )]
    fn test_custom_message_precedes_failure() {
        assert_no_duplicate_target_with_message(
            &[Rule::new("a", ["x"]), Rule::new("a", ["y"])],
            "root Makefile",
        );
    }

    #[test]
    #[should_panic(expected = "release targets\nFailed asserting that the rule \"command1: ## Command1 Help\"")]
    fn test_custom_message_with_target_diff() {
        assert_has_valid_phony_target_declarations_with_message(
            &[
                Rule::phony(["command2"]),
                Rule::new("command1", ["## Command1 Help"]),
                Rule::new("command1", ["progA", "progB"]),
            ],
            "release targets",
        );
    }

    #[test]
    #[should_panic(expected = "phony line\nFailed asserting that the rule \".PHONY: a b\" has one")]
    fn test_custom_message_on_single_rule() {
        assert_single_prerequisite_phony_with_message(&Rule::phony(["a", "b"]), "phony line");
    }
}

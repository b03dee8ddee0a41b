//! Structural checks over parsed Makefile rules.
//!
//! These validators enforce the conventions of self-documenting Makefiles, where every
//! command is declared as:
//!
//! ```makefile
//! .PHONY: test
//! test:       ## Runs the tests
//! test: vendor
//! 	cargo test
//! ```
//!
//! i.e. a `.PHONY` declaration naming exactly one target, an optional `##` help comment bound
//! to that target, then the rule itself. Each validator stops at the first violation.

use crate::makefile::Rule;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// A structural violation found in a list of rules.
///
/// The messages complete the sentence "Failed asserting that ...", which is how
/// [`crate::assert`] renders them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The rules came from an untyped source and were not a list of rules.
    #[error("the value to be an array of \"Rule\" instances. Got \"{got}\"")]
    InvalidInput {
        /// Description of what was found instead.
        got: String,
    },

    /// The rules came from an untyped source as an array, but not every item was a rule.
    #[error(
        "the value to be an array of \"Rule\" instances. Got an array with an item that is not a \"Rule\""
    )]
    InvalidItem,

    /// A target is declared by more than one non-comment rule.
    #[error("the target \"{target}\" is declared only once. Found {count} declarations")]
    DuplicateTarget {
        /// The repeated target.
        target: String,
        /// How many rules declare it.
        count: usize,
    },

    /// A rule expected to be a `.PHONY` declaration is not one.
    #[error("the rule \"{rule}\" is not a .PHONY rule")]
    NotPhony {
        /// The rendered rule.
        rule: String,
    },

    /// A `.PHONY` declaration does not name exactly one target.
    #[error(
        "the rule \"{rule}\" has one and only one pre-requisite. {count} pre-requisite{} found",
        plural_suffix(.count)
    )]
    PrerequisiteCount {
        /// The rendered rule.
        rule: String,
        /// The number of prerequisites found.
        count: usize,
    },

    /// A `.PHONY` declaration is the last rule.
    #[error("the rule \"{rule}\" is valid. No rule found after its declaration")]
    MissingCommand {
        /// The rendered `.PHONY` rule.
        rule: String,
    },

    /// A second `.PHONY` declaration appears before the command was declared.
    #[error(
        "the rule \"{rule}\" is valid. Cannot have multiple PHONY targets mixed up in a command declaration"
    )]
    MultiplePhony {
        /// The rendered offending `.PHONY` rule.
        rule: String,
    },

    /// A rule following a `.PHONY` declaration binds a different target.
    #[error("the rule \"{rule}\" has the same target as the previous PHONY declaration")]
    TargetMismatch {
        /// The rendered offending rule.
        rule: String,
        /// The target named by the `.PHONY` declaration.
        expected: String,
        /// The target the rule actually declares.
        actual: String,
    },

    /// The help comment of a command uses `#` instead of `##`.
    #[error(
        "the rule \"{rule}\" is a command help comment. It should either start with \"##\" to be one or made into a simple Makefile comment (without the target declaration)"
    )]
    NotCommandComment {
        /// The rendered comment rule.
        rule: String,
    },

    /// A command has a second help comment where its rule should be.
    #[error(
        "the rule \"{rule}\" is a command rule. A command should either have no help comment or only one. More than one found"
    )]
    MultipleHelpComments {
        /// The rendered second comment rule.
        rule: String,
    },
}

impl ValidationError {
    /// The expected and actual values for failures that are best shown as a diff.
    #[must_use]
    pub fn comparison(&self) -> Option<(&str, &str)> {
        match self {
            Self::TargetMismatch {
                expected, actual, ..
            } => Some((expected, actual)),
            _ => None,
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn plural_suffix(count: &usize) -> &'static str {
    if *count > 1 {
        "s"
    } else {
        ""
    }
}

/// Loads rules from a JSON dump such as the one `makelint --json` prints.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidInput`] naming the JSON type found when the value is not
/// an array, and [`ValidationError::InvalidItem`] when one of its items is not a rule.
pub fn rules_from_json(json: &str) -> Result<Vec<Rule>, ValidationError> {
    let kind = json_kind(json);

    if kind != "array" {
        return Err(ValidationError::InvalidInput {
            got: kind.to_owned(),
        });
    }

    facet_json::from_str::<Vec<Rule>>(json).map_err(|error| {
        debug!(%error, "array item is not a rule");
        ValidationError::InvalidItem
    })
}

fn json_kind(json: &str) -> &'static str {
    match json.trim_start().chars().next() {
        None => "nothing",
        Some('[') => "array",
        Some('{') => "object",
        Some('"') => "string",
        Some('t' | 'f') => "boolean",
        Some('n') => "null",
        Some('-' | '0'..='9') => "number",
        Some(_) => "invalid JSON",
    }
}

/// Runs every structural check over a Makefile's rules.
///
/// Command declarations are checked first, then duplicated targets.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found.
pub fn validate(rules: &[Rule]) -> Result<(), ValidationError> {
    check_command_declarations(rules)?;
    check_no_duplicate_target(rules)?;

    Ok(())
}

/// Checks that no target is declared by more than one rule.
///
/// `.PHONY` declarations and comment rules (`target: ## help`) are not declarations of
/// their target and are not counted.
///
/// # Errors
///
/// Returns [`ValidationError::DuplicateTarget`] for the first target, in order of
/// appearance, that is declared more than once.
pub fn check_no_duplicate_target(rules: &[Rule]) -> Result<(), ValidationError> {
    let declarations: Vec<&str> = rules
        .iter()
        .filter(|rule| !rule.is_phony() && !rule.is_comment())
        .map(Rule::target)
        .collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for target in declarations.iter().copied() {
        *counts.entry(target).or_default() += 1;
    }

    for target in declarations {
        let count = counts.get(target).copied().unwrap_or_default();

        if count > 1 {
            return Err(ValidationError::DuplicateTarget {
                target: target.to_owned(),
                count,
            });
        }
    }

    Ok(())
}

/// Checks that a rule is a `.PHONY` declaration with exactly one prerequisite.
///
/// # Errors
///
/// Returns [`ValidationError::NotPhony`] or [`ValidationError::PrerequisiteCount`].
pub fn check_single_prerequisite_phony(rule: &Rule) -> Result<(), ValidationError> {
    if !rule.is_phony() {
        return Err(ValidationError::NotPhony {
            rule: rule.to_string(),
        });
    }

    let count = rule.prerequisites().len();
    if count != 1 {
        return Err(ValidationError::PrerequisiteCount {
            rule: rule.to_string(),
            count,
        });
    }

    Ok(())
}

/// Where the command declaration check stands after consuming a rule.
#[derive(Debug)]
enum DeclarationState<'r> {
    /// Outside of any command declaration.
    Scanning,
    /// A `.PHONY` declaration was seen: a help comment or the command comes next.
    ExpectCommentOrCommand { phony: &'r Rule, target: &'r str },
    /// The help comment was consumed: the command comes next.
    ExpectCommand { phony: &'r Rule, target: &'r str },
}

/// Checks that every `.PHONY` declaration introduces a well-formed command.
///
/// Rules outside of a declaration are ignored. Once a `.PHONY` rule is found it must name a
/// single target, and the next rules must be an optional `##` help comment for that target
/// followed by the target's own rule.
///
/// # Errors
///
/// Returns the first violation: an invalid `.PHONY` rule, a missing command, a second
/// `.PHONY` rule inside the declaration, a target mismatch, a `#` help comment or a second
/// help comment.
pub fn check_command_declarations(rules: &[Rule]) -> Result<(), ValidationError> {
    let state = rules
        .iter()
        .try_fold(DeclarationState::Scanning, advance_declaration)?;

    match state {
        DeclarationState::Scanning => Ok(()),
        DeclarationState::ExpectCommentOrCommand { phony, .. }
        | DeclarationState::ExpectCommand { phony, .. } => Err(ValidationError::MissingCommand {
            rule: phony.to_string(),
        }),
    }
}

fn advance_declaration<'r>(
    state: DeclarationState<'r>,
    rule: &'r Rule,
) -> Result<DeclarationState<'r>, ValidationError> {
    match state {
        DeclarationState::Scanning => {
            if !rule.is_phony() {
                return Ok(DeclarationState::Scanning);
            }

            check_single_prerequisite_phony(rule)?;

            let target = rule
                .prerequisites()
                .first()
                .map(String::as_str)
                .ok_or_else(|| ValidationError::PrerequisiteCount {
                    rule: rule.to_string(),
                    count: 0,
                })?;

            Ok(DeclarationState::ExpectCommentOrCommand {
                phony: rule,
                target,
            })
        }

        DeclarationState::ExpectCommentOrCommand { phony, target } => {
            check_not_phony(rule)?;

            if rule.is_comment() {
                check_command_comment(rule, target)?;

                Ok(DeclarationState::ExpectCommand { phony, target })
            } else {
                check_command_rule(rule, target)?;

                Ok(DeclarationState::Scanning)
            }
        }

        DeclarationState::ExpectCommand { target, .. } => {
            check_not_phony(rule)?;
            check_command_rule(rule, target)?;

            Ok(DeclarationState::Scanning)
        }
    }
}

fn check_not_phony(rule: &Rule) -> Result<(), ValidationError> {
    if rule.is_phony() {
        return Err(ValidationError::MultiplePhony {
            rule: rule.to_string(),
        });
    }

    Ok(())
}

fn check_command_comment(rule: &Rule, phony_target: &str) -> Result<(), ValidationError> {
    check_target_is_matching(rule, phony_target)?;

    if !rule.is_command_comment() {
        return Err(ValidationError::NotCommandComment {
            rule: rule.to_string(),
        });
    }

    Ok(())
}

fn check_command_rule(rule: &Rule, phony_target: &str) -> Result<(), ValidationError> {
    check_target_is_matching(rule, phony_target)?;

    if rule.is_command_comment() {
        return Err(ValidationError::MultipleHelpComments {
            rule: rule.to_string(),
        });
    }

    Ok(())
}

fn check_target_is_matching(rule: &Rule, expected: &str) -> Result<(), ValidationError> {
    if rule.target() != expected {
        return Err(ValidationError::TargetMismatch {
            rule: rule.to_string(),
            expected: expected.to_owned(),
            actual: rule.target().to_owned(),
        });
    }

    Ok(())
}

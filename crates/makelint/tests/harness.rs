//! Integration tests for the makelint harness.
use makelint::harness::{HarnessError, MakeOptions, MakefileHarness};
use makelint::{Rule, ValidationError};
use std::fs;
use tempfile::TempDir;

const SELF_DOCUMENTED: &str = "\
.DEFAULT_GOAL := help

.PHONY: help
help: ## Shows the help
help:
\t@echo \"Usage:\"
\t@echo \"  make TARGET\"

.PHONY: test
test: ## Runs the tests
test: build
\t@echo testing

build:
\t@echo building
";

fn makefile(contents: &str) -> (TempDir, MakefileHarness) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Makefile");
    fs::write(&path, contents).unwrap();

    let harness = MakefileHarness::new(path).with_options(MakeOptions {
        make_flags: Some(String::new()),
        ..MakeOptions::default()
    });

    (dir, harness)
}

fn make_available() -> bool {
    which::which("make").is_ok()
}

#[test]
fn test_rules_are_parsed_from_disk() {
    let (_dir, harness) = makefile(SELF_DOCUMENTED);

    assert_eq!(
        harness.rules().unwrap(),
        [
            Rule::phony(["help"]),
            Rule::new("help", ["## Shows the help"]),
            Rule::new("help", Vec::<String>::new()),
            Rule::phony(["test"]),
            Rule::new("test", ["## Runs the tests"]),
            Rule::new("test", ["build"]),
            Rule::new("build", Vec::<String>::new()),
        ]
    );
}

#[test]
fn test_rules_are_cached() {
    let (dir, harness) = makefile(SELF_DOCUMENTED);
    let first = harness.rules().unwrap().to_vec();

    fs::remove_file(dir.path().join("Makefile")).unwrap();

    assert_eq!(harness.rules().unwrap(), first.as_slice());
}

#[test]
fn test_self_documented_makefile_passes_checks() {
    let (_dir, harness) = makefile(SELF_DOCUMENTED);

    harness.check_rules().unwrap();
}

#[test]
fn test_duplicate_target_fails_checks() {
    let (_dir, harness) = makefile("build: a\nbuild: b\n");

    let error = harness.check_rules().unwrap_err();

    assert!(matches!(
        error,
        HarnessError::Validation(ValidationError::DuplicateTarget { count: 2, .. })
    ));
}

#[test]
fn test_help_output_matches() {
    if !make_available() {
        eprintln!("skipping: make is not installed");
        return;
    }

    let (_dir, harness) = makefile(SELF_DOCUMENTED);

    harness.check_help_output("Usage:\n  make TARGET\n").unwrap();
}

#[test]
fn test_help_output_mismatch_is_reported() {
    if !make_available() {
        eprintln!("skipping: make is not installed");
        return;
    }

    let (_dir, harness) = makefile(SELF_DOCUMENTED);

    let error = harness.check_help_output("Usage: nothing\n").unwrap_err();

    match error {
        HarnessError::OutputMismatch { actual, .. } => {
            assert_eq!(actual, "Usage:\n  make TARGET\n");
        }
        other => panic!("unexpected error: {other}"),
    }
}

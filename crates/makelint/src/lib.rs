//! Lexical Makefile parsing and checks for self-documenting `.PHONY` commands.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::multiple_crate_versions)]

/// Panicking assertions over parsed rules, for use in test suites.
///
/// Failures are rendered as `Failed asserting that ...` messages with a diff when a target
/// does not match its `.PHONY` declaration.
pub mod assert;

/// Reading a Makefile from disk and running `make` against it.
pub mod harness;

/// Line-based parsing of Makefile content into rules.
///
/// The parser approximates Make's rule syntax well enough to recover targets, prerequisites
/// and help comments. It never rejects input: lines it does not model are skipped.
pub mod makefile;

/// Structural checks over parsed rules.
///
/// Validation enforces the conventions of self-documenting Makefiles: one target per
/// `.PHONY` declaration, at most one `##` help comment, and no target declared twice.
pub mod validate;

pub use makefile::{parse_makefile, ParseError, Parser, Rule};
pub use validate::{validate, ValidationError};

//! Lexical parsing of Makefiles into [`Rule`] records.
//!
//! The parser is a best-effort approximation of Make's rule syntax rather than a grammar: it
//! classifies each line (comment, recipe, variable assignment, rule or continuation), splits
//! rule lines on their colon and tokenizes the right-hand side. Anything it does not
//! understand is skipped, so parsing never fails on input. Variable expansion, conditionals,
//! pattern rules and `.RECIPEPREFIX` are not interpreted; their text passes through verbatim.
//!
//! Some inputs yield rules Make itself would read differently. A target-specific variable
//! (`prog : CFLAGS = -g`) becomes a rule with the prerequisites `CFLAGS`, `=` and `-g`, and
//! a recipe split with backslashes appends its trailing words to the preceding rule.

pub mod rule;

pub use rule::Rule;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, trace};

/// A token immediately followed by `=`: `FOO=bar`, `FOO := bar`, `FOO ?= bar`.
const VARIABLE_ASSIGNMENT: &str = r"\S+=.+";

/// The earliest `#` starts a trailing comment.
const TRAILING_COMMENT: &str = r"(?P<non_comment>.*?)(?P<comment>#.*)";

const MULTILINE_DELIMITER: char = '\\';
const TARGET_SEPARATOR: char = ':';
const RECIPE_SEPARATOR: char = ';';

/// Errors raised while setting up or running the parser.
///
/// Malformed Makefile content is never an error. The only failure is the pattern engine
/// itself refusing one of the parser's expressions.
#[derive(Debug, Error)]
pub enum ParseError {
    /// One of the line classification patterns could not be compiled.
    #[error("could not compile the pattern \"{pattern}\": {source}")]
    Pattern {
        /// The offending expression.
        pattern: &'static str,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },
}

/// Line-scanning state threaded through [`Parser::parse`].
#[derive(Debug, Default)]
struct ScanState {
    rules: Vec<Rule>,
    /// The previous rule line ended with a continuation marker.
    multiline: bool,
    /// A `;` was seen in the current rule: the continued lines are recipe text.
    ignore_rest_of_multiline: bool,
}

/// Tokens parsed from a right-hand side, with the updated ignore flag.
#[derive(Debug)]
struct Prerequisites {
    tokens: Vec<String>,
    ignore_rest_of_multiline: bool,
}

impl Prerequisites {
    fn none(ignore_rest_of_multiline: bool) -> Self {
        Self {
            tokens: Vec::new(),
            ignore_rest_of_multiline,
        }
    }

    fn chain(mut self, other: Self) -> Self {
        self.tokens.extend(other.tokens);
        self.ignore_rest_of_multiline = other.ignore_rest_of_multiline;
        self
    }
}

/// A Makefile parser with its line patterns compiled.
///
/// Build one with [`Parser::new`] and reuse it across files; [`parse_makefile`] is the
/// one-shot shorthand.
#[derive(Debug, Clone)]
pub struct Parser {
    variable_assignment: Regex,
    trailing_comment: Regex,
}

impl Parser {
    /// Compiles the line classification patterns.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Pattern`] if the regex engine rejects one of the patterns.
    pub fn new() -> Result<Self, ParseError> {
        Ok(Self {
            variable_assignment: compile(VARIABLE_ASSIGNMENT)?,
            trailing_comment: compile(TRAILING_COMMENT)?,
        })
    }

    /// Parses Makefile content into its rules, in declaration order.
    ///
    /// Lines that are not rules (comments, recipes, variable assignments, directives) are
    /// skipped. A rule continued over several lines with `\` yields a single [`Rule`].
    #[must_use]
    pub fn parse(&self, contents: &str) -> Vec<Rule> {
        let state = contents
            .split('\n')
            .fold(ScanState::default(), |state, line| self.parse_line(state, line));

        debug!(rules = state.rules.len(), "parsed Makefile");

        state.rules
    }

    fn parse_line(&self, mut state: ScanState, line: &str) -> ScanState {
        let line = line.trim_end();

        if !self.is_rule(line, state.multiline) {
            trace!(line, "skipping non-rule line");
            return state;
        }

        let previous_multiline = state.multiline;
        state.multiline = self.is_multiline(line);

        let rule = if previous_multiline {
            let Some(rule) = state.rules.pop() else {
                trace!(line, "continuation without a rule to extend");
                return state;
            };

            let parsed = self.parse_prerequisites(
                line,
                state.multiline,
                state.ignore_rest_of_multiline,
            );
            state.ignore_rest_of_multiline = parsed.ignore_rest_of_multiline;

            rule.with_additional_prerequisites(parsed.tokens)
        } else {
            let parts: Vec<&str> = line.split(TARGET_SEPARATOR).collect();

            let [target, prerequisites] = parts.as_slice() else {
                trace!(line, pieces = parts.len(), "not a two-part rule line");
                return state;
            };

            let parsed = self.parse_prerequisites(prerequisites, state.multiline, false);
            state.ignore_rest_of_multiline = parsed.ignore_rest_of_multiline;

            Rule::new(target.trim(), parsed.tokens)
        };

        state.rules.push(rule);

        state
    }

    fn is_rule(&self, line: &str, previous_multiline: bool) -> bool {
        previous_multiline
            || (!line.starts_with('#')
                && !line.starts_with('\t')
                && !self.variable_assignment.is_match(line))
    }

    fn is_multiline(&self, line: &str) -> bool {
        self.trim_comment(line)
            .trim_end()
            .ends_with(MULTILINE_DELIMITER)
    }

    fn parse_prerequisites(
        &self,
        dependencies: &str,
        multiline: bool,
        ignore_rest_of_multiline: bool,
    ) -> Prerequisites {
        let trimmed = dependencies.trim();

        if (ignore_rest_of_multiline && multiline) || trimmed.is_empty() {
            return Prerequisites::none(ignore_rest_of_multiline);
        }

        if multiline {
            // Only the text around the first delimiter is kept, the rest of the line is dropped.
            let mut parts = dependencies.split(MULTILINE_DELIMITER);
            let head = parts.next().unwrap_or_default();
            let tail = parts.next().unwrap_or_default();

            let head = self.parse_prerequisites(head, false, ignore_rest_of_multiline);
            let tail = self.parse_prerequisites(tail, false, head.ignore_rest_of_multiline);

            return head.chain(tail);
        }

        if trimmed.starts_with(rule::COMMENT_PREFIX) {
            return Prerequisites {
                tokens: vec![trimmed.to_owned()],
                ignore_rest_of_multiline,
            };
        }

        if let Some((non_comment, comment)) = self.split_comment(dependencies) {
            let head = self.parse_prerequisites(non_comment, false, ignore_rest_of_multiline);
            let tail = self.parse_prerequisites(comment, false, head.ignore_rest_of_multiline);

            return head.chain(tail);
        }

        let (dependencies, ignore_rest_of_multiline) =
            match dependencies.split_once(RECIPE_SEPARATOR) {
                Some((before_recipe, _recipe)) => (before_recipe, true),
                None => (dependencies, ignore_rest_of_multiline),
            };

        Prerequisites {
            tokens: dependencies
                .split(' ')
                .map(|token| token.trim_start_matches('\t'))
                .filter(|token| !token.is_empty())
                .map(str::to_owned)
                .collect(),
            ignore_rest_of_multiline,
        }
    }

    fn trim_comment<'a>(&self, line: &'a str) -> &'a str {
        self.split_comment(line)
            .map_or(line, |(non_comment, _comment)| non_comment)
    }

    fn split_comment<'a>(&self, line: &'a str) -> Option<(&'a str, &'a str)> {
        let captures = self.trailing_comment.captures(line)?;

        Some((
            captures.name("non_comment")?.as_str(),
            captures.name("comment")?.as_str(),
        ))
    }
}

fn compile(pattern: &'static str) -> Result<Regex, ParseError> {
    Regex::new(pattern).map_err(|source| ParseError::Pattern { pattern, source })
}

/// Parses Makefile content into its rules with a freshly built [`Parser`].
///
/// # Errors
///
/// Returns [`ParseError::Pattern`] if the parser's patterns cannot be compiled. The content
/// itself never causes an error.
pub fn parse_makefile(contents: &str) -> Result<Vec<Rule>, ParseError> {
    Ok(Parser::new()?.parse(contents))
}

//! The rule record produced by the Makefile parser.
//!
//! A [`Rule`] is the only data contract shared by the parser and the validators: a target and
//! the ordered tokens found on the right-hand side of its declaration.

use facet::Facet;
use std::fmt;

/// The special target declaring that its prerequisites are not files.
pub const PHONY_TARGET: &str = ".PHONY";

/// Prefix marking a prerequisite token as a Makefile comment.
pub const COMMENT_PREFIX: &str = "#";

/// Prefix marking a prerequisite token as a command help comment.
pub const COMMAND_COMMENT_PREFIX: &str = "##";

/// A single (possibly multi-line) rule declaration of a Makefile.
///
/// The target is stored as written, so `target1 target2 : dep` keeps both names in one
/// string. Prerequisites keep their declaration order, and a trailing comment is kept as a
/// literal token (`check: ## Runs the checks` yields the single prerequisite
/// `"## Runs the checks"`).
///
/// A `Rule` is immutable: [`Rule::with_additional_prerequisites`] returns a new value.
#[derive(Debug, Clone, PartialEq, Eq, Facet)]
pub struct Rule {
    target: String,
    prerequisites: Vec<String>,
}

impl Rule {
    /// Creates a rule from a target and its prerequisites.
    #[must_use]
    pub fn new<T, I, P>(target: T, prerequisites: I) -> Self
    where
        T: Into<String>,
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            target: target.into(),
            prerequisites: prerequisites.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a `.PHONY` declaration.
    #[must_use]
    pub fn phony<I, P>(prerequisites: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self::new(PHONY_TARGET, prerequisites)
    }

    /// The left-hand side of the declaration.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The right-hand side tokens, in declaration order.
    #[must_use]
    pub fn prerequisites(&self) -> &[String] {
        &self.prerequisites
    }

    /// Returns a copy of this rule with `prerequisites` appended after the existing ones.
    #[must_use]
    pub fn with_additional_prerequisites<I, P>(&self, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let mut merged = self.prerequisites.clone();
        merged.extend(prerequisites.into_iter().map(Into::into));

        Self {
            target: self.target.clone(),
            prerequisites: merged,
        }
    }

    /// Returns `true` if the target is exactly `.PHONY`.
    #[must_use]
    pub fn is_phony(&self) -> bool {
        self.target == PHONY_TARGET
    }

    /// Returns `true` if the first prerequisite is a comment (`#...`).
    #[must_use]
    pub fn is_comment(&self) -> bool {
        self.first_prerequisite_starts_with(COMMENT_PREFIX)
    }

    /// Returns `true` if the first prerequisite is a command help comment (`##...`).
    #[must_use]
    pub fn is_command_comment(&self) -> bool {
        self.first_prerequisite_starts_with(COMMAND_COMMENT_PREFIX)
    }

    fn first_prerequisite_starts_with(&self, prefix: &str) -> bool {
        self.prerequisites
            .first()
            .is_some_and(|first| first.starts_with(prefix))
    }
}

/// Renders the rule back as `target: prerequisites`, without trailing whitespace.
impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = format!("{}: {}", self.target, self.prerequisites.join(" "));

        f.write_str(rendered.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_keeps_raw_state() {
        let rule = Rule::new(" targets ", [" $(objects)", "prog.o"]);

        assert_eq!(rule.target(), " targets ");
        assert_eq!(rule.prerequisites(), [" $(objects)", "prog.o"]);
    }

    #[test]
    fn test_merging_prerequisites_leaves_original_untouched() {
        let rule = Rule::new(" targets ", [" $(objects)", "prog.o"]);
        let merged = rule.with_additional_prerequisites(["prog.o", "bom"]);

        assert_eq!(rule.prerequisites(), [" $(objects)", "prog.o"]);
        assert_eq!(merged.target(), " targets ");
        assert_eq!(
            merged.prerequisites(),
            [" $(objects)", "prog.o", "prog.o", "bom"]
        );
    }

    #[test]
    fn test_phony_detection_is_exact() {
        let empty: [&str; 0] = [];

        assert!(!Rule::new("command", empty).is_phony());
        assert!(Rule::new(".PHONY", empty).is_phony());
        assert!(Rule::phony(empty).is_phony());
        assert!(!Rule::new(".PHONY ", empty).is_phony());
        assert!(!Rule::new("PHONY", empty).is_phony());
        assert!(!Rule::new(".phony", empty).is_phony());
    }

    #[test]
    fn test_comment_detection() {
        let cases = [
            (Rule::new("command", ["progA", "progB"]), false, false),
            (Rule::phony(["progA", "progB"]), false, false),
            (Rule::new("command", ["#progA progB"]), true, false),
            (Rule::new("command", ["##progA progB"]), true, true),
            (Rule::new("command", ["###progA progB"]), true, true),
            (Rule::phony(["#progA progB"]), true, false),
            (Rule::new("command", Vec::<String>::new()), false, false),
        ];

        for (rule, comment, command_comment) in cases {
            assert_eq!(rule.is_comment(), comment, "{rule}");
            assert_eq!(rule.is_command_comment(), command_comment, "{rule}");
        }
    }

    #[test]
    fn test_display_trims_trailing_space() {
        assert_eq!(Rule::phony(Vec::<String>::new()).to_string(), ".PHONY:");
        assert_eq!(
            Rule::phony(["command1", "command2"]).to_string(),
            ".PHONY: command1 command2"
        );
        assert_eq!(
            Rule::new("command1", ["## Command1 Help"]).to_string(),
            "command1: ## Command1 Help"
        );
    }

    #[test]
    fn test_rules_round_trip_through_json() {
        let rules = vec![Rule::phony(["cmd"]), Rule::new("cmd", ["## help"])];

        let json = facet_json::to_string(&rules);
        let decoded: Vec<Rule> = facet_json::from_str(&json).unwrap();

        assert_eq!(decoded, rules);
    }
}

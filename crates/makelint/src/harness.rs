//! Checking a project's own Makefile from its test suite.
//!
//! [`MakefileHarness`] is the glue between the pure parser and validators and the outside
//! world: it reads the Makefile from disk, caches its rules, and runs `make` to capture the
//! output of commands such as `help`.
//!
//! ```no_run
//! use makelint::harness::MakefileHarness;
//!
//! let harness = MakefileHarness::new("Makefile");
//!
//! harness.check_rules()?;
//! harness.check_help_output("Usage:\n  make TARGET\n")?;
//! # Ok::<(), makelint::harness::HarnessError>(())
//! ```

use crate::makefile::{ParseError, Parser, Rule};
use crate::validate::{validate, ValidationError};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use std::{env, fs, io};
use thiserror::Error;
use tracing::{debug, warn};

/// Seconds `make` may run before it is killed, when `timeout` is available.
pub const DEFAULT_TIMEOUT_SECS: u64 = 2;

const DEBUG_FLAG_PREFIX: &str = "--debug=";

/// Errors raised while checking a Makefile.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The Makefile could not be read.
    #[error("could not read the contents of the file \"{}\": {source}", .path.display())]
    Read {
        /// The Makefile path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The parser could not be built.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// `make` could not be started.
    #[error("could not execute the command \"{command}\": {source}")]
    Execute {
        /// The rendered command line.
        command: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The rules violate a structural check.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A `make` command printed something other than what was expected.
    #[error("the output of \"make {command}\" does not match the expected output")]
    OutputMismatch {
        /// The make command that was run.
        command: String,
        /// The expected output.
        expected: String,
        /// The captured output.
        actual: String,
    },
}

/// How `make` is invoked by [`MakefileHarness::execute_make_command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakeOptions {
    /// The make executable.
    pub program: String,

    /// Kill `make` after this many seconds. Only honoured when the `timeout` utility is on
    /// `PATH`; `None` disables the limit.
    pub timeout_secs: Option<u64>,

    /// `MAKEFLAGS` to pass down. `None` inherits the caller's `MAKEFLAGS`. In both cases
    /// `--debug=` flags are removed so they do not pollute the captured output.
    pub make_flags: Option<String>,
}

impl Default for MakeOptions {
    fn default() -> Self {
        Self {
            program: "make".to_owned(),
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            make_flags: None,
        }
    }
}

/// A Makefile under test.
///
/// The file is read and parsed on first use of [`MakefileHarness::rules`]; later calls reuse
/// the parsed rules.
#[derive(Debug)]
pub struct MakefileHarness {
    path: PathBuf,
    options: MakeOptions,
    rules: OnceLock<Vec<Rule>>,
}

impl MakefileHarness {
    /// Creates a harness for the Makefile at `path`, using the default [`MakeOptions`].
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            options: MakeOptions::default(),
            rules: OnceLock::new(),
        }
    }

    /// Replaces the options used to invoke `make`.
    #[must_use]
    pub fn with_options(mut self, options: MakeOptions) -> Self {
        self.options = options;
        self
    }

    /// The Makefile path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The rules of the Makefile, parsed once.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Read`] if the file cannot be read, or
    /// [`HarnessError::Parse`] if the parser cannot be built.
    pub fn rules(&self) -> Result<&[Rule], HarnessError> {
        if let Some(rules) = self.rules.get() {
            return Ok(rules);
        }

        let contents = fs::read_to_string(&self.path).map_err(|source| HarnessError::Read {
            path: self.path.clone(),
            source,
        })?;
        let rules = Parser::new()?.parse(&contents);

        debug!(path = %self.path.display(), rules = rules.len(), "loaded Makefile");

        Ok(self.rules.get_or_init(|| rules))
    }

    /// Runs every structural check over the Makefile's rules.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Validation`] with the first violation, or an error from
    /// [`MakefileHarness::rules`].
    pub fn check_rules(&self) -> Result<(), HarnessError> {
        validate(self.rules()?)?;

        Ok(())
    }

    /// Runs `make <command_name> --silent --file <Makefile>` from the Makefile's directory
    /// and returns what it printed, standard output first.
    ///
    /// A non-zero exit status is logged but not an error: the output is what gets compared.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Execute`] if `make` cannot be started.
    pub fn execute_make_command(&self, command_name: &str) -> Result<String, HarnessError> {
        let mut command = self.make_command();
        command
            .arg(command_name)
            .arg("--silent")
            .arg("--file")
            .arg(self.file_name())
            .current_dir(self.directory())
            .env("MAKEFLAGS", self.make_flags());

        let rendered = format!("{command:?}");
        debug!(command = %rendered, "running make");

        let output = command.output().map_err(|source| HarnessError::Execute {
            command: rendered.clone(),
            source,
        })?;

        if !output.status.success() {
            warn!(command = %rendered, status = %output.status, "make exited unsuccessfully");
        }

        let mut printed = String::from_utf8_lossy(&output.stdout).into_owned();
        printed.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(printed)
    }

    /// Checks that `make help` prints exactly `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::OutputMismatch`] when the output differs, or an error from
    /// [`MakefileHarness::execute_make_command`].
    pub fn check_help_output(&self, expected: &str) -> Result<(), HarnessError> {
        let command = "help";
        let actual = self.execute_make_command(command)?;

        if actual != expected {
            return Err(HarnessError::OutputMismatch {
                command: command.to_owned(),
                expected: expected.to_owned(),
                actual,
            });
        }

        Ok(())
    }

    fn make_command(&self) -> Command {
        let timeout = self
            .options
            .timeout_secs
            .and_then(|secs| which::which("timeout").ok().map(|path| (path, secs)));

        match timeout {
            Some((timeout, secs)) => {
                let mut command = Command::new(timeout);
                command.arg(format!("{secs}s")).arg(&self.options.program);
                command
            }
            None => Command::new(&self.options.program),
        }
    }

    fn make_flags(&self) -> String {
        let inherited = match &self.options.make_flags {
            Some(flags) => flags.clone(),
            None => env::var("MAKEFLAGS").unwrap_or_default(),
        };

        non_debug_make_flags(&inherited)
    }

    fn directory(&self) -> &Path {
        self.path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    fn file_name(&self) -> OsString {
        self.path
            .file_name()
            .map_or_else(|| self.path.clone().into_os_string(), ToOwned::to_owned)
    }
}

/// Removes `--debug=` flags from a `MAKEFLAGS` value, keeping the others in order.
#[must_use]
pub fn non_debug_make_flags(make_flags: &str) -> String {
    make_flags
        .split(' ')
        .filter(|flag| !flag.starts_with(DEBUG_FLAG_PREFIX))
        .collect::<Vec<_>>()
        .join(" ")
}

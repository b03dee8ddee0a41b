//! The `makelint` command: parse a Makefile, then check it or dump its rules.

use facet::Facet;
use makelint::validate::rules_from_json;
use makelint::{assert::failure_message, parse_makefile, validate, Rule};
use std::fs;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Command line arguments.
#[derive(Facet)]
struct Args {
    /// Path to the Makefile, or to a JSON rule dump with `--import`.
    #[facet(positional)]
    path: String,

    /// Print the parsed rules as JSON instead of checking them.
    #[facet(named, short = 'j')]
    json: bool,

    /// Read a JSON rule dump (as printed by `--json`) instead of a Makefile.
    #[facet(named)]
    import: bool,

    /// Log what the parser does.
    #[facet(named, short = 'v')]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_rules(args: &Args) -> Result<Vec<Rule>, String> {
    let contents = fs::read_to_string(&args.path)
        .map_err(|e| format!("could not read \"{}\": {e}", args.path))?;

    if args.import {
        return rules_from_json(&contents).map_err(|e| failure_message(&e));
    }

    parse_makefile(&contents).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    let args: Args = match facet_args::from_std_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(args.verbose);

    let rules = match load_rules(&args) {
        Ok(rules) => rules,
        Err(message) => {
            debug!(path = %args.path, "could not load rules");
            eprint!("{message}");
            if !message.ends_with('\n') {
                eprintln!();
            }
            return ExitCode::FAILURE;
        }
    };

    debug!(rules = rules.len(), "loaded rules");

    if args.json {
        println!("{}", facet_json::to_string(&rules));
        return ExitCode::SUCCESS;
    }

    match validate(&rules) {
        Ok(()) => {
            println!("{}: {} rules OK", args.path, rules.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprint!("{}", failure_message(&e));
            ExitCode::FAILURE
        }
    }
}

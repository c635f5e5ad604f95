//! CLI support for binding-expr
//!
//! The `bindexpr` subcommands as plain functions, so other tools can run
//! them without going through the binary.

mod check;
mod inspect;

pub use check::{CheckReport, EvalOptions, EvalOutcome, execute_check, execute_eval};
pub use inspect::{describe_bindings, describe_tokens};

use std::fmt;
use std::io;

use crate::{ErrorKind, EvalError, ParseError};

/// Why a command failed
#[derive(Debug)]
pub enum CliError {
    /// The expression did not compile
    Compile(ParseError),
    /// The expression failed while running
    Eval(EvalError),
    /// A `--scope` / `--locals` argument is not JSON
    InvalidJson {
        argument: &'static str,
        source: serde_json::Error,
    },
    /// A result could not be written as JSON
    Output(serde_json::Error),
    Io(io::Error),
}

impl CliError {
    /// Error class of a compile or evaluation failure
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            CliError::Compile(e) => Some(e.kind()),
            CliError::Eval(e) => Some(e.kind()),
            _ => None,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Compile(e) => write!(f, "{}", e),
            CliError::Eval(e) => write!(f, "Evaluation failed ({}): {}", e.kind(), e),
            CliError::InvalidJson { argument, source } => {
                write!(f, "--{} is not valid JSON: {}", argument, source)
            }
            CliError::Output(e) => write!(f, "Could not write result: {}", e),
            CliError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Compile(e) => Some(e),
            CliError::Eval(e) => Some(e),
            CliError::InvalidJson { source, .. } => Some(source),
            CliError::Output(e) => Some(e),
            CliError::Io(e) => Some(e),
        }
    }
}

impl From<ParseError> for CliError {
    fn from(e: ParseError) -> Self {
        CliError::Compile(e)
    }
}

impl From<EvalError> for CliError {
    fn from(e: EvalError) -> Self {
        CliError::Eval(e)
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}

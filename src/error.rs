//! Coarse classification of every error the crate produces.
use std::fmt;

use crate::{
    evaluator::EvalError,
    lexer::LexError,
    parser::{ParseError, SyntaxError},
    sandbox::SandboxError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed source text
    Lex,
    /// Tokens that do not form an expression
    Syntax,
    /// Access the sandbox forbids
    Sandbox,
    /// Something missing from the compiler setup, such as an unknown filter
    Configuration,
    /// Operation on a value of the wrong type
    Type,
    /// Failure raised by host code (native functions, filters, hooks)
    Host,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Lex => "lexer",
            ErrorKind::Syntax => "syntax",
            ErrorKind::Sandbox => "sandbox",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Type => "type",
            ErrorKind::Host => "host",
        };
        f.write_str(name)
    }
}

impl LexError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Lex
    }
}

impl SyntaxError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Syntax
    }
}

impl SandboxError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Sandbox
    }
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::Lex(_) => ErrorKind::Lex,
            ParseError::Syntax(_) => ErrorKind::Syntax,
            ParseError::Sandbox(_) => ErrorKind::Sandbox,
            ParseError::NotText(_) => ErrorKind::Type,
        }
    }
}

impl EvalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvalError::Sandbox(_) => ErrorKind::Sandbox,
            EvalError::UnknownFilter(_) => ErrorKind::Configuration,
            EvalError::TypeError(_) | EvalError::NotAssignable(_) => ErrorKind::Type,
            EvalError::Host(_) => ErrorKind::Host,
        }
    }
}

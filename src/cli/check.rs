//! Compile and evaluate expressions against JSON input

use super::CliError;
use crate::{
    Compiler, CompilerOptions,
    convert::{from_json, to_json},
    value::{Object, Value},
};

/// Options for the eval command
#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
    /// The expression to evaluate
    pub expression: String,
    /// Scope as a JSON string (an empty object when absent)
    pub scope: Option<String>,
    /// Locals as a JSON string
    pub locals: Option<String>,
    /// Reject function calls at compile time
    pub disallow_function_calls: bool,
}

/// Result of an eval operation
#[derive(Debug)]
pub struct EvalOutcome {
    /// Value of the expression
    pub value: serde_json::Value,
    /// Scope after evaluation (assignments show up here)
    pub scope: serde_json::Value,
}

/// What compiling an expression revealed about it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckReport {
    pub constant: bool,
    pub literal: bool,
    pub assignable: bool,
}

fn compiler(disallow_function_calls: bool) -> Compiler {
    Compiler::new(CompilerOptions::default().disallow_function_calls(disallow_function_calls))
}

fn parse_json_arg(argument: &'static str, text: Option<&str>) -> Result<Option<Value>, CliError> {
    text.map(|text| serde_json::from_str(text).map(from_json))
        .transpose()
        .map_err(|source| CliError::InvalidJson { argument, source })
}

/// Execute an eval operation
pub fn execute_eval(options: &EvalOptions) -> Result<EvalOutcome, CliError> {
    let expr = compiler(options.disallow_function_calls).compile(&options.expression)?;

    let scope = parse_json_arg("scope", options.scope.as_deref())?
        .unwrap_or_else(|| Value::Object(Object::new()));
    let locals = parse_json_arg("locals", options.locals.as_deref())?;

    let value = expr.eval(&scope, locals.as_ref())?;
    Ok(EvalOutcome {
        value: to_json(&value),
        scope: to_json(&scope),
    })
}

/// Compile an expression without evaluating it
pub fn execute_check(expression: &str, disallow_function_calls: bool) -> Result<CheckReport, CliError> {
    let expr = compiler(disallow_function_calls).compile(expression)?;
    Ok(CheckReport {
        constant: expr.is_constant(),
        literal: expr.is_literal(),
        assignable: expr.is_assignable(),
    })
}

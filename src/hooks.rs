//! Runtime hooks redirecting member access.
//!
//! A host that tracks reads (for dependency collection) or intercepts writes
//! (for change notification) implements [`RuntimeHooks`] and passes it to
//! [`CompiledExpr::eval_with_hooks`](crate::compiler::CompiledExpr::eval_with_hooks).
//! Every field or index read and write performed by the expression then goes
//! through the hooks instead of touching the value directly.

use crate::{evaluator::EvalError, value::Value};

/// Interception points for member access.
///
/// The default methods perform the direct access, so an implementation only
/// overrides what it needs.
pub trait RuntimeHooks: Send + Sync {
    /// `object.name` (also every segment of a dotted path)
    fn read_field(&self, object: &Value, name: &str) -> Result<Value, EvalError> {
        Ok(object.get_field(name))
    }

    /// `object.name = value`
    fn write_field(&self, object: &Value, name: &str, value: Value) -> Result<(), EvalError> {
        object.set_field(name, value)
    }

    /// `object[key]`
    fn read_index(&self, object: &Value, key: &Value) -> Result<Value, EvalError> {
        Ok(object.get_index(key))
    }

    /// `object[key] = value`
    fn write_index(&self, object: &Value, key: &Value, value: Value) -> Result<(), EvalError> {
        object.set_index(key, value)
    }
}

/// Hooks that only perform direct access.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectAccess;

impl RuntimeHooks for DirectAccess {}

pub(crate) fn read_field(
    hooks: Option<&dyn RuntimeHooks>,
    object: &Value,
    name: &str,
) -> Result<Value, EvalError> {
    match hooks {
        Some(hooks) => hooks.read_field(object, name),
        None => Ok(object.get_field(name)),
    }
}

pub(crate) fn write_field(
    hooks: Option<&dyn RuntimeHooks>,
    object: &Value,
    name: &str,
    value: Value,
) -> Result<(), EvalError> {
    match hooks {
        Some(hooks) => hooks.write_field(object, name, value),
        None => object.set_field(name, value),
    }
}

pub(crate) fn read_index(
    hooks: Option<&dyn RuntimeHooks>,
    object: &Value,
    key: &Value,
) -> Result<Value, EvalError> {
    match hooks {
        Some(hooks) => hooks.read_index(object, key),
        None => Ok(object.get_index(key)),
    }
}

pub(crate) fn write_index(
    hooks: Option<&dyn RuntimeHooks>,
    object: &Value,
    key: &Value,
    value: Value,
) -> Result<(), EvalError> {
    match hooks {
        Some(hooks) => hooks.write_index(object, key, value),
        None => object.set_index(key, value),
    }
}

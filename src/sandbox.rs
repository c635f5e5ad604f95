//! Guards against escaping the expression sandbox.
//!
//! Two layers: member names that lead to constructors or prototypes are
//! rejected statically (and for computed keys, at evaluation), and values
//! that look like function objects, the global window or DOM nodes are
//! rejected whenever an expression is about to call or index them.

use thiserror::Error;

use crate::value::Value;

/// Member names an expression may never access.
pub const RESERVED_MEMBERS: [&str; 2] = ["constructor", "__proto__"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SandboxError {
    #[error("Referencing \"{name}\" is disallowed in expressions! Expression: {expression}")]
    ReservedName { name: String, expression: String },

    #[error("Referencing Function in expressions is disallowed! Expression: {expression}")]
    FunctionObject { expression: String },

    #[error("Referencing the Window in expressions is disallowed! Expression: {expression}")]
    WindowObject { expression: String },

    #[error("Referencing DOM nodes in expressions is disallowed! Expression: {expression}")]
    DomElement { expression: String },
}

/// Rejects reserved member names.
pub fn ensure_safe_member_name(name: &str, expression: &str) -> Result<(), SandboxError> {
    if RESERVED_MEMBERS.contains(&name) {
        return Err(SandboxError::ReservedName {
            name: name.to_string(),
            expression: expression.to_string(),
        });
    }
    Ok(())
}

/// A value whose `constructor` member is itself.
fn is_function_object(value: &Value) -> bool {
    value.get_field("constructor").strict_equals(value)
}

fn is_window(value: &Value) -> bool {
    ["document", "location", "alert", "setInterval"]
        .iter()
        .all(|member| value.get_field(member).is_truthy())
}

fn is_element(value: &Value) -> bool {
    value.get_field("nodeName").is_truthy()
        || (value.get_field("on").is_truthy() && value.get_field("find").is_truthy())
}

/// Passes `value` through unchanged unless it is a function object, a
/// window-like object or an element-like object.
pub fn ensure_safe_object(value: Value, expression: &str) -> Result<Value, SandboxError> {
    if !matches!(value, Value::Object(_) | Value::Function(_)) {
        return Ok(value);
    }

    let expression = expression.to_string();
    if is_function_object(&value) {
        Err(SandboxError::FunctionObject { expression })
    } else if is_window(&value) {
        Err(SandboxError::WindowObject { expression })
    } else if is_element(&value) {
        Err(SandboxError::DomElement { expression })
    } else {
        Ok(value)
    }
}

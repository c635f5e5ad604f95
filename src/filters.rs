//! Named filters applied with the `|` operator.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::{convert::to_json, evaluator::EvalError, value::Value};

/// The signature of a filter: `(input, args) -> output`.
pub type FilterFn = Arc<dyn Fn(&Value, &[Value]) -> Result<Value, EvalError> + Send + Sync>;

/// A registry of filters, looked up by name when an expression is evaluated.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: HashMap<String, FilterFn>,
}

impl FilterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in filters.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("uppercase", uppercase);
        registry.register("lowercase", lowercase);
        registry.register("json", json);
        registry.register("limitTo", limit_to);
        registry
    }

    /// Registers a filter, replacing any filter of the same name.
    pub fn register<F>(&mut self, name: &str, filter: F)
    where
        F: Fn(&Value, &[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.filters.insert(name.to_string(), Arc::new(filter));
    }

    /// Finds a filter by name (case-sensitive).
    pub fn get(&self, name: &str) -> Option<&FilterFn> {
        self.filters.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

// --- Built-in filters ---

fn uppercase(input: &Value, _args: &[Value]) -> Result<Value, EvalError> {
    Ok(match input {
        Value::String(s) => Value::String(s.to_uppercase()),
        other => other.clone(),
    })
}

fn lowercase(input: &Value, _args: &[Value]) -> Result<Value, EvalError> {
    Ok(match input {
        Value::String(s) => Value::String(s.to_lowercase()),
        other => other.clone(),
    })
}

fn json(input: &Value, _args: &[Value]) -> Result<Value, EvalError> {
    serde_json::to_string_pretty(&to_json(input))
        .map(Value::String)
        .map_err(|e| EvalError::Host(e.to_string()))
}

/// Keeps the first `n` items of an array or string, or the last `-n` when
/// `n` is negative.
fn limit_to(input: &Value, args: &[Value]) -> Result<Value, EvalError> {
    let limit = args.first().map(Value::to_numeric);
    let limit = match limit {
        Some(Value::Integer(n)) => n,
        Some(Value::Float(n)) if n.is_finite() => n.trunc() as i64,
        Some(Value::Float(n)) if n.is_infinite() => {
            if n > 0.0 {
                i64::MAX
            } else {
                i64::MIN + 1
            }
        }
        _ => return Ok(input.clone()),
    };

    fn window(len: usize, limit: i64) -> (usize, usize) {
        let n = usize::try_from(limit.unsigned_abs()).unwrap_or(usize::MAX).min(len);
        if limit >= 0 { (0, n) } else { (len - n, len) }
    }

    match input {
        Value::Array(items) => {
            let items = items.to_vec();
            let (start, end) = window(items.len(), limit);
            Ok(Value::array(items[start..end].iter().cloned()))
        }
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let (start, end) = window(chars.len(), limit);
            Ok(Value::String(chars[start..end].iter().collect()))
        }
        other => Ok(other.clone()),
    }
}

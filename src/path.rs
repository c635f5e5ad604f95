//! Property path getters and setters.
//!
//! A dotted path such as `user.address.city` compiles once into a closure
//! that walks the segments. Closures are cached per [`PathCompiler`] by the
//! exact path text, so every expression mentioning the same path shares one
//! getter.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use log::trace;

use crate::{
    evaluator::EvalError,
    hooks::{self, RuntimeHooks},
    sandbox::{SandboxError, ensure_safe_member_name},
    value::{Object, Value, read_lock, write_lock},
};

/// Compiled path reader: `(scope, locals, hooks) -> value`.
pub type Getter = Arc<
    dyn Fn(&Value, Option<&Value>, Option<&dyn RuntimeHooks>) -> Result<Value, EvalError>
        + Send
        + Sync,
>;

/// Longest run of segments read by a single closure.
const CHUNK_SIZE: usize = 5;

/// The object the first segment is read from: locals when they own the
/// key, the scope otherwise.
fn shadowed<'a>(scope: &'a Value, locals: Option<&'a Value>, key: &str) -> &'a Value {
    match locals {
        Some(locals) if locals.has_own(key) => locals,
        _ => scope,
    }
}

/// One segment. Reading through null or undefined yields undefined.
fn step(hooks: Option<&dyn RuntimeHooks>, value: &Value, key: &str) -> Result<Value, EvalError> {
    if value.is_nullish() {
        return Ok(Value::Undefined);
    }
    hooks::read_field(hooks, value, key)
}

fn into_getter<F>(read: F) -> Getter
where
    F: Fn(&Value, Option<&Value>, Option<&dyn RuntimeHooks>) -> Result<Value, EvalError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(read)
}

fn compile_getter(keys: &[String]) -> Getter {
    match keys {
        [k0] => {
            let k0 = k0.clone();
            into_getter(move |scope, locals, hooks| step(hooks, shadowed(scope, locals, &k0), &k0))
        }
        [k0, k1] => {
            let (k0, k1) = (k0.clone(), k1.clone());
            into_getter(move |scope, locals, hooks| {
                let value = step(hooks, shadowed(scope, locals, &k0), &k0)?;
                step(hooks, &value, &k1)
            })
        }
        _ if keys.len() <= CHUNK_SIZE => {
            let keys: Vec<String> = keys.to_vec();
            into_getter(move |scope, locals, hooks| {
                let mut value = step(hooks, shadowed(scope, locals, &keys[0]), &keys[0])?;
                for key in &keys[1..] {
                    value = step(hooks, &value, key)?;
                }
                Ok(value)
            })
        }
        _ => {
            let chunks: Vec<Getter> = keys.chunks(CHUNK_SIZE).map(compile_getter).collect();
            into_getter(move |scope, locals, hooks| {
                let mut value = (chunks[0])(scope, locals, hooks)?;
                // Later chunks start from a value, never from locals
                for chunk in &chunks[1..] {
                    value = chunk(&value, None, hooks)?;
                }
                Ok(value)
            })
        }
    }
}

/// A compiled dotted path.
#[derive(Clone)]
pub struct PathAccess {
    path: Arc<str>,
    keys: Arc<[String]>,
    getter: Getter,
}

impl PathAccess {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Reads the path. The first segment may be shadowed by `locals`.
    pub fn get(
        &self,
        scope: &Value,
        locals: Option<&Value>,
        hooks: Option<&dyn RuntimeHooks>,
    ) -> Result<Value, EvalError> {
        (self.getter)(scope, locals, hooks)
    }

    /// Writes the path, into locals when they own the first segment.
    pub fn assign(
        &self,
        scope: &Value,
        locals: Option<&Value>,
        value: Value,
        hooks: Option<&dyn RuntimeHooks>,
    ) -> Result<Value, EvalError> {
        let target = shadowed(scope, locals, &self.keys[0]);
        PathCompiler::set(target, &self.keys, value, hooks)
    }
}

impl fmt::Debug for PathAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PathAccess").field(&self.path).finish()
    }
}

impl PartialEq for PathAccess {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

/// Compiles and caches path getters.
#[derive(Default)]
pub struct PathCompiler {
    cache: RwLock<HashMap<String, Getter>>,
}

impl PathCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the getter for `path`, compiling it on first use.
    ///
    /// Every segment is checked against the reserved member names first, so
    /// a cached getter is never handed out for a forbidden path.
    pub fn getter(&self, path: &str, expression: &str) -> Result<PathAccess, SandboxError> {
        let keys: Vec<String> = path.split('.').map(str::to_string).collect();
        for key in &keys {
            ensure_safe_member_name(key, expression)?;
        }

        let cached = read_lock(&self.cache).get(path).cloned();
        let getter = match cached {
            Some(getter) => getter,
            None => {
                trace!("compiling getter for `{}` ({} segments)", path, keys.len());
                let getter = compile_getter(&keys);
                write_lock(&self.cache)
                    .entry(path.to_string())
                    .or_insert(getter)
                    .clone()
            }
        };

        Ok(PathAccess {
            path: Arc::from(path),
            keys: keys.into(),
            getter,
        })
    }

    /// Number of cached getters.
    pub fn len(&self) -> usize {
        read_lock(&self.cache).len()
    }

    pub fn is_empty(&self) -> bool {
        read_lock(&self.cache).is_empty()
    }

    /// Writes `value` at `keys` below `target` and returns it.
    ///
    /// Missing (null or undefined) intermediate segments are replaced by
    /// empty objects first.
    pub fn set(
        target: &Value,
        keys: &[String],
        value: Value,
        hooks: Option<&dyn RuntimeHooks>,
    ) -> Result<Value, EvalError> {
        let Some((last, intermediate)) = keys.split_last() else {
            return Ok(value);
        };

        let mut current = target.clone();
        for key in intermediate {
            let mut next = hooks::read_field(hooks, &current, key)?;
            if next.is_nullish() {
                next = Value::Object(Object::new());
                hooks::write_field(hooks, &current, key, next.clone())?;
            }
            current = next;
        }

        hooks::write_field(hooks, &current, last, value.clone())?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested(depth: usize, leaf: Value) -> (Value, String) {
        let keys: Vec<String> = (0..depth).map(|i| format!("k{}", i)).collect();
        let mut value = leaf;
        for key in keys.iter().rev() {
            value = Value::object([(key.as_str(), value)]);
        }
        (value, keys.join("."))
    }

    #[test]
    fn reads_paths_of_every_arity() {
        let paths = PathCompiler::new();
        for depth in 1..=12 {
            let (scope, path) = nested(depth, Value::Integer(depth as i64));
            let access = paths.getter(&path, &path).unwrap();
            assert_eq!(
                access.get(&scope, None, None).unwrap(),
                Value::Integer(depth as i64),
                "depth {}",
                depth
            );
        }
    }

    #[test]
    fn long_paths_consult_locals_for_the_first_key_only() {
        let paths = PathCompiler::new();
        let (scope, path) = nested(7, Value::from("scope"));
        let (locals, _) = nested(7, Value::from("locals"));
        let access = paths.getter(&path, &path).unwrap();
        assert_eq!(access.get(&scope, Some(&locals), None).unwrap(), Value::from("locals"));

        // k5 heads the second chunk
        let sixth = Value::object([("k5", Value::object([("k6", Value::from("locals"))]))]);
        assert_eq!(access.get(&scope, Some(&sixth), None).unwrap(), Value::from("scope"));
    }

    #[test]
    fn missing_intermediate_reads_undefined() {
        let paths = PathCompiler::new();
        let scope = Value::object([("a", Value::Null)]);
        let access = paths.getter("a.b.c", "a.b.c").unwrap();
        assert_eq!(access.get(&scope, None, None).unwrap(), Value::Undefined);

        let (scope, _) = nested(2, Value::Integer(1));
        let long = paths.getter("k0.x.y.z.w.v.u", "k0.x.y.z.w.v.u").unwrap();
        assert_eq!(long.get(&scope, None, None).unwrap(), Value::Undefined);
    }

    #[test]
    fn locals_shadow_the_first_segment_only_when_owned() {
        let paths = PathCompiler::new();
        let scope = Value::object([("a", Value::object([("b", Value::Integer(1))]))]);
        let locals = Value::object([("a", Value::object([("b", Value::Integer(2))]))]);
        let other = Value::object([("z", Value::Integer(9))]);

        let access = paths.getter("a.b", "a.b").unwrap();
        assert_eq!(access.get(&scope, Some(&locals), None).unwrap(), Value::Integer(2));
        assert_eq!(access.get(&scope, Some(&other), None).unwrap(), Value::Integer(1));
    }

    #[test]
    fn getters_are_cached_by_path() {
        let paths = PathCompiler::new();
        let first = paths.getter("a.b", "a.b").unwrap();
        let second = paths.getter("a.b", "a.b + 1").unwrap();
        assert!(Arc::ptr_eq(&first.getter, &second.getter));
        paths.getter("a", "a").unwrap();
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn reserved_segments_are_rejected_before_caching() {
        let paths = PathCompiler::new();
        assert!(paths.getter("a.constructor.b", "a.constructor.b").is_err());
        assert!(paths.getter("__proto__", "__proto__").is_err());
        assert!(paths.is_empty());
    }

    #[test]
    fn set_materializes_missing_segments() {
        let scope = Value::object([("a", Value::Null)]);
        let keys: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        let result = PathCompiler::set(&scope, &keys, Value::Integer(5), None).unwrap();
        assert_eq!(result, Value::Integer(5));

        let paths = PathCompiler::new();
        let access = paths.getter("a.b.c", "a.b.c").unwrap();
        assert_eq!(access.get(&scope, None, None).unwrap(), Value::Integer(5));
    }

    #[test]
    fn assign_targets_locals_that_own_the_key() {
        let paths = PathCompiler::new();
        let scope = Value::object([("x", Value::Integer(1))]);
        let locals = Value::object([("x", Value::Integer(2))]);
        let access = paths.getter("x", "x").unwrap();

        access
            .assign(&scope, Some(&locals), Value::Integer(3), None)
            .unwrap();
        assert_eq!(locals.get_field("x"), Value::Integer(3));
        assert_eq!(scope.get_field("x"), Value::Integer(1));

        let y = paths.getter("y", "y").unwrap();
        y.assign(&scope, Some(&locals), Value::Integer(4), None).unwrap();
        assert_eq!(scope.get_field("y"), Value::Integer(4));
        assert!(!locals.has_own("y"));
    }
}

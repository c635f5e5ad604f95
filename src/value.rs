use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::evaluator::EvalError;

/// Signature of a native function callable from expressions.
///
/// The first argument is the receiver (`this`): the object a method was read
/// from, or the scope for a bare call.
pub type NativeFn = dyn Fn(&Value, &[Value]) -> Result<Value, EvalError> + Send + Sync;

/// A dynamically typed value flowing through compiled expressions.
///
/// Arrays and objects are shared handles: cloning a `Value::Object` clones the
/// handle, not the map, so assignments made by an expression are visible to
/// everyone holding the same scope.
///
/// # Examples
///
/// ```
/// use binding_expr::value::{Object, Value};
///
/// let scope = Object::new();
/// scope.insert("name", Value::from("Alice"));
/// scope.insert("age", Value::Integer(30));
///
/// let value = Value::Object(scope.clone());
/// assert_eq!(value.get_field("age"), Value::Integer(30));
/// assert_eq!(value.get_field("missing"), Value::Undefined);
/// ```
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// Absent value (missing field, missing argument)
    #[default]
    Undefined,

    /// Explicit null
    Null,

    Boolean(bool),

    /// Integer number (preserved separately from floats)
    Integer(i64),

    /// Floating-point number, including `NaN` and the infinities
    Float(f64),

    String(String),

    Array(Array),

    Object(Object),

    /// Native function with its own member table
    Function(Function),
}

pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Shared, interior-mutable string-keyed map.
#[derive(Clone, Default)]
pub struct Object(Arc<RwLock<HashMap<String, Value>>>);

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        read_lock(&self.0).get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        write_lock(&self.0).insert(key.into(), value)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        write_lock(&self.0).remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        read_lock(&self.0).contains_key(key)
    }

    pub fn len(&self) -> usize {
        read_lock(&self.0).len()
    }

    pub fn is_empty(&self) -> bool {
        read_lock(&self.0).is_empty()
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = read_lock(&self.0).keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Copy of the current entries.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        read_lock(&self.0).clone()
    }

    /// True when both handles point at the same map.
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<HashMap<String, Value>> for Object {
    fn from(map: HashMap<String, Value>) -> Self {
        Object(Arc::new(RwLock::new(map)))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect::<HashMap<String, Value>>()
            .into()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        visit(Arc::as_ptr(&self.0) as usize, f, "[Circular]", |f| {
            let entries = self.snapshot();
            let mut keys: Vec<&String> = entries.keys().collect();
            keys.sort();
            f.debug_map()
                .entries(keys.into_iter().map(|k| (k, &entries[k])))
                .finish()
        })
    }
}

/// How many slots a single index write may add to an array.
pub const MAX_ARRAY_GROWTH: usize = 1 << 16;

/// Shared, interior-mutable list.
#[derive(Clone, Default)]
pub struct Array(Arc<RwLock<Vec<Value>>>);

impl Array {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        read_lock(&self.0).get(index).cloned()
    }

    /// Writes `value` at `index`, padding with `Undefined` when the index is
    /// past the end.
    ///
    /// A write may land at most [`MAX_ARRAY_GROWTH`] slots past the current
    /// end; anything further is a `TypeError`.
    pub fn set(&self, index: usize, value: Value) -> Result<(), EvalError> {
        let mut items = write_lock(&self.0);
        if index >= items.len() {
            if index - items.len() >= MAX_ARRAY_GROWTH {
                return Err(EvalError::TypeError(format!(
                    "Index {} is too far past the end of an array of length {}",
                    index,
                    items.len()
                )));
            }
            items.resize(index + 1, Value::Undefined);
        }
        items[index] = value;
        Ok(())
    }

    pub fn push(&self, value: Value) {
        write_lock(&self.0).push(value);
    }

    pub fn len(&self) -> usize {
        read_lock(&self.0).len()
    }

    pub fn is_empty(&self) -> bool {
        read_lock(&self.0).is_empty()
    }

    pub fn to_vec(&self) -> Vec<Value> {
        read_lock(&self.0).clone()
    }

    pub fn ptr_eq(&self, other: &Array) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Vec<Value>> for Array {
    fn from(items: Vec<Value>) -> Self {
        Array(Arc::new(RwLock::new(items)))
    }
}

impl FromIterator<Value> for Array {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<_>>().into()
    }
}

impl Array {
    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        visit(self.addr(), f, "[Circular]", |f| {
            f.debug_list().entries(self.to_vec().iter()).finish()
        })
    }
}

thread_local! {
    /// Containers currently being formatted on this thread.
    static FORMATTING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Formats a container with `body` unless it is already being formatted
/// further up the stack, in which case `cycle` is written instead.
fn visit<F>(addr: usize, f: &mut fmt::Formatter<'_>, cycle: &str, body: F) -> fmt::Result
where
    F: FnOnce(&mut fmt::Formatter<'_>) -> fmt::Result,
{
    if FORMATTING.with(|stack| stack.borrow().contains(&addr)) {
        return f.write_str(cycle);
    }
    FORMATTING.with(|stack| stack.borrow_mut().push(addr));
    let result = body(f);
    FORMATTING.with(|stack| stack.borrow_mut().pop());
    result
}

struct FunctionInner {
    name: String,
    call: Box<NativeFn>,
    props: Object,
}

/// A native function value.
///
/// Functions carry a member table like any other object, so a host can expose
/// members on them (and the sandbox can inspect them).
#[derive(Clone)]
pub struct Function(Arc<FunctionInner>);

impl Function {
    pub fn new<F>(name: impl Into<String>, call: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        Function(Arc::new(FunctionInner {
            name: name.into(),
            call: Box::new(call),
            props: Object::new(),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn call(&self, this: &Value, args: &[Value]) -> Result<Value, EvalError> {
        (self.0.call)(this, args)
    }

    /// Member table of the function object.
    pub fn props(&self) -> &Object {
        &self.0.props
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self.name())
    }
}

/// Parses a value used as a position into an array or string.
fn array_index(index: &Value) -> Option<usize> {
    match index {
        Value::Integer(n) if *n >= 0 => usize::try_from(*n).ok(),
        Value::Float(n) if n.is_finite() && *n >= 0.0 && n.fract() == 0.0 => Some(*n as usize),
        Value::String(s) => index_key(s),
        _ => None,
    }
}

/// Canonical decimal index keys only: `"1"` is a position, `"+1"` and `"01"`
/// are plain property names.
fn index_key(key: &str) -> Option<usize> {
    let canonical = !key.is_empty()
        && key.bytes().all(|b| b.is_ascii_digit())
        && (key == "0" || !key.starts_with('0'));
    if canonical { key.parse().ok() } else { None }
}

/// Number conversion of a trimmed, non-empty string.
fn parse_number(text: &str) -> Value {
    let radix = match text.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return match i64::from_str_radix(&text[2..], radix) {
            Ok(n) if !text[2..].starts_with(['+', '-']) => Value::Integer(n),
            _ => Value::Float(f64::NAN),
        };
    }

    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    if unsigned == "Infinity" {
        let n = if text.starts_with('-') { f64::NEG_INFINITY } else { f64::INFINITY };
        return Value::Float(n);
    }
    // Rust also reads "inf", "nan" and friends, which are not numbers here
    if !unsigned.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return Value::Float(f64::NAN);
    }
    match text.parse::<i64>() {
        Ok(n) => Value::Integer(n),
        Err(_) => Value::Float(text.parse::<f64>().unwrap_or(f64::NAN)),
    }
}

fn format_float(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{}Infinity", sign)
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{:.0}", n)
    } else {
        n.to_string()
    }
}

impl Value {
    /// Builds a function value from a closure.
    pub fn function<F>(name: impl Into<String>, call: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        Value::Function(Function::new(name, call))
    }

    /// Builds an object value from key/value pairs.
    pub fn object<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Object(pairs.into_iter().collect())
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(items.into_iter().collect())
    }

    /// Human-readable type name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// True for `null` and `undefined`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Check if the value is truthy (for conditions)
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Integer(n) => *n != 0,
            Value::Float(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) => true,
        }
    }

    /// Numeric coercion that keeps integers as integers.
    ///
    /// Always returns `Value::Integer` or `Value::Float`.
    pub fn to_numeric(&self) -> Value {
        match self {
            Value::Integer(_) | Value::Float(_) => self.clone(),
            Value::Null => Value::Integer(0),
            Value::Boolean(b) => Value::Integer(i64::from(*b)),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Value::Integer(0)
                } else {
                    parse_number(trimmed)
                }
            }
            // Through the joined text, like any other string
            Value::Array(_) => Value::String(self.to_string()).to_numeric(),
            Value::Undefined | Value::Object(_) | Value::Function(_) => Value::Float(f64::NAN),
        }
    }

    /// Get as float, after numeric coercion
    pub fn as_float(&self) -> f64 {
        match self.to_numeric() {
            Value::Integer(n) => n as f64,
            Value::Float(n) => n,
            _ => f64::NAN,
        }
    }

    /// Identity-aware equality used by `==` and `===`.
    ///
    /// Numbers compare by value across integer/float, containers and
    /// functions by identity. There is no type coercion.
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => self == other,
        }
    }

    /// Direct member read, without hooks.
    ///
    /// Missing members and members of primitives read as `Undefined`; arrays
    /// and strings expose `length` and numeric positions.
    pub fn get_field(&self, key: &str) -> Value {
        match self {
            Value::Object(map) => map.get(key).unwrap_or_default(),
            Value::Function(func) => func.props().get(key).unwrap_or_default(),
            Value::Array(items) => {
                if key == "length" {
                    Value::Integer(items.len() as i64)
                } else {
                    index_key(key)
                        .and_then(|i| items.get(i))
                        .unwrap_or_default()
                }
            }
            Value::String(s) => {
                if key == "length" {
                    Value::Integer(s.chars().count() as i64)
                } else {
                    index_key(key)
                        .and_then(|i| s.chars().nth(i))
                        .map(|c| Value::String(c.to_string()))
                        .unwrap_or_default()
                }
            }
            _ => Value::Undefined,
        }
    }

    /// Whether the value itself (not a default) owns `key`.
    pub fn has_own(&self, key: &str) -> bool {
        match self {
            Value::Object(map) => map.contains_key(key),
            Value::Function(func) => func.props().contains_key(key),
            Value::Array(items) => {
                key == "length" || index_key(key).is_some_and(|i| i < items.len())
            }
            _ => false,
        }
    }

    /// Direct member write, without hooks.
    pub fn set_field(&self, key: &str, value: Value) -> Result<(), EvalError> {
        match self {
            Value::Object(map) => {
                map.insert(key, value);
                Ok(())
            }
            Value::Function(func) => {
                func.props().insert(key, value);
                Ok(())
            }
            Value::Array(items) => match index_key(key) {
                Some(i) => items.set(i, value),
                None => Err(EvalError::TypeError(format!(
                    "Cannot set property '{}' of array",
                    key
                ))),
            },
            other => Err(EvalError::TypeError(format!(
                "Cannot set property '{}' of {}",
                key,
                other.type_name()
            ))),
        }
    }

    /// Direct `value[index]` read, without hooks.
    pub fn get_index(&self, index: &Value) -> Value {
        match (self, array_index(index)) {
            (Value::Array(items), Some(i)) => items.get(i).unwrap_or_default(),
            (Value::String(s), Some(i)) => s
                .chars()
                .nth(i)
                .map(|c| Value::String(c.to_string()))
                .unwrap_or_default(),
            _ => self.get_field(&index.to_string()),
        }
    }

    /// Direct `value[index] = v` write, without hooks.
    pub fn set_index(&self, index: &Value, value: Value) -> Result<(), EvalError> {
        match (self, array_index(index)) {
            (Value::Array(items), Some(i)) => items.set(i, value),
            _ => self.set_field(&index.to_string(), value),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
                *a as f64 == *b
            }
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b) || a.to_vec() == b.to_vec(),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b) || a.snapshot() == b.snapshot(),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// String conversion used for concatenation and computed keys.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(n) => f.write_str(&format_float(*n)),
            Value::String(s) => f.write_str(s),
            // A cycle back into an array being joined prints as empty
            Value::Array(items) => visit(items.addr(), f, "", |f| {
                let parts: Vec<String> = items
                    .to_vec()
                    .iter()
                    .map(|v| if v.is_nullish() { String::new() } else { v.to_string() })
                    .collect();
                f.write_str(&parts.join(","))
            }),
            Value::Object(_) => f.write_str("[object Object]"),
            Value::Function(func) => write!(f, "function {}() {{ [native code] }}", func.name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items.into())
    }
}

impl From<Object> for Value {
    fn from(map: Object) -> Self {
        Value::Object(map)
    }
}

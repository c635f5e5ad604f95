//! JSON <-> binding Value conversion utilities

use crate::value::{Object, Value};

/// Nesting depth after which `to_json` stops descending (objects may be cyclic).
const MAX_JSON_DEPTH: usize = 128;

/// Convert serde_json::Value to a binding Value
pub fn from_json(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::array(arr.into_iter().map(from_json)),
        serde_json::Value::Object(obj) => Value::Object(
            obj.into_iter()
                .map(|(k, v)| (k, from_json(v)))
                .collect::<Object>(),
        ),
    }
}

/// Convert a binding Value to serde_json::Value
///
/// `undefined`, functions and non-finite floats become `null`.
pub fn to_json(v: &Value) -> serde_json::Value {
    to_json_at(v, 0)
}

fn to_json_at(v: &Value, depth: usize) -> serde_json::Value {
    if depth > MAX_JSON_DEPTH {
        return serde_json::Value::Null;
    }
    match v {
        Value::Undefined | Value::Null | Value::Function(_) => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Integer(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Array(arr) => serde_json::Value::Array(
            arr.to_vec().iter().map(|item| to_json_at(item, depth + 1)).collect(),
        ),
        Value::Object(obj) => serde_json::Value::Object(
            obj.snapshot()
                .into_iter()
                .map(|(k, v)| (k, to_json_at(&v, depth + 1)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_documents_convert_both_ways() {
        let doc = json!({"name": "Ada", "tags": ["x", 1, 2.5, null], "ok": true});
        let value = from_json(doc.clone());
        assert_eq!(value.get_field("name"), Value::from("Ada"));
        assert_eq!(to_json(&value), doc);
    }

    #[test]
    fn non_json_values_become_null() {
        assert_eq!(to_json(&Value::Undefined), json!(null));
        assert_eq!(to_json(&Value::Float(f64::NAN)), json!(null));
        assert_eq!(
            to_json(&Value::function("f", |_, _| Ok(Value::Undefined))),
            json!(null)
        );
    }
}

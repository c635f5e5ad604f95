use binding_expr::{
    Compiler, CompilerOptions, ErrorKind, EvalError, RuntimeHooks, Value, from_json, to_json,
};
use serde_json::json;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

fn eval_expr(source: &str, scope: &Value) -> Result<Value, EvalError> {
    let compiled = Compiler::default()
        .compile(source)
        .unwrap_or_else(|e| panic!("failed to compile {}: {}", source, e));
    compiled.eval(scope, None)
}

fn eval_json(source: &str, scope: serde_json::Value) -> Value {
    eval_expr(source, &from_json(scope)).unwrap()
}

fn user_scope() -> Value {
    let user = Value::object([
        ("name", Value::from("Ada")),
        (
            "greet",
            Value::function("greet", |this, args| {
                let greeting = args.first().cloned().unwrap_or_default();
                Ok(Value::String(format!("{} {}", greeting, this.get_field("name"))))
            }),
        ),
    ]);
    Value::object([("user", user)])
}

// ============================================================================
// Arithmetic and Logic
// ============================================================================

#[test]
fn test_arithmetic() {
    let test_cases = vec![
        ("1 + 2", Value::Integer(3)),
        ("2 * 1.5", Value::Integer(3)),
        ("1 + 0.5", Value::Float(1.5)),
        ("7 / 2", Value::Float(3.5)),
        ("6 / 3", Value::Integer(2)),
        ("7 % 4", Value::Integer(3)),
        ("1 - 2 - 3", Value::Integer(-4)),
        ("-'3'", Value::Integer(-3)),
        ("1 + true", Value::Integer(2)),
    ];

    for (input, expected) in test_cases {
        assert_eq!(eval_json(input, json!({})), expected, "Failed for input: {}", input);
    }
}

#[test]
fn test_division_by_zero() {
    assert!(matches!(eval_json("1 / 0", json!({})), Value::Float(f) if f == f64::INFINITY));
}

#[test]
fn test_missing_operands_are_forgiven() {
    assert_eq!(eval_json("a + b", json!({"b": 5})), Value::Integer(5));
    assert_eq!(eval_json("a - b", json!({"b": 5})), Value::Integer(-5));
    assert_eq!(eval_json("a + b", json!({})), Value::Undefined);
    assert_eq!(eval_json("-x", json!({})), Value::Integer(0));
}

#[test]
fn test_string_concatenation() {
    assert_eq!(eval_json("'a' + 1", json!({})), Value::from("a1"));
    assert_eq!(eval_json("1 + '2'", json!({})), Value::from("12"));
    assert_eq!(
        eval_json("first + ' ' + last", json!({"first": "Ada", "last": "Lovelace"})),
        Value::from("Ada Lovelace")
    );
}

#[test]
fn test_equality_never_coerces() {
    let test_cases = vec![
        ("x == 1", true),
        ("x === 1", true),
        ("'1' == 1", false),
        ("null == undefined", false),
        ("s != 'a'", true),
        ("0 == false", false),
    ];
    let scope = json!({"x": 1.0, "s": "b"});

    for (input, expected) in test_cases {
        assert_eq!(
            eval_json(input, scope.clone()),
            Value::Boolean(expected),
            "Failed for input: {}",
            input
        );
    }
}

#[test]
fn test_objects_compare_by_identity() {
    let scope = json!({"a": {"k": 1}, "b": {"k": 1}});
    let scope = from_json(scope);
    assert_eq!(eval_expr("a == a", &scope).unwrap(), Value::Boolean(true));
    assert_eq!(eval_expr("a == b", &scope).unwrap(), Value::Boolean(false));
}

#[test]
fn test_relational() {
    let scope = json!({"a": "apple", "b": "banana", "n": 3});
    assert_eq!(eval_json("a < b", scope.clone()), Value::Boolean(true));
    assert_eq!(eval_json("n >= 3", scope.clone()), Value::Boolean(true));
    assert_eq!(eval_json("'10' > 9", scope.clone()), Value::Boolean(true));
    // undefined is NaN: every comparison is false
    assert_eq!(eval_json("missing > 1", scope.clone()), Value::Boolean(false));
    assert_eq!(eval_json("missing < 1", scope), Value::Boolean(false));
}

#[test]
fn test_logical_operators_return_operands() {
    assert_eq!(eval_json("1 || 0 && 0", json!({})), Value::Integer(1));
    assert_eq!(eval_json("name || 'anonymous'", json!({})), Value::from("anonymous"));
    assert_eq!(eval_json("a && a.b", json!({"a": null})), Value::Null);
    assert_eq!(eval_json("!items.length", json!({"items": []})), Value::Boolean(true));
}

#[test]
fn test_ternary() {
    assert_eq!(eval_json("true ? 1 : 2", json!({})), Value::Integer(1));
    assert_eq!(
        eval_json("n > 1 ? 'many' : n == 1 ? 'one' : 'none'", json!({"n": 1})),
        Value::from("one")
    );
}

#[test]
fn test_empty_expression_is_undefined() {
    assert_eq!(eval_json("", json!({})), Value::Undefined);
}

// ============================================================================
// Paths and Locals
// ============================================================================

#[test]
fn test_nested_path() {
    let scope = json!({"a": {"b": {"c": 5}}});
    assert_eq!(eval_json("a.b.c", scope), Value::Integer(5));
}

#[test]
fn test_missing_path_segments_read_undefined() {
    assert_eq!(eval_json("a.b.c", json!({"a": {}})), Value::Undefined);
    assert_eq!(eval_json("a.b.c", json!({"a": null})), Value::Undefined);
    assert_eq!(eval_json("a.b.c", json!({})), Value::Undefined);
}

#[test]
fn test_long_paths() {
    let scope = json!({"a": {"b": {"c": {"d": {"e": {"f": {"g": "deep"}}}}}}});
    assert_eq!(eval_json("a.b.c.d.e.f.g", scope), Value::from("deep"));
}

#[test]
fn test_locals_shadow_only_the_head_of_long_paths() {
    let compiler = Compiler::default();
    let scope = from_json(json!({"a": {"b": {"c": {"d": {"e": {"f": 1}}}}}}));
    let path = compiler.compile("a.b.c.d.e.f").unwrap();

    // The sixth key starts a new chunk, which never looks at locals
    let owns_sixth = from_json(json!({"f": 99}));
    assert_eq!(path.eval(&scope, Some(&owns_sixth)).unwrap(), Value::Integer(1));

    let owns_head = from_json(json!({"a": {"b": {"c": {"d": {"e": {"f": 2}}}}}}));
    assert_eq!(path.eval(&scope, Some(&owns_head)).unwrap(), Value::Integer(2));
}

#[test]
fn test_locals_shadow_scope() {
    let compiler = Compiler::default();
    let scope = from_json(json!({"name": "scope", "other": "from scope"}));
    let locals = from_json(json!({"name": "local"}));

    let name = compiler.compile("name").unwrap();
    assert_eq!(name.eval(&scope, Some(&locals)).unwrap(), Value::from("local"));
    assert_eq!(name.eval(&scope, None).unwrap(), Value::from("scope"));

    let other = compiler.compile("other").unwrap();
    assert_eq!(other.eval(&scope, Some(&locals)).unwrap(), Value::from("from scope"));
}

#[test]
fn test_locals_shadow_only_the_first_segment() {
    let compiler = Compiler::default();
    let scope = from_json(json!({"item": {"title": "scope"}}));
    let locals = from_json(json!({"item": {"title": "local"}}));

    let title = compiler.compile("item.title").unwrap();
    assert_eq!(title.eval(&scope, Some(&locals)).unwrap(), Value::from("local"));
}

#[test]
fn test_index_access() {
    let scope = json!({
        "items": [10, 20, 30],
        "i": 2,
        "obj": {"a-b": "dash"},
    });
    assert_eq!(eval_json("items[1]", scope.clone()), Value::Integer(20));
    assert_eq!(eval_json("items[i]", scope.clone()), Value::Integer(30));
    assert_eq!(eval_json("items[i - 2] + items.length", scope.clone()), Value::Integer(13));
    assert_eq!(eval_json("obj['a-b']", scope.clone()), Value::from("dash"));
    assert_eq!(eval_json("'abc'[1]", scope.clone()), Value::from("b"));
    assert_eq!(eval_json("missing[0]", scope), Value::Undefined);
}

#[test]
fn test_literals_evaluate_to_fresh_values() {
    let value = eval_json("{a: 1, b: [x, 'y']}", json!({"x": 2}));
    assert_eq!(to_json(&value), json!({"a": 1, "b": [2, "y"]}));
}

// ============================================================================
// Calls
// ============================================================================

#[test]
fn test_method_receives_its_object() {
    let scope = user_scope();
    assert_eq!(eval_expr("user.greet('hi')", &scope).unwrap(), Value::from("hi Ada"));
    assert_eq!(eval_expr("user['greet']('yo')", &scope).unwrap(), Value::from("yo Ada"));
}

#[test]
fn test_bare_call_receives_scope() {
    let scope = Value::object([
        ("id", Value::Integer(7)),
        ("whoami", Value::function("whoami", |this, _| Ok(this.get_field("id")))),
    ]);
    assert_eq!(eval_expr("whoami()", &scope).unwrap(), Value::Integer(7));
}

#[test]
fn test_arguments_evaluate_left_to_right() {
    let counter = Arc::new(AtomicI64::new(0));
    let next = {
        let counter = counter.clone();
        Value::function("next", move |_, _| {
            Ok(Value::Integer(counter.fetch_add(1, Ordering::SeqCst) + 1))
        })
    };
    let scope = Value::object([
        ("next", next),
        ("list", Value::function("list", |_, args| Ok(Value::array(args.to_vec())))),
    ]);

    let result = eval_expr("list(next(), next(), next())", &scope).unwrap();
    assert_eq!(to_json(&result), json!([1, 2, 3]));
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[test]
fn test_calling_nothing_is_undefined() {
    assert_eq!(eval_json("missing()", json!({})), Value::Undefined);
    assert_eq!(eval_json("a.b.missing(1)", json!({"a": {}})), Value::Undefined);
}

#[test]
fn test_calling_a_non_function_fails() {
    let err = eval_expr("n()", &from_json(json!({"n": 5}))).unwrap_err();
    assert!(matches!(err, EvalError::TypeError(_)), "got {:?}", err);
    assert_eq!(err.kind(), ErrorKind::Type);
}

#[test]
fn test_host_errors_propagate() {
    let scope = Value::object([(
        "fail",
        Value::function("fail", |_, _| Err(EvalError::Host("boom".into()))),
    )]);
    let err = eval_expr("1 + fail()", &scope).unwrap_err();
    assert_eq!(err, EvalError::Host("boom".into()));
    assert_eq!(err.kind(), ErrorKind::Host);
}

// ============================================================================
// Assignment
// ============================================================================

#[test]
fn test_assignment_creates_intermediate_objects() {
    let scope = from_json(json!({}));
    let result = eval_expr("a.b.c = 5", &scope).unwrap();
    assert_eq!(result, Value::Integer(5));
    assert_eq!(to_json(&scope), json!({"a": {"b": {"c": 5}}}));
}

#[test]
fn test_assignment_through_index_pads_arrays() {
    let scope = from_json(json!({"items": [0]}));
    eval_expr("items[3] = 1", &scope).unwrap();
    assert_eq!(to_json(&scope), json!({"items": [0, null, null, 1]}));
}

#[test]
fn test_assignment_far_past_the_end_is_rejected() {
    let scope = from_json(json!({"items": []}));

    for input in ["items[1e15] = 1", "items[4294967296] = 1", "items['4294967296'] = 1"] {
        match eval_expr(input, &scope) {
            Err(EvalError::TypeError(msg)) => assert!(msg.contains("too far past the end"), "{}", msg),
            other => panic!("Expected type error for {}, got {:?}", input, other),
        }
    }
    assert_eq!(to_json(&scope), json!({"items": []}));
}

#[test]
fn test_cyclic_arrays_convert_to_text() {
    let scope = from_json(json!({"a": [], "b": [1]}));
    assert_eq!(eval_expr("a[0] = a; '' + a", &scope), Ok(Value::from("")));
    assert_eq!(eval_expr("b[1] = b; 'b=' + b", &scope), Ok(Value::from("b=1,")));
    assert_eq!(eval_expr("a - 0", &scope), Ok(Value::Integer(0)));
}

#[test]
fn test_assignment_into_computed_object() {
    let scope = from_json(json!({"rows": [{"n": 1}]}));
    eval_expr("rows[0].n = rows[0].n + 1", &scope).unwrap();
    assert_eq!(to_json(&scope), json!({"rows": [{"n": 2}]}));
}

#[test]
fn test_statements_run_in_order() {
    let scope = from_json(json!({}));
    assert_eq!(eval_expr("a = 1; b = a + 1; b", &scope).unwrap(), Value::Integer(2));
    assert_eq!(to_json(&scope), json!({"a": 1, "b": 2}));
}

#[test]
fn test_assign_entry_point() {
    let compiler = Compiler::default();
    let scope = user_scope();

    let name = compiler.compile("user.name").unwrap();
    assert!(name.is_assignable());
    name.assign(&scope, Value::from("Grace"), None).unwrap();
    assert_eq!(eval_expr("user.greet('hello')", &scope).unwrap(), Value::from("hello Grace"));

    let sum = compiler.compile("a + 1").unwrap();
    assert!(!sum.is_assignable());
    assert!(matches!(
        sum.assign(&scope, Value::Integer(1), None),
        Err(EvalError::NotAssignable(_))
    ));
}

#[test]
fn test_assignment_prefers_locals_that_own_the_key() {
    let compiler = Compiler::default();
    let scope = from_json(json!({"x": 1}));
    let locals = from_json(json!({"x": 2}));

    compiler.compile("x = 10").unwrap().eval(&scope, Some(&locals)).unwrap();
    assert_eq!(to_json(&locals), json!({"x": 10}));
    assert_eq!(to_json(&scope), json!({"x": 1}));

    compiler.compile("y = 3").unwrap().eval(&scope, Some(&locals)).unwrap();
    assert_eq!(to_json(&scope), json!({"x": 1, "y": 3}));
}

// ============================================================================
// Filters
// ============================================================================

#[test]
fn test_custom_filter() {
    let options = CompilerOptions::default().with_filter("double", |input, _| {
        Ok(match input.to_numeric() {
            Value::Integer(n) => Value::Integer(n * 2),
            other => Value::Float(other.as_float() * 2.0),
        })
    });
    let compiler = Compiler::new(options);
    let scope = from_json(json!({"a": 3}));

    let expr = compiler.compile("a | double").unwrap();
    assert_eq!(expr.eval(&scope, None).unwrap(), Value::Integer(6));

    let chained = compiler.compile("a | double | double").unwrap();
    assert_eq!(chained.eval(&scope, None).unwrap(), Value::Integer(12));
}

#[test]
fn test_builtin_filters() {
    let scope = json!({"name": "Ada", "items": [10, 20, 30]});
    assert_eq!(eval_json("name | uppercase", scope.clone()), Value::from("ADA"));
    assert_eq!(eval_json("name | lowercase", scope.clone()), Value::from("ada"));
    assert_eq!(
        to_json(&eval_json("items | limitTo:2", scope.clone())),
        json!([10, 20])
    );
    assert_eq!(
        to_json(&eval_json("items | limitTo:-1", scope.clone())),
        json!([30])
    );
    assert_eq!(eval_json("items[0] | json", scope), Value::from("10"));
}

#[test]
fn test_unknown_filter() {
    let err = eval_expr("name | nope", &from_json(json!({}))).unwrap_err();
    assert_eq!(err, EvalError::UnknownFilter("nope".into()));
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

// ============================================================================
// Runtime Hooks
// ============================================================================

#[derive(Default)]
struct RecordingHooks {
    reads: Mutex<Vec<String>>,
    writes: Mutex<Vec<(Value, String, Value)>>,
    index_writes: Mutex<Vec<(Value, Value)>>,
}

impl RuntimeHooks for RecordingHooks {
    fn read_field(&self, object: &Value, name: &str) -> Result<Value, EvalError> {
        self.reads.lock().unwrap().push(name.to_string());
        Ok(object.get_field(name))
    }

    // Records instead of writing
    fn write_field(&self, object: &Value, name: &str, value: Value) -> Result<(), EvalError> {
        self.writes
            .lock()
            .unwrap()
            .push((object.clone(), name.to_string(), value));
        Ok(())
    }

    fn read_index(&self, _object: &Value, _key: &Value) -> Result<Value, EvalError> {
        Ok(Value::from("hooked"))
    }

    fn write_index(&self, _object: &Value, key: &Value, value: Value) -> Result<(), EvalError> {
        self.index_writes.lock().unwrap().push((key.clone(), value));
        Ok(())
    }
}

#[test]
fn test_hooks_intercept_field_writes() {
    let compiler = Compiler::default();
    let scope = from_json(json!({"a": {}}));
    let hooks = RecordingHooks::default();

    let result = compiler
        .compile("a.b = 5")
        .unwrap()
        .eval_with_hooks(&scope, None, &hooks)
        .unwrap();
    assert_eq!(result, Value::Integer(5));

    let writes = hooks.writes.lock().unwrap();
    assert_eq!(writes.len(), 1);
    let (object, name, value) = &writes[0];
    assert!(object.strict_equals(&scope.get_field("a")));
    assert_eq!(name, "b");
    assert_eq!(value, &Value::Integer(5));

    // the hook did not write through
    assert_eq!(to_json(&scope), json!({"a": {}}));
}

#[test]
fn test_hooks_see_every_path_segment() {
    let compiler = Compiler::default();
    let scope = from_json(json!({"a": {"b": {"c": 1}}}));
    let hooks = RecordingHooks::default();

    let value = compiler
        .compile("a.b.c")
        .unwrap()
        .eval_with_hooks(&scope, None, &hooks)
        .unwrap();
    assert_eq!(value, Value::Integer(1));
    assert_eq!(*hooks.reads.lock().unwrap(), vec!["a", "b", "c"]);
}

#[test]
fn test_hooks_intercept_index_access() {
    let compiler = Compiler::default();
    let scope = from_json(json!({"items": [1, 2]}));
    let hooks = RecordingHooks::default();

    let read = compiler
        .compile("items[0]")
        .unwrap()
        .eval_with_hooks(&scope, None, &hooks)
        .unwrap();
    assert_eq!(read, Value::from("hooked"));

    compiler
        .compile("items[1]")
        .unwrap()
        .assign_with_hooks(&scope, Value::Integer(9), None, &hooks)
        .unwrap();
    assert_eq!(
        *hooks.index_writes.lock().unwrap(),
        vec![(Value::Integer(1), Value::Integer(9))]
    );
    assert_eq!(to_json(&scope), json!({"items": [1, 2]}));
}

// ============================================================================
// Error Kinds
// ============================================================================

#[test]
fn test_compile_error_kinds() {
    let compiler = Compiler::default();
    let test_cases = vec![
        ("1 +", ErrorKind::Syntax),
        ("'abc", ErrorKind::Lex),
        ("a # b", ErrorKind::Lex),
        ("a.constructor", ErrorKind::Sandbox),
        ("1 = 2", ErrorKind::Syntax),
    ];

    for (input, expected) in test_cases {
        let err = compiler.compile(input).unwrap_err();
        assert_eq!(err.kind(), expected, "Failed for input: {}", input);
    }
}

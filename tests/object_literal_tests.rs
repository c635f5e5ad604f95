// tests/object_literal_tests.rs

use binding_expr::{Compiler, ObjectLiteralEntry, Value, from_json, parse_object_literal};
use serde_json::json;

fn pair(key: &str, value: &str) -> ObjectLiteralEntry {
    ObjectLiteralEntry::Pair {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn unknown(text: &str) -> ObjectLiteralEntry {
    ObjectLiteralEntry::Unknown(text.to_string())
}

// ============================================================================
// Splitting
// ============================================================================

#[test]
fn test_simple_pairs() {
    assert_eq!(
        parse_object_literal("foo: 1, 'bar-baz': 2, \"qux\": three"),
        vec![pair("foo", "1"), pair("bar-baz", "2"), pair("qux", "three")]
    );
}

#[test]
fn test_outer_braces_are_optional() {
    assert_eq!(
        parse_object_literal("  { text: name, visible: shown }  "),
        vec![pair("text", "name"), pair("visible", "shown")]
    );
}

#[test]
fn test_empty_input() {
    let test_cases = vec!["", "   ", "{}", "{ }", ","];
    for input in test_cases {
        assert_eq!(parse_object_literal(input), vec![], "Failed for input: {:?}", input);
    }
}

#[test]
fn test_trailing_comma_is_ignored() {
    assert_eq!(parse_object_literal("a: 1,"), vec![pair("a", "1")]);
}

#[test]
fn test_brackets_do_not_split() {
    assert_eq!(
        parse_object_literal("{ a: f(1, 2), b: [1, 2] }"),
        vec![pair("a", "f(1,2)"), pair("b", "[1,2]")]
    );
}

#[test]
fn test_nested_object_value() {
    assert_eq!(
        parse_object_literal("css: { active: on, big: size > 3 }, id: 1"),
        vec![pair("css", "{active:on,big:size > 3}"), pair("id", "1")]
    );
}

#[test]
fn test_strings_do_not_split() {
    assert_eq!(
        parse_object_literal(r#"title: "a: b, c", other: 'x,y'"#),
        vec![pair("title", r#""a: b, c""#), pair("other", "'x,y'")]
    );
}

#[test]
fn test_inner_spaces_are_kept() {
    assert_eq!(
        parse_object_literal("visible: count > 0 && open"),
        vec![pair("visible", "count > 0 && open")]
    );
}

// ============================================================================
// Slashes
// ============================================================================

#[test]
fn test_regex_literal_value() {
    assert_eq!(
        parse_object_literal("pattern: /a,b/i, next: 1"),
        vec![pair("pattern", "/a,b/i"), pair("next", "1")]
    );
}

#[test]
fn test_division_after_operand() {
    assert_eq!(
        parse_object_literal("a: x / 2, b: y / 3"),
        vec![pair("a", "x/2"), pair("b", "y/3")]
    );
    assert_eq!(
        parse_object_literal("text: a / b, html: c"),
        vec![pair("text", "a/b"), pair("html", "c")]
    );
}

// ============================================================================
// Unknown Entries
// ============================================================================

#[test]
fn test_text_without_key() {
    assert_eq!(parse_object_literal("justtext"), vec![unknown("justtext")]);
}

#[test]
fn test_key_without_value() {
    assert_eq!(
        parse_object_literal("enable:, b: 1"),
        vec![unknown("enable"), pair("b", "1")]
    );
}

#[test]
fn test_entry_accessors() {
    let entries = parse_object_literal("a: 1, loose");
    assert_eq!(entries[0].key(), Some("a"));
    assert_eq!(entries[0].value(), "1");
    assert_eq!(entries[1].key(), None);
    assert_eq!(entries[1].value(), "loose");
}

// ============================================================================
// Compiling Entries
// ============================================================================

#[test]
fn test_entries_compile_and_evaluate() {
    let compiler = Compiler::default();
    let scope = from_json(json!({"price": 4, "qty": 3, "name": "widget"}));

    let results: Vec<(String, Value)> =
        parse_object_literal("total: price * qty, label: name | uppercase, note: 'a, b'")
            .into_iter()
            .map(|entry| {
                let key = entry.key().unwrap_or_default().to_string();
                let value = compiler.compile(entry.value()).unwrap().eval(&scope, None).unwrap();
                (key, value)
            })
            .collect();

    assert_eq!(
        results,
        vec![
            ("total".to_string(), Value::Integer(12)),
            ("label".to_string(), Value::from("WIDGET")),
            ("note".to_string(), Value::from("a, b")),
        ]
    );
}

//! Splitting binding-attribute text into `key: value` pairs.
//!
//! Binding attributes look like the inside of an object literal
//! (`text: name, css: { active: on }, click: select`). The values are left as
//! raw text for the expression compiler; this module only finds where each
//! pair starts and ends, which means tracking bracket depth and skipping
//! over strings and regex-like literals.

use lazy_static::lazy_static;
use regex::Regex;

use crate::lexer::is_division_context;

lazy_static! {
    /// Double-quoted string, single-quoted string, `/.../flags`, a run of
    /// ordinary characters, or any single non-blank character.
    static ref BINDING_TOKEN: Regex = Regex::new(concat!(
        r#""(?:[^"\\]|\\.)*""#,
        r#"|'(?:[^'\\]|\\.)*'"#,
        r#"|/(?:[^/\\]|\\.)*/\w*"#,
        r#"|[^\s:,/][^,"'{}()/:\[\]]*[^\s,"'{}()/:\[\]]"#,
        r#"|[^\s]"#,
    ))
    .unwrap();
}

/// One entry of a binding attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectLiteralEntry {
    /// `key: value`, the key unquoted and the value as raw source text
    Pair { key: String, value: String },
    /// Text that is not a `key: value` pair
    Unknown(String),
}

impl ObjectLiteralEntry {
    pub fn key(&self) -> Option<&str> {
        match self {
            ObjectLiteralEntry::Pair { key, .. } => Some(key),
            ObjectLiteralEntry::Unknown(_) => None,
        }
    }

    /// The value text, or the whole text of an unknown entry.
    pub fn value(&self) -> &str {
        match self {
            ObjectLiteralEntry::Pair { value, .. } => value,
            ObjectLiteralEntry::Unknown(text) => text,
        }
    }
}

/// Tokens of `text[start..]` with their byte offsets in `text`.
fn tokenize_from(text: &str, start: usize) -> Vec<(usize, String)> {
    BINDING_TOKEN
        .find_iter(&text[start..])
        .map(|m| (start + m.start(), m.as_str().to_string()))
        .collect()
}

fn strip_braces(text: &str) -> &str {
    if !text.starts_with('{') {
        return text;
    }
    match text.char_indices().next_back() {
        Some((last, _)) if last > 0 => &text[1..last],
        _ => "",
    }
}

fn unquote(token: &str) -> String {
    if token.len() >= 2 {
        token[1..token.len() - 1].to_string()
    } else {
        String::new()
    }
}

/// Splits binding-attribute text into its entries, in source order.
///
/// An outer pair of braces is optional. Commas and colons inside brackets,
/// strings or regex-like literals do not split.
///
/// # Examples
///
/// ```
/// use binding_expr::object_literal::{ObjectLiteralEntry, parse_object_literal};
///
/// let entries = parse_object_literal("text: name, 'data-id': ids[0]");
/// assert_eq!(
///     entries,
///     vec![
///         ObjectLiteralEntry::Pair { key: "text".into(), value: "name".into() },
///         ObjectLiteralEntry::Pair { key: "data-id".into(), value: "ids[0]".into() },
///     ]
/// );
/// ```
pub fn parse_object_literal(source: &str) -> Vec<ObjectLiteralEntry> {
    let text = format!("{}\n,", strip_braces(source.trim()));
    let mut tokens = tokenize_from(&text, 0);

    let mut entries = Vec::new();
    if tokens.len() <= 1 {
        return entries;
    }

    let mut key: Option<String> = None;
    let mut values: Vec<String> = Vec::new();
    let mut depth: i32 = 0;
    let mut i = 0;

    while i < tokens.len() {
        let (offset, mut token) = tokens[i].clone();
        match token.chars().next() {
            Some(',') if depth <= 0 => {
                let value = values.concat();
                match key.take().filter(|k| !k.is_empty()) {
                    Some(key) if !value.is_empty() => {
                        entries.push(ObjectLiteralEntry::Pair { key, value })
                    }
                    Some(key) => entries.push(ObjectLiteralEntry::Unknown(key)),
                    None if !value.is_empty() => entries.push(ObjectLiteralEntry::Unknown(value)),
                    None => {}
                }
                values.clear();
                depth = 0;
                i += 1;
                continue;
            }
            Some(':') if depth == 0 && key.is_none() && values.len() == 1 => {
                key = values.pop();
                i += 1;
                continue;
            }
            // After an operand `/` divides: rescan from just past it
            Some('/') if i > 0 && token.len() > 1 && is_division_context(&tokens[i - 1].1) => {
                tokens = tokenize_from(&text, offset + 1);
                values.push("/".to_string());
                i = 0;
                continue;
            }
            Some('(' | '{' | '[') => depth += 1,
            Some(')' | '}' | ']') => depth -= 1,
            Some('"' | '\'') if key.is_none() && values.is_empty() => token = unquote(&token),
            _ => {}
        }
        values.push(token);
        i += 1;
    }

    entries
}

//! Token and binding dumps for debugging expressions

use serde_json::json;

use super::CliError;
use crate::{
    lexer::lex,
    object_literal::{ObjectLiteralEntry, parse_object_literal},
};

/// Lex an expression and describe every token as JSON
pub fn describe_tokens(expression: &str) -> Result<serde_json::Value, CliError> {
    let lexemes = lex(expression).map_err(|e| CliError::Compile(e.into()))?;
    Ok(lexemes
        .iter()
        .map(|lexeme| {
            json!({
                "column": lexeme.index + 1,
                "text": lexeme.text,
                "token": format!("{:?}", lexeme.token),
                "json": lexeme.json,
            })
        })
        .collect())
}

/// Split binding-attribute text into entries as JSON
pub fn describe_bindings(text: &str) -> serde_json::Value {
    parse_object_literal(text)
        .into_iter()
        .map(|entry| match entry {
            ObjectLiteralEntry::Pair { key, value } => json!({ "key": key, "value": value }),
            ObjectLiteralEntry::Unknown(text) => json!({ "unknown": text }),
        })
        .collect()
}

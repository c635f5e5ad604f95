use std::collections::VecDeque;

use thiserror::Error;

use crate::{
    ast::{BinOp, Expr, Token, UnaryOp},
    lexer::{LexError, Lexeme, lex},
    path::PathCompiler,
    sandbox::SandboxError,
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    UnexpectedToken,
    ExpectedToken,
    TrailingToken,
    UnexpectedEnd,
    NotAssignable,
    FunctionCallDisallowed,
    NotPrimary,
    RegexUnsupported,
    NotJson,
}

/// A grammar violation. `column` is 1-based; for an unexpected end of input
/// it points just past the last character.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Syntax Error: {message} at column {column} of the expression [{expression}]")]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    /// Text of the offending token, if there is one
    pub token: Option<String>,
    pub column: usize,
    pub expression: String,
    pub message: String,
}

/// Everything that can go wrong turning source text into an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    /// Only strings compile; carries the type name of what was given
    #[error("Expected expression text, got {0}")]
    NotText(&'static str),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserOptions {
    /// Reject any call site at parse time
    pub disallow_function_calls: bool,
}

/// Lexes and parses `source` in one call.
pub fn parse(source: &str, paths: &PathCompiler, options: ParserOptions) -> Result<Expr, ParseError> {
    let lexemes = lex(source)?;
    Parser::new(lexemes, source, paths, options).parse()
}

/// Recursive-descent parser over a lexeme queue.
///
/// Each parser is used once: `parse` and `parse_json` consume it.
pub struct Parser<'a> {
    lexemes: VecDeque<Lexeme>,
    source: &'a str,
    paths: &'a PathCompiler,
    options: ParserOptions,
    json: bool,
}

impl<'a> Parser<'a> {
    pub fn new(
        lexemes: Vec<Lexeme>,
        source: &'a str,
        paths: &'a PathCompiler,
        options: ParserOptions,
    ) -> Self {
        Parser {
            lexemes: lexemes.into(),
            source,
            paths,
            options,
            json: false,
        }
    }

    /// Parses a full expression: `;`-separated statements, each a filter
    /// chain.
    pub fn parse(mut self) -> Result<Expr, ParseError> {
        let expr = self.statements()?;
        self.ensure_consumed()?;
        Ok(expr)
    }

    /// Parses a single literal value, accepting only tokens valid in JSON at
    /// their position.
    pub fn parse_json(mut self) -> Result<Expr, ParseError> {
        self.json = true;
        let expr = self.unary()?;
        self.ensure_consumed()?;
        Ok(expr)
    }

    fn ensure_consumed(&self) -> Result<(), ParseError> {
        match self.lexemes.front() {
            Some(lexeme) => Err(self.error_at(
                SyntaxErrorKind::TrailingToken,
                lexeme,
                "is an unexpected token",
            )),
            None => Ok(()),
        }
    }

    // --- Token helpers ---

    fn check(&self, token: &Token) -> bool {
        self.lexemes
            .front()
            .is_some_and(|l| std::mem::discriminant(&l.token) == std::mem::discriminant(token))
    }

    fn check_any(&self, tokens: &[Token]) -> bool {
        tokens.iter().any(|token| self.check(token))
    }

    /// Pops the next lexeme.
    fn next(&mut self) -> Result<Lexeme, ParseError> {
        let lexeme = self.lexemes.pop_front().ok_or_else(|| self.unexpected_end())?;
        if self.json && !lexeme.json {
            return Err(self.error_at(SyntaxErrorKind::NotJson, &lexeme, "is not valid json"));
        }
        Ok(lexeme)
    }

    /// Pops the next lexeme when it is `token`.
    fn eat(&mut self, token: &Token) -> Result<Option<Lexeme>, ParseError> {
        if self.check(token) {
            self.next().map(Some)
        } else {
            Ok(None)
        }
    }

    fn expect(&mut self, token: &Token, spelling: &str) -> Result<Lexeme, ParseError> {
        if self.check(token) {
            return self.next();
        }
        match self.lexemes.front() {
            Some(lexeme) => Err(self.error_at(
                SyntaxErrorKind::ExpectedToken,
                lexeme,
                &format!("is unexpected, expecting [{}]", spelling),
            )),
            None => Err(self.unexpected_end()),
        }
    }

    fn error_at(&self, kind: SyntaxErrorKind, lexeme: &Lexeme, detail: &str) -> ParseError {
        ParseError::Syntax(SyntaxError {
            kind,
            token: Some(lexeme.text.clone()),
            column: lexeme.index + 1,
            expression: self.source.to_string(),
            message: format!("Token '{}' {}", lexeme.text, detail),
        })
    }

    fn unexpected_end(&self) -> ParseError {
        ParseError::Syntax(SyntaxError {
            kind: SyntaxErrorKind::UnexpectedEnd,
            token: None,
            column: self.source.chars().count() + 1,
            expression: self.source.to_string(),
            message: "Unexpected end of expression".to_string(),
        })
    }

    fn next_index(&self) -> usize {
        self.lexemes.front().map_or(0, |l| l.index)
    }

    fn source_between(&self, start: usize, end: usize) -> String {
        let text: String = self.source.chars().skip(start).take(end.saturating_sub(start)).collect();
        text.trim().to_string()
    }

    // --- Grammar ---

    fn statements(&mut self) -> Result<Expr, ParseError> {
        let mut statements = Vec::new();
        loop {
            let closes = [Token::RBrace, Token::RParen, Token::Semicolon, Token::RBracket];
            if !self.lexemes.is_empty() && !self.check_any(&closes) {
                statements.push(self.filter_chain()?);
            }
            if self.eat(&Token::Semicolon)?.is_none() {
                return Ok(match statements.len() {
                    1 => statements.remove(0),
                    _ => Expr::Statements(statements),
                });
            }
        }
    }

    fn filter_chain(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.assignment()?;
        while self.eat(&Token::Pipe)?.is_some() {
            left = self.filter(left)?;
        }
        Ok(left)
    }

    /// `input | name:arg1:arg2`
    fn filter(&mut self, input: Expr) -> Result<Expr, ParseError> {
        let name = self.expect(&Token::Identifier(String::new()), "filter name")?;
        let mut args = Vec::new();
        while self.eat(&Token::Colon)?.is_some() {
            args.push(self.assignment()?);
        }
        Ok(Expr::Filter {
            input: Box::new(input),
            name: name.text,
            args,
        })
    }

    fn assignment(&mut self) -> Result<Expr, ParseError> {
        let start = self.next_index();
        let left = self.ternary()?;
        if let Some(equals) = self.eat(&Token::Assign)? {
            if !left.is_assignable() {
                let target = self.source_between(start, equals.index);
                return Err(self.error_at(
                    SyntaxErrorKind::NotAssignable,
                    &equals,
                    &format!("implies assignment but [{}] can not be assigned to", target),
                ));
            }
            let value = self.ternary()?;
            return Ok(Expr::Assign {
                target: Box::new(left),
                value: Box::new(value),
            });
        }
        Ok(left)
    }

    fn ternary(&mut self) -> Result<Expr, ParseError> {
        let condition = self.logical_or()?;
        if self.eat(&Token::Question)?.is_none() {
            return Ok(condition);
        }
        let consequent = self.ternary()?;
        self.expect(&Token::Colon, ":")?;
        let alternate = self.ternary()?;
        Ok(Expr::Ternary {
            condition: Box::new(condition),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.logical_and()?;
        while self.eat(&Token::OrOr)?.is_some() {
            let right = self.logical_and()?;
            left = binary(BinOp::Or, left, right);
        }
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.equality()?;
        while self.eat(&Token::AndAnd)?.is_some() {
            let right = self.equality()?;
            left = binary(BinOp::And, left, right);
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        let left = self.relational()?;
        let op = match self.lexemes.front().map(|l| &l.token) {
            Some(Token::EqEq) => BinOp::Equal,
            Some(Token::NotEq) => BinOp::NotEqual,
            Some(Token::EqEqEq) => BinOp::StrictEqual,
            Some(Token::NotEqEq) => BinOp::StrictNotEqual,
            _ => return Ok(left),
        };
        self.next()?;
        let right = self.equality()?;
        Ok(binary(op, left, right))
    }

    fn relational(&mut self) -> Result<Expr, ParseError> {
        let left = self.additive()?;
        let op = match self.lexemes.front().map(|l| &l.token) {
            Some(Token::Lt) => BinOp::LessThan,
            Some(Token::Gt) => BinOp::GreaterThan,
            Some(Token::LtEq) => BinOp::LessEqual,
            Some(Token::GtEq) => BinOp::GreaterEqual,
            _ => return Ok(left),
        };
        self.next()?;
        let right = self.relational()?;
        Ok(binary(op, left, right))
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.lexemes.front().map(|l| &l.token) {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Subtract,
                _ => return Ok(left),
            };
            self.next()?;
            let right = self.multiplicative()?;
            left = binary(op, left, right);
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.lexemes.front().map(|l| &l.token) {
                Some(Token::Star) => BinOp::Multiply,
                Some(Token::Slash) => BinOp::Divide,
                Some(Token::Percent) => BinOp::Modulo,
                _ => return Ok(left),
            };
            self.next()?;
            let right = self.unary()?;
            left = binary(op, left, right);
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&Token::Plus)?.is_some() {
            return self.primary();
        }
        let op = if self.eat(&Token::Minus)?.is_some() {
            UnaryOp::Negate
        } else if self.eat(&Token::Bang)?.is_some() {
            UnaryOp::Not
        } else {
            return self.primary();
        };
        let operand = self.unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    /// Parse primary expressions (atoms), then any `()`, `[]` and `.name`
    /// suffixes
    fn primary(&mut self) -> Result<Expr, ParseError> {
        let mut primary = if self.eat(&Token::LParen)?.is_some() {
            let expr = self.filter_chain()?;
            self.expect(&Token::RParen, ")")?;
            expr
        } else if self.eat(&Token::LBracket)?.is_some() {
            self.array_literal()?
        } else if self.eat(&Token::LBrace)?.is_some() {
            self.object_literal()?
        } else {
            let lexeme = self.next()?;
            match lexeme.token {
                Token::Integer(n) => Expr::Literal(Value::Integer(n)),
                Token::Float(n) => Expr::Literal(Value::Float(n)),
                Token::String(s) => Expr::Literal(Value::String(s)),
                Token::Boolean(b) => Expr::Literal(Value::Boolean(b)),
                Token::Null => Expr::Literal(Value::Null),
                Token::Undefined => Expr::Literal(Value::Undefined),
                Token::Identifier(path) => Expr::Path(self.paths.getter(&path, self.source)?),
                Token::Regex { .. } => {
                    return Err(self.error_at(
                        SyntaxErrorKind::RegexUnsupported,
                        &lexeme,
                        "is a regular expression literal, which is not supported",
                    ));
                }
                _ => {
                    return Err(self.error_at(
                        SyntaxErrorKind::NotPrimary,
                        &lexeme,
                        "not a primary expression",
                    ));
                }
            }
        };

        loop {
            if let Some(paren) = self.eat(&Token::LParen)? {
                if self.options.disallow_function_calls {
                    return Err(self.error_at(
                        SyntaxErrorKind::FunctionCallDisallowed,
                        &paren,
                        "is a function call, which is disallowed",
                    ));
                }
                let args = self.call_arguments()?;
                primary = Expr::Call {
                    callee: Box::new(primary),
                    args,
                };
            } else if self.eat(&Token::LBracket)?.is_some() {
                let index = self.assignment()?;
                self.expect(&Token::RBracket, "]")?;
                primary = Expr::Index {
                    object: Box::new(primary),
                    index: Box::new(index),
                };
            } else if self.eat(&Token::Dot)?.is_some() {
                let name = self.expect(&Token::Identifier(String::new()), "identifier")?;
                let field = self.paths.getter(&name.text, self.source)?;
                primary = Expr::Field {
                    object: Box::new(primary),
                    field,
                };
            } else {
                return Ok(primary);
            }
        }
    }

    fn call_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                args.push(self.assignment()?);
                if self.eat(&Token::Comma)?.is_none() {
                    break;
                }
            }
        }
        self.expect(&Token::RParen, ")")?;
        Ok(args)
    }

    /// `[a, b, c]`, a trailing comma is allowed
    fn array_literal(&mut self) -> Result<Expr, ParseError> {
        let mut elements = Vec::new();
        while !self.check(&Token::RBracket) {
            elements.push(self.assignment()?);
            if self.eat(&Token::Comma)?.is_none() {
                break;
            }
        }
        self.expect(&Token::RBracket, "]")?;
        Ok(Expr::Array(elements))
    }

    /// `{key: value, 'quoted key': value}`, a trailing comma is allowed
    fn object_literal(&mut self) -> Result<Expr, ParseError> {
        let mut pairs = Vec::new();
        while !self.check(&Token::RBrace) {
            let key = self.next()?;
            let key = match key.token {
                Token::String(s) => s,
                _ => key.text,
            };
            self.expect(&Token::Colon, ":")?;
            let value = self.assignment()?;
            pairs.push((key, value));
            if self.eat(&Token::Comma)?.is_none() {
                break;
            }
        }
        self.expect(&Token::RBrace, "}")?;
        Ok(Expr::Object(pairs))
    }
}

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

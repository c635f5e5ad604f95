use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::ast::Token;

lazy_static! {
    /// Trailing run that can end an operand, so a `/` after it divides.
    static ref DIVISION_LOOK_BEHIND: Regex = Regex::new(r#"[\])"'A-Za-z0-9_$@]+$"#).unwrap();
}

/// Words after which a `/` starts a regex-like literal.
const REGEX_KEYWORDS: [&str; 3] = ["in", "return", "typeof"];

/// True when a `/` following `preceding` is the division operator rather
/// than the start of a regex-like literal.
pub(crate) fn is_division_context(preceding: &str) -> bool {
    DIVISION_LOOK_BEHIND
        .find(preceding.trim_end())
        .is_some_and(|m| !REGEX_KEYWORDS.contains(&m.as_str()))
}

/// A token together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    /// Raw source text (strings keep their quotes and escapes)
    pub text: String,
    /// Char offset of the first character
    pub index: usize,
    /// Whether the token may appear in JSON-only mode at this position
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexErrorKind {
    #[error("Unterminated quote")]
    UnterminatedString,
    #[error("Invalid unicode escape [\\u{0}]")]
    InvalidUnicodeEscape(String),
    #[error("Invalid exponent")]
    InvalidExponent,
    #[error("Unexpected next character '{0}'")]
    UnexpectedCharacter(char),
    #[error("Unterminated regular expression")]
    UnterminatedRegex,
}

/// A failure to tokenize. Columns are 1-based and the span is inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Lexer Error: {kind} at column {column} in expression [{expression}]")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub column: usize,
    pub end_column: Option<usize>,
    pub expression: String,
}

fn is_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\r' | '\t' | '\n' | '\u{000B}' | '\u{00A0}')
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || matches!(ch, '_' | '$' | '@')
}

fn is_ident_part(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '$' | '@')
}

fn is_exp_operator(ch: char) -> bool {
    ch == '+' || ch == '-' || ch.is_ascii_digit()
}

/// Tokenizes `text` in one call.
pub fn lex(text: &str) -> Result<Vec<Lexeme>, LexError> {
    Lexer::new(text).lex()
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    /// First char of the previous token, `None` at the start of input
    last_char: Option<char>,
    /// Currently open `{` / `[`
    literal_stack: Vec<char>,
    lexemes: Vec<Lexeme>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            last_char: None,
            literal_stack: Vec::new(),
            lexemes: Vec::new(),
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    /// Whether the previous token started with one of `chars`. The start of
    /// input counts as a match.
    fn was(&self, chars: &str) -> bool {
        self.last_char.is_none_or(|c| chars.contains(c))
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.input[start..end].iter().collect()
    }

    fn push(&mut self, token: Token, text: impl Into<String>, index: usize, json: bool) {
        self.lexemes.push(Lexeme {
            token,
            text: text.into(),
            index,
            json,
        });
    }

    fn error(&self, kind: LexErrorKind, start: usize, end: Option<usize>) -> LexError {
        LexError {
            kind,
            column: start + 1,
            end_column: end.map(|e| e + 1),
            expression: self.input.iter().collect(),
        }
    }

    /// Consumes the lexer and returns every token of the input.
    pub fn lex(mut self) -> Result<Vec<Lexeme>, LexError> {
        while let Some(ch) = self.current_char() {
            match ch {
                '"' | '\'' => self.read_string(ch)?,
                c if c.is_ascii_digit() => self.read_number()?,
                '.' if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) => {
                    self.read_number()?
                }
                c if is_ident_start(c) => self.read_identifier(),
                c if is_whitespace(c) => {
                    self.advance();
                    continue;
                }
                '/' if !is_division_context(&self.slice(0, self.position)) => self.read_regex()?,
                c => match Token::punctuation(c) {
                    Some(token) => self.read_punctuation(token, c),
                    None => self.read_operator(c)?,
                },
            }
            self.last_char = Some(ch);
        }
        Ok(self.lexemes)
    }

    fn read_string(&mut self, quote: char) -> Result<(), LexError> {
        let start = self.position;
        self.advance(); // Consume opening quote

        let mut decoded = String::new();
        let mut raw = String::from(quote);
        let mut escape = false;

        while let Some(ch) = self.current_char() {
            raw.push(ch);
            if escape {
                if ch == 'u' {
                    let hex: String = self.input.iter().skip(self.position + 1).take(4).collect();
                    if hex.chars().count() != 4 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                        return Err(self.error(
                            LexErrorKind::InvalidUnicodeEscape(hex),
                            self.position - 1,
                            Some(self.position),
                        ));
                    }
                    let decoded_char = u32::from_str_radix(&hex, 16)
                        .ok()
                        .and_then(char::from_u32)
                        .unwrap_or(char::REPLACEMENT_CHARACTER);
                    decoded.push(decoded_char);
                    raw.push_str(&hex);
                    self.position += 4;
                } else {
                    decoded.push(match ch {
                        'n' => '\n',
                        'f' => '\u{000C}',
                        'r' => '\r',
                        't' => '\t',
                        'v' => '\u{000B}',
                        other => other,
                    });
                }
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == quote {
                self.advance();
                self.push(Token::String(decoded), raw, start, true);
                return Ok(());
            } else {
                decoded.push(ch);
            }
            self.advance();
        }

        Err(self.error(LexErrorKind::UnterminatedString, start, None))
    }

    fn read_number(&mut self) -> Result<(), LexError> {
        let start = self.position;
        let mut number = String::new();
        let mut is_float = false;
        let mut has_exponent = false;

        while let Some(ch) = self.current_char() {
            let ch = ch.to_ascii_lowercase();
            let peek = self.peek_char(1);

            if ch.is_ascii_digit() {
                number.push(ch);
            } else if ch == '.' && !is_float && !has_exponent {
                is_float = true;
                number.push(ch);
            } else if ch == 'e' && !has_exponent && peek.is_some_and(is_exp_operator) {
                has_exponent = true;
                number.push(ch);
            } else if is_exp_operator(ch) && number.ends_with('e') {
                if !peek.is_some_and(|c| c.is_ascii_digit()) {
                    return Err(self.error(
                        LexErrorKind::InvalidExponent,
                        start,
                        Some(self.position),
                    ));
                }
                number.push(ch);
            } else {
                break;
            }
            self.advance();
        }

        let parsed_int = if is_float || has_exponent {
            None
        } else {
            number.parse::<i64>().ok()
        };
        let token = match parsed_int {
            Some(n) => Token::Integer(n),
            None => Token::Float(number.parse::<f64>().unwrap_or(f64::NAN)),
        };
        let text = self.slice(start, self.position);
        self.push(token, text, start, true);
        Ok(())
    }

    fn read_identifier(&mut self) {
        let start = self.position;
        let mut ident = String::new();
        let mut last_dot = None;

        while let Some(ch) = self.current_char() {
            if ch == '.' || is_ident_part(ch) {
                if ch == '.' {
                    last_dot = Some(self.position);
                }
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // `a.b.c(` is the call of method `c` on `a.b`: back out to the last dot
        let mut method = None;
        if let Some(dot) = last_dot {
            let mut peek = self.position;
            while let Some(ch) = self.input.get(peek).copied() {
                if ch == '(' {
                    let split = dot - start;
                    method = Some((dot, ident[split + 1..].to_string()));
                    ident.truncate(split);
                    self.position = peek;
                    break;
                }
                if !is_whitespace(ch) {
                    break;
                }
                peek += 1;
            }
        }

        match Token::constant(&ident) {
            Some(token) => self.push(token, ident, start, true),
            None => {
                // Only a plain key directly inside an object literal is JSON
                let json = self.was("{,")
                    && self.literal_stack.last() == Some(&'{')
                    && !ident.contains('.');
                self.push(Token::Identifier(ident.clone()), ident, start, json);
            }
        }

        if let Some((dot, name)) = method {
            self.push(Token::Dot, ".", dot, false);
            self.push(Token::Identifier(name.clone()), name, dot + 1, false);
        }
    }

    fn read_punctuation(&mut self, token: Token, ch: char) {
        let json = (self.was(":[,") && matches!(ch, '{' | '[')) || matches!(ch, '}' | ']' | ':' | ',');
        self.push(token, ch.to_string(), self.position, json);

        match ch {
            '{' | '[' => self.literal_stack.push(ch),
            '}' | ']' => {
                self.literal_stack.pop();
            }
            _ => {}
        }
        self.advance();
    }

    fn read_operator(&mut self, ch: char) -> Result<(), LexError> {
        let start = self.position;

        for len in (1..=3).rev() {
            if start + len > self.input.len() {
                continue;
            }
            let spelling = self.slice(start, start + len);
            if let Some(token) = Token::operator(&spelling) {
                // A sign inside a literal is part of the value
                let json = matches!(token, Token::Plus | Token::Minus) && self.was("[,:");
                self.push(token, spelling, start, json);
                self.position += len;
                return Ok(());
            }
        }

        Err(self.error(LexErrorKind::UnexpectedCharacter(ch), start, Some(start)))
    }

    fn read_regex(&mut self) -> Result<(), LexError> {
        let start = self.position;
        self.advance(); // Consume opening slash

        let mut pattern = String::new();
        let mut escape = false;
        loop {
            match self.current_char() {
                None => return Err(self.error(LexErrorKind::UnterminatedRegex, start, None)),
                Some('/') if !escape => {
                    self.advance();
                    break;
                }
                Some(ch) => {
                    escape = !escape && ch == '\\';
                    pattern.push(ch);
                    self.advance();
                }
            }
        }

        let mut flags = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                flags.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let text = self.slice(start, self.position);
        self.push(Token::Regex { pattern, flags }, text, start, false);
        Ok(())
    }
}

#[cfg(test)]
fn tokens(text: &str) -> Vec<Token> {
    lex(text).unwrap().into_iter().map(|l| l.token).collect()
}

#[test]
fn test_constants() {
    assert_eq!(
        tokens("true false null undefined"),
        vec![
            Token::Boolean(true),
            Token::Boolean(false),
            Token::Null,
            Token::Undefined
        ]
    );
}

#[test]
fn test_method_call_splits_path() {
    let lexemes = lex("a.b.c (1)").unwrap();
    let texts: Vec<&str> = lexemes.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["a.b", ".", "c", "(", "1", ")"]);
    assert_eq!(lexemes[1].index, 3);
    assert_eq!(lexemes[2].index, 4);
}

#[test]
fn test_division_after_operand() {
    assert_eq!(
        tokens("a / 2"),
        vec![Token::Identifier("a".into()), Token::Slash, Token::Integer(2)]
    );
    assert!(matches!(tokens("x in /ab/")[2], Token::Regex { .. }));
}

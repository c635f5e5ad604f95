#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Integer literal without fraction or exponent
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 007
    /// ```
    Integer(i64),

    /// Floating point literal, or an integer too large for `i64`
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// .5
    /// 1e-3
    /// ```
    Float(f64),

    /// String literal in single or double quotes, escapes already decoded
    ///
    /// # Examples
    /// ```text
    /// "hello"
    /// 'it\'s'
    /// "é"
    /// ```
    String(String),

    /// `true` / `false`
    Boolean(bool),

    /// `null`
    Null,

    /// `undefined`
    Undefined,

    /// Regex-like literal. Recognised so that `/` inside it is not read as
    /// division, but never accepted by the parser.
    ///
    /// # Examples
    /// ```text
    /// /ab+c/gi
    /// ```
    Regex { pattern: String, flags: String },

    // Identifiers
    /// Identifier or dotted property path
    ///
    /// Starts with a letter, `_`, `$` or `@`. A run of dotted segments is kept
    /// as one token unless it ends in a method call.
    ///
    /// # Examples
    /// ```text
    /// user
    /// user.address.city
    /// $index
    /// ```
    Identifier(String),

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Dot,
    Comma,
    Semicolon,
    Colon,
    /// Ternary marker
    Question,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    /// Assignment (`=`)
    Assign,
    /// `==`, strict like `===`
    EqEq,
    /// `===`
    EqEqEq,
    /// `!=`, strict like `!==`
    NotEq,
    /// `!==`
    NotEqEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `&` (lexed, not part of the grammar)
    Ampersand,
    /// Filter pipe (`|`)
    Pipe,
    /// Logical not (`!`)
    Bang,
}

impl Token {
    /// Maps an operator spelling to its token.
    pub fn operator(spelling: &str) -> Option<Token> {
        let token = match spelling {
            "+" => Token::Plus,
            "-" => Token::Minus,
            "*" => Token::Star,
            "/" => Token::Slash,
            "%" => Token::Percent,
            "^" => Token::Caret,
            "=" => Token::Assign,
            "==" => Token::EqEq,
            "===" => Token::EqEqEq,
            "!=" => Token::NotEq,
            "!==" => Token::NotEqEq,
            "<" => Token::Lt,
            ">" => Token::Gt,
            "<=" => Token::LtEq,
            ">=" => Token::GtEq,
            "&&" => Token::AndAnd,
            "||" => Token::OrOr,
            "&" => Token::Ampersand,
            "|" => Token::Pipe,
            "!" => Token::Bang,
            _ => return None,
        };
        Some(token)
    }

    /// Maps a punctuation character to its token.
    pub fn punctuation(ch: char) -> Option<Token> {
        let token = match ch {
            '(' => Token::LParen,
            ')' => Token::RParen,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '.' => Token::Dot,
            ',' => Token::Comma,
            ';' => Token::Semicolon,
            ':' => Token::Colon,
            '?' => Token::Question,
            _ => return None,
        };
        Some(token)
    }

    /// Keyword constants that lex as literal tokens instead of identifiers.
    pub fn constant(ident: &str) -> Option<Token> {
        match ident {
            "true" => Some(Token::Boolean(true)),
            "false" => Some(Token::Boolean(false)),
            "null" => Some(Token::Null),
            "undefined" => Some(Token::Undefined),
            _ => None,
        }
    }
}

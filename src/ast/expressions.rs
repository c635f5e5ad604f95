use crate::{
    ast::{BinOp, UnaryOp},
    path::PathAccess,
    value::Value,
};

/// Abstract Syntax Tree node representing a parsed expression.
///
/// The parser builds this tree once per source string; the evaluator walks it
/// for every evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // Literals
    /// Number, string, boolean, `null` or `undefined` literal
    ///
    /// # Example
    /// ```text
    /// 42
    /// 'hello'
    /// undefined
    /// ```
    Literal(Value),

    // Access
    /// Identifier or dotted path resolved against locals, then scope
    ///
    /// # Examples
    /// ```text
    /// user
    /// user.address.city
    /// ```
    Path(PathAccess),

    /// Field access on the result of another expression
    ///
    /// # Examples
    /// ```text
    /// items[0].name
    /// load().result.value
    /// ```
    Field {
        object: Box<Expr>,
        field: PathAccess,
    },

    /// Computed index access
    ///
    /// # Examples
    /// ```text
    /// items[0]
    /// user['first-name']
    /// table[row][col]
    /// ```
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },

    /// Function or method call
    ///
    /// When the callee is a field or index access, the object it was read
    /// from becomes the receiver.
    ///
    /// # Examples
    /// ```text
    /// format(name)
    /// user.greet('hi', 2)
    /// ```
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },

    // Operations
    /// Prefix operation
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    /// Binary operation (arithmetic, comparison, logical)
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Conditional (`cond ? a : b`)
    Ternary {
        condition: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },

    // Object and Array Literals
    /// Array literal
    ///
    /// # Example
    /// ```text
    /// [1, user.name, 'x']
    /// ```
    Array(Vec<Expr>),

    /// Object literal, keys in source order
    ///
    /// # Example
    /// ```text
    /// {name: user.name, 'is-admin': false}
    /// ```
    Object(Vec<(String, Expr)>),

    /// Assignment to a path, field or index
    ///
    /// # Example
    /// ```text
    /// user.name = 'Bob'
    /// ```
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },

    /// Filter application (`input | name:arg1:arg2`)
    Filter {
        input: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },

    /// `;`-separated statements, the last value wins
    Statements(Vec<Expr>),
}

impl Expr {
    /// True when the expression always yields the same value.
    pub fn is_constant(&self) -> bool {
        match self {
            Expr::Literal(_) => true,
            Expr::Unary { operand, .. } => operand.is_constant(),
            Expr::Binary { left, right, .. } => left.is_constant() && right.is_constant(),
            Expr::Ternary {
                condition,
                consequent,
                alternate,
            } => condition.is_constant() && consequent.is_constant() && alternate.is_constant(),
            Expr::Array(elements) => elements.iter().all(Expr::is_constant),
            Expr::Object(pairs) => pairs.iter().all(|(_, value)| value.is_constant()),
            Expr::Statements(statements) => statements.iter().all(Expr::is_constant),
            Expr::Path(_)
            | Expr::Field { .. }
            | Expr::Index { .. }
            | Expr::Call { .. }
            | Expr::Assign { .. }
            | Expr::Filter { .. } => false,
        }
    }

    /// True when the expression is syntactically a literal.
    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Literal(_) | Expr::Array(_) | Expr::Object(_))
    }

    /// True when the expression can appear on the left of `=`.
    pub fn is_assignable(&self) -> bool {
        matches!(self, Expr::Path(_) | Expr::Field { .. } | Expr::Index { .. })
    }
}

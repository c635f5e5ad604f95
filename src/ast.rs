//! # Binding Expressions - Abstract Syntax Tree
//!
//! This module defines the tokens and the Abstract Syntax Tree for binding
//! expressions, the small expression language found inside template binding
//! attributes.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Expression nodes (literals, access, calls, operations)
//! - **[operators]** - Binary and prefix operators
//!
//! ## Quick Start
//!
//! ```text
//! user.name | uppercase
//! items.length > 0 ? items[0].title : 'none'
//! selected = item; onSelect(item)
//! ```
//!
//! ## Precedence
//!
//! From loosest to tightest binding:
//!
//! | Level | Operators |
//! |---|---|
//! | statements | `;` |
//! | filter chain | `\|` |
//! | assignment | `=` |
//! | ternary | `? :` |
//! | logical or | `\|\|` |
//! | logical and | `&&` |
//! | equality | `== != === !==` |
//! | relational | `< > <= >=` |
//! | additive | `+ -` |
//! | multiplicative | `* / %` |
//! | unary | `+ - !` |
//! | primary | literals, paths, `( )`, `[ ]`, `{ }`, then `( )` `[ ]` `.` postfix |
//!
//! ## Forgiving Arithmetic
//!
//! A missing operand of `+` is ignored (`undefined + 5` is `5`) and a missing
//! operand of `-` counts as zero (`undefined - 5` is `-5`). Equality never
//! coerces types.
pub mod expressions;
pub mod operators;
pub mod tokens;

pub use expressions::Expr;
pub use operators::{BinOp, UnaryOp};
pub use tokens::Token;

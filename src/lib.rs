//! A sandboxed expression compiler for template binding attributes.
//!
//! Source text such as `user.name | uppercase` or `items.length > 0 && open()`
//! is lexed, parsed into an [`Expr`] tree and wrapped in a [`CompiledExpr`]
//! that can be evaluated any number of times against a scope, optional
//! locals and optional [`RuntimeHooks`]. [`parse_object_literal`] splits a
//! whole binding attribute (`text: name, visible: shown`) into the pieces
//! that get compiled.
pub mod ast;
pub mod cli;
pub mod compiler;
pub mod convert;
pub mod error;
pub mod evaluator;
pub mod filters;
pub mod hooks;
pub mod lexer;
pub mod object_literal;
pub mod parser;
pub mod path;
pub mod sandbox;
pub mod value;

pub use ast::{BinOp, Expr, Token, UnaryOp};
pub use compiler::{CompiledExpr, Compiler, CompilerOptions, ExpressionCache, compile_expression};
pub use convert::{from_json, to_json};
pub use error::ErrorKind;
pub use evaluator::{EvalContext, EvalError, Evaluator};
pub use filters::{FilterFn, FilterRegistry};
pub use hooks::{DirectAccess, RuntimeHooks};
pub use lexer::{LexError, LexErrorKind, Lexeme, Lexer};
pub use object_literal::{ObjectLiteralEntry, parse_object_literal};
pub use parser::{ParseError, Parser, ParserOptions, SyntaxError, SyntaxErrorKind};
pub use path::{PathAccess, PathCompiler};
pub use sandbox::SandboxError;
pub use value::{Array, Function, Object, Value};

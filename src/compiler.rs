//! Compiling source text into reusable expressions.
//!
//! A [`Compiler`] owns the getter cache for property paths and the options
//! (filters, call policy) every expression it produces is bound to. Results
//! can be memoised in an [`ExpressionCache`] supplied by the caller.
//!
//! # Examples
//!
//! ```
//! use binding_expr::compiler::{Compiler, CompilerOptions, ExpressionCache};
//! use binding_expr::value::Value;
//!
//! let compiler = Compiler::new(CompilerOptions::default());
//! let cache = ExpressionCache::new();
//!
//! let expr = compiler.compile_cached("user.name | uppercase", &cache).unwrap();
//! let scope = Value::object([("user", Value::object([("name", Value::from("ada"))]))]);
//! assert_eq!(expr.eval(&scope, None).unwrap(), Value::from("ADA"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use log::debug;

use crate::{
    ast::Expr,
    evaluator::{EvalContext, EvalError, Evaluator},
    filters::FilterRegistry,
    hooks::RuntimeHooks,
    lexer::lex,
    parser::{ParseError, Parser, ParserOptions},
    path::PathCompiler,
    value::{Value, read_lock, write_lock},
};

/// Settings shared by every expression a compiler produces.
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Filters available to `|`
    pub filters: Arc<FilterRegistry>,
    /// Reject call sites at compile time
    pub disallow_function_calls: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions {
            filters: Arc::new(FilterRegistry::with_builtins()),
            disallow_function_calls: false,
        }
    }
}

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a filter.
    pub fn with_filter<F>(mut self, name: &str, filter: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.filters).register(name, filter);
        self
    }

    /// Replaces the whole filter registry.
    pub fn with_filters(mut self, filters: FilterRegistry) -> Self {
        self.filters = Arc::new(filters);
        self
    }

    pub fn disallow_function_calls(mut self, disallow: bool) -> Self {
        self.disallow_function_calls = disallow;
        self
    }

    fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            disallow_function_calls: self.disallow_function_calls,
        }
    }
}

/// A parsed expression ready for repeated evaluation.
///
/// Cloning is cheap and clones share the tree.
#[derive(Clone)]
pub struct CompiledExpr {
    source: Arc<str>,
    expr: Arc<Expr>,
    filters: Arc<FilterRegistry>,
    constant: bool,
    literal: bool,
}

impl CompiledExpr {
    fn new(source: &str, expr: Expr, filters: Arc<FilterRegistry>) -> Self {
        CompiledExpr {
            source: Arc::from(source),
            constant: expr.is_constant(),
            literal: expr.is_literal(),
            expr: Arc::new(expr),
            filters,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Always evaluates to the same value
    pub fn is_constant(&self) -> bool {
        self.constant
    }

    /// The root is a literal (number, string, constant, array or object)
    pub fn is_literal(&self) -> bool {
        self.literal
    }

    /// Supports [`assign`](Self::assign)
    pub fn is_assignable(&self) -> bool {
        self.expr.is_assignable()
    }

    /// True when both handles share one compiled tree.
    pub fn ptr_eq(&self, other: &CompiledExpr) -> bool {
        Arc::ptr_eq(&self.expr, &other.expr)
    }

    fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(&self.filters, &self.source)
    }

    /// Evaluates against `scope`, with `locals` shadowing it.
    pub fn eval(&self, scope: &Value, locals: Option<&Value>) -> Result<Value, EvalError> {
        let ctx = EvalContext::new(scope).with_locals(locals);
        self.evaluator().eval(&self.expr, ctx)
    }

    /// Evaluates with every member read and write routed through `hooks`.
    pub fn eval_with_hooks(
        &self,
        scope: &Value,
        locals: Option<&Value>,
        hooks: &dyn RuntimeHooks,
    ) -> Result<Value, EvalError> {
        let ctx = EvalContext::new(scope)
            .with_locals(locals)
            .with_hooks(Some(hooks));
        self.evaluator().eval(&self.expr, ctx)
    }

    /// Stores `value` where the expression points and returns it.
    pub fn assign(
        &self,
        scope: &Value,
        value: Value,
        locals: Option<&Value>,
    ) -> Result<Value, EvalError> {
        let ctx = EvalContext::new(scope).with_locals(locals);
        self.evaluator().assign(&self.expr, value, ctx)
    }

    pub fn assign_with_hooks(
        &self,
        scope: &Value,
        value: Value,
        locals: Option<&Value>,
        hooks: &dyn RuntimeHooks,
    ) -> Result<Value, EvalError> {
        let ctx = EvalContext::new(scope)
            .with_locals(locals)
            .with_hooks(Some(hooks));
        self.evaluator().assign(&self.expr, value, ctx)
    }
}

impl fmt::Debug for CompiledExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpr")
            .field("source", &self.source)
            .field("constant", &self.constant)
            .field("literal", &self.literal)
            .finish()
    }
}

/// Compiled expressions keyed by source text.
///
/// Owned by the caller and passed to each compile call. Entries depend on
/// the options of the compiler that produced them, so a cache should only
/// be shared between compilers with the same options.
#[derive(Default)]
pub struct ExpressionCache {
    entries: RwLock<HashMap<String, CompiledExpr>>,
}

impl ExpressionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source: &str) -> Option<CompiledExpr> {
        read_lock(&self.entries).get(source).cloned()
    }

    /// Stores `compiled` unless the source is already present; returns the
    /// stored entry.
    pub fn insert(&self, compiled: CompiledExpr) -> CompiledExpr {
        write_lock(&self.entries)
            .entry(compiled.source().to_string())
            .or_insert(compiled)
            .clone()
    }

    pub fn len(&self) -> usize {
        read_lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        read_lock(&self.entries).is_empty()
    }

    pub fn clear(&self) {
        write_lock(&self.entries).clear();
    }
}

/// Turns source text into [`CompiledExpr`]s.
#[derive(Default)]
pub struct Compiler {
    options: CompilerOptions,
    paths: PathCompiler,
}

impl Compiler {
    pub fn new(options: CompilerOptions) -> Self {
        Compiler {
            options,
            paths: PathCompiler::new(),
        }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// The path getter cache shared by this compiler's expressions.
    pub fn paths(&self) -> &PathCompiler {
        &self.paths
    }

    /// Compiles `source` without caching the result.
    pub fn compile(&self, source: &str) -> Result<CompiledExpr, ParseError> {
        self.compile_with(source, None)
    }

    /// Compiles `source`, reusing and filling `cache`.
    pub fn compile_cached(
        &self,
        source: &str,
        cache: &ExpressionCache,
    ) -> Result<CompiledExpr, ParseError> {
        self.compile_with(source, Some(cache))
    }

    /// Compiles a value holding source text.
    pub fn compile_value(
        &self,
        source: &Value,
        cache: Option<&ExpressionCache>,
    ) -> Result<CompiledExpr, ParseError> {
        match source {
            Value::String(text) => self.compile_with(text, cache),
            other => Err(ParseError::NotText(other.type_name())),
        }
    }

    /// Compiles a single JSON-compatible literal; anything else is rejected.
    pub fn compile_json(&self, source: &str) -> Result<CompiledExpr, ParseError> {
        let lexemes = lex(source)?;
        let expr = Parser::new(lexemes, source, &self.paths, self.options.parser_options())
            .parse_json()?;
        Ok(CompiledExpr::new(source, expr, self.options.filters.clone()))
    }

    fn compile_with(
        &self,
        source: &str,
        cache: Option<&ExpressionCache>,
    ) -> Result<CompiledExpr, ParseError> {
        if let Some(cache) = cache {
            if let Some(compiled) = cache.get(source) {
                debug!("expression cache hit for `{}`", source);
                return Ok(compiled);
            }
            debug!("expression cache miss for `{}`", source);
        }

        let lexemes = lex(source)?;
        let expr = Parser::new(lexemes, source, &self.paths, self.options.parser_options()).parse()?;
        let compiled = CompiledExpr::new(source, expr, self.options.filters.clone());
        debug!(
            "compiled `{}` (constant: {}, literal: {})",
            source, compiled.constant, compiled.literal
        );

        Ok(match cache {
            Some(cache) => cache.insert(compiled),
            None => compiled,
        })
    }
}

/// One-shot compile with a fresh getter cache.
///
/// Every call builds a new [`Compiler`], so path getters are compiled again
/// each time and dropped afterwards (only `cache`, when given, outlives the
/// call). Code that compiles repeatedly should keep one `Compiler` around and
/// use [`Compiler::compile_cached`].
pub fn compile_expression(
    source: &str,
    options: &CompilerOptions,
    cache: Option<&ExpressionCache>,
) -> Result<CompiledExpr, ParseError> {
    Compiler::new(options.clone()).compile_with(source, cache)
}

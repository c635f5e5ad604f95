use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};
use std::cmp::Ordering;

use log::trace;
use thiserror::Error;

use crate::{
    ast::{BinOp, Expr, UnaryOp},
    filters::FilterRegistry,
    hooks::{self, RuntimeHooks},
    path::PathCompiler,
    sandbox::{SandboxError, ensure_safe_member_name, ensure_safe_object},
    value::{Object, Value},
};

/// Evaluation context: the scope, optional locals shadowing it, and optional
/// hooks intercepting member access.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub scope: &'a Value,
    pub locals: Option<&'a Value>,
    pub hooks: Option<&'a dyn RuntimeHooks>,
}

impl<'a> EvalContext<'a> {
    pub fn new(scope: &'a Value) -> Self {
        EvalContext {
            scope,
            locals: None,
            hooks: None,
        }
    }

    /// Create a new context whose locals shadow the scope
    pub fn with_locals(self, locals: Option<&'a Value>) -> Self {
        EvalContext { locals, ..self }
    }

    /// Create a new context routing member access through `hooks`
    pub fn with_hooks(self, hooks: Option<&'a dyn RuntimeHooks>) -> Self {
        EvalContext { hooks, ..self }
    }
}

/// Errors that can occur during evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// A value or member name rejected by the sandbox
    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    /// Filter name not present in the registry
    #[error("Unknown filter: {0}")]
    UnknownFilter(String),

    /// Type mismatch or invalid operation for the given type
    #[error("Type error: {0}")]
    TypeError(String),

    /// Assignment through an expression that has no assignable target
    #[error("Expression [{0}] is not assignable")]
    NotAssignable(String),

    /// Failure raised by a native function or filter
    #[error("{0}")]
    Host(String),
}

/// Walks an expression tree.
///
/// An evaluator is cheap to build and borrows everything it needs: the
/// filters that `|` dispatches to and the source text quoted in errors.
pub struct Evaluator<'a> {
    filters: &'a FilterRegistry,
    source: &'a str,
}

impl<'a> Evaluator<'a> {
    pub fn new(filters: &'a FilterRegistry, source: &'a str) -> Self {
        Evaluator { filters, source }
    }

    /// Evaluates an expression.
    ///
    /// # Examples
    ///
    /// ```
    /// use binding_expr::ast::{BinOp, Expr};
    /// use binding_expr::evaluator::{EvalContext, Evaluator};
    /// use binding_expr::filters::FilterRegistry;
    /// use binding_expr::value::Value;
    ///
    /// let filters = FilterRegistry::new();
    /// let expr = Expr::Binary {
    ///     op: BinOp::Add,
    ///     left: Box::new(Expr::Literal(Value::Integer(1))),
    ///     right: Box::new(Expr::Literal(Value::Float(0.5))),
    /// };
    /// let scope = Value::Undefined;
    /// let result = Evaluator::new(&filters, "1 + 0.5")
    ///     .eval(&expr, EvalContext::new(&scope))
    ///     .unwrap();
    /// assert_eq!(result, Value::Float(1.5));
    /// ```
    pub fn eval(&self, expr: &Expr, ctx: EvalContext<'_>) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Path(path) => path.get(ctx.scope, ctx.locals, ctx.hooks),
            Expr::Field { object, field } => {
                let object = self.eval(object, ctx)?;
                field.get(&object, None, ctx.hooks)
            }
            Expr::Index { object, index } => {
                let object = self.eval(object, ctx)?;
                let key = self.eval(index, ctx)?;
                self.read_index(&object, &key, ctx)
            }
            Expr::Call { callee, args } => self.eval_call(callee, args, ctx),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand, ctx)?;
                Ok(match op {
                    UnaryOp::Not => Value::Boolean(!value.is_truthy()),
                    UnaryOp::Negate => subtract(&Value::Integer(0), &value),
                })
            }
            Expr::Binary { op, left, right } => match op {
                BinOp::And => {
                    let left = self.eval(left, ctx)?;
                    if left.is_truthy() {
                        self.eval(right, ctx)
                    } else {
                        Ok(left)
                    }
                }
                BinOp::Or => {
                    let left = self.eval(left, ctx)?;
                    if left.is_truthy() {
                        Ok(left)
                    } else {
                        self.eval(right, ctx)
                    }
                }
                _ => {
                    let left = self.eval(left, ctx)?;
                    let right = self.eval(right, ctx)?;
                    Ok(apply_binop(*op, &left, &right))
                }
            },
            Expr::Ternary {
                condition,
                consequent,
                alternate,
            } => {
                if self.eval(condition, ctx)?.is_truthy() {
                    self.eval(consequent, ctx)
                } else {
                    self.eval(alternate, ctx)
                }
            }
            Expr::Array(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.eval(element, ctx)?);
                }
                Ok(Value::from(items))
            }
            Expr::Object(pairs) => {
                let object = Object::new();
                for (key, value) in pairs {
                    object.insert(key.clone(), self.eval(value, ctx)?);
                }
                Ok(Value::Object(object))
            }
            Expr::Assign { target, value } => {
                let value = self.eval(value, ctx)?;
                self.assign(target, value, ctx)
            }
            Expr::Filter { input, name, args } => {
                let filter = self
                    .filters
                    .get(name)
                    .ok_or_else(|| EvalError::UnknownFilter(name.clone()))?;
                let input = self.eval(input, ctx)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, ctx)?);
                }
                trace!("applying filter `{}` with {} argument(s)", name, values.len());
                filter(&input, &values)
            }
            Expr::Statements(statements) => {
                let mut last = Value::Undefined;
                for statement in statements {
                    last = self.eval(statement, ctx)?;
                }
                Ok(last)
            }
        }
    }

    /// Stores `value` through an assignable expression and returns it.
    pub fn assign(&self, target: &Expr, value: Value, ctx: EvalContext<'_>) -> Result<Value, EvalError> {
        match target {
            Expr::Path(path) => path.assign(ctx.scope, ctx.locals, value, ctx.hooks),
            Expr::Field { object, field } => {
                let object = self.eval(object, ctx)?;
                PathCompiler::set(&object, field.keys(), value, ctx.hooks)
            }
            Expr::Index { object, index } => {
                let object = self.eval(object, ctx)?;
                let key = self.eval(index, ctx)?;
                ensure_safe_member_name(&key.to_string(), self.source)?;
                let object = ensure_safe_object(object, self.source)?;
                hooks::write_index(ctx.hooks, &object, &key, value.clone())?;
                Ok(value)
            }
            _ => Err(EvalError::NotAssignable(self.source.to_string())),
        }
    }

    fn read_index(&self, object: &Value, key: &Value, ctx: EvalContext<'_>) -> Result<Value, EvalError> {
        ensure_safe_member_name(&key.to_string(), self.source)?;
        if !object.is_truthy() {
            return Ok(Value::Undefined);
        }
        let value = hooks::read_index(ctx.hooks, object, key)?;
        Ok(ensure_safe_object(value, self.source)?)
    }

    fn eval_call(&self, callee: &Expr, args: &[Expr], ctx: EvalContext<'_>) -> Result<Value, EvalError> {
        // Methods are called with the object they were read from
        let (receiver, function) = match callee {
            Expr::Field { object, field } => {
                let object = self.eval(object, ctx)?;
                let function = field.get(&object, None, ctx.hooks)?;
                (object, function)
            }
            Expr::Index { object, index } => {
                let object = self.eval(object, ctx)?;
                let key = self.eval(index, ctx)?;
                let function = self.read_index(&object, &key, ctx)?;
                (object, function)
            }
            _ => (ctx.scope.clone(), self.eval(callee, ctx)?),
        };

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg, ctx)?);
        }

        let receiver = ensure_safe_object(receiver, self.source)?;
        let function = ensure_safe_object(function, self.source)?;

        let result = match &function {
            Value::Function(func) => func.call(&receiver, &values)?,
            other if !other.is_truthy() => Value::Undefined,
            other => {
                return Err(EvalError::TypeError(format!(
                    "{} is not a function in expression [{}]",
                    other.type_name(),
                    self.source
                )));
            }
        };
        Ok(ensure_safe_object(result, self.source)?)
    }
}

fn apply_binop(op: BinOp, left: &Value, right: &Value) -> Value {
    match op {
        BinOp::Add => add(left, right),
        BinOp::Subtract => subtract(left, right),
        BinOp::Multiply | BinOp::Divide | BinOp::Modulo => arithmetic(op, left, right),
        BinOp::Equal | BinOp::StrictEqual => Value::Boolean(left.strict_equals(right)),
        BinOp::NotEqual | BinOp::StrictNotEqual => Value::Boolean(!left.strict_equals(right)),
        BinOp::LessThan => compare(left, right, Ordering::is_lt),
        BinOp::GreaterThan => compare(left, right, Ordering::is_gt),
        BinOp::LessEqual => compare(left, right, Ordering::is_le),
        BinOp::GreaterEqual => compare(left, right, Ordering::is_ge),
        BinOp::And | BinOp::Or => unreachable!("logical operators short-circuit in eval"),
    }
}

/// `+`: a missing operand is skipped, a string operand makes it concatenation.
fn add(left: &Value, right: &Value) -> Value {
    match (left.is_undefined(), right.is_undefined()) {
        (true, true) => Value::Undefined,
        (true, false) => right.clone(),
        (false, true) => left.clone(),
        (false, false) => {
            let concatenates = |v: &Value| {
                matches!(
                    v,
                    Value::String(_) | Value::Array(_) | Value::Object(_) | Value::Function(_)
                )
            };
            if concatenates(left) || concatenates(right) {
                Value::String(format!("{}{}", left, right))
            } else {
                arithmetic(BinOp::Add, left, right)
            }
        }
    }
}

/// `-`: missing operands count as zero.
fn subtract(left: &Value, right: &Value) -> Value {
    let zero = Value::Integer(0);
    let left = if left.is_undefined() { &zero } else { left };
    let right = if right.is_undefined() { &zero } else { right };
    arithmetic(BinOp::Subtract, left, right)
}

fn compare(left: &Value, right: &Value, test: fn(Ordering) -> bool) -> Value {
    let ordering = match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => match (left.to_numeric(), right.to_numeric()) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_float().partial_cmp(&b.as_float()),
        },
    };
    // NaN compares false either way
    Value::Boolean(ordering.is_some_and(test))
}

fn float_op(op: BinOp, a: f64, b: f64) -> f64 {
    match op {
        BinOp::Add => a + b,
        BinOp::Subtract => a - b,
        BinOp::Multiply => a * b,
        BinOp::Divide => a / b,
        _ => a % b,
    }
}

fn integer_op(op: BinOp, a: i64, b: i64) -> Value {
    let result = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Subtract => a.checked_sub(b),
        BinOp::Multiply => a.checked_mul(b),
        // Check if division is exact; if not, return Float
        BinOp::Divide => match a.checked_rem(b) {
            Some(0) => a.checked_div(b),
            _ => None,
        },
        _ => a.checked_rem(b),
    };
    // Overflow and division by zero fall back to floats
    result
        .map(Value::Integer)
        .unwrap_or_else(|| Value::Float(float_op(op, a as f64, b as f64)))
}

fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Integer(n) => Decimal::from_i64(*n),
        Value::Float(n) => Decimal::from_f64(*n),
        _ => None,
    }
}

/// Mixed integer/float operands go through decimal arithmetic; whole results
/// come back as integers.
fn mixed_op(op: BinOp, left: &Value, right: &Value) -> Value {
    if let Some(ld) = to_decimal(left)
        && let Some(rd) = to_decimal(right)
    {
        let result = match op {
            BinOp::Add => ld.checked_add(rd),
            BinOp::Subtract => ld.checked_sub(rd),
            BinOp::Multiply => ld.checked_mul(rd),
            BinOp::Divide => ld.checked_div(rd),
            _ => ld.checked_rem(rd),
        };
        if let Some(result) = result {
            if result.is_integer()
                && let Some(r) = result.to_i64()
            {
                return Value::Integer(r);
            } else if let Some(r) = result.to_f64() {
                return Value::Float(r);
            }
        }
    }
    Value::Float(float_op(op, left.as_float(), right.as_float()))
}

fn arithmetic(op: BinOp, left: &Value, right: &Value) -> Value {
    let (left, right) = (left.to_numeric(), right.to_numeric());
    match (&left, &right) {
        (Value::Integer(a), Value::Integer(b)) => integer_op(op, *a, *b),
        (Value::Float(a), Value::Float(b)) => Value::Float(float_op(op, *a, *b)),
        _ => mixed_op(op, &left, &right),
    }
}

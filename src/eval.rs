//! Tree-walking evaluator for [`Expr`].
//!
//! This is the "compile to a callable" boundary: a [`Lambda`] pairs an
//! expression body with the parameters it was parsed against, and
//! [`Lambda::invoke`] evaluates it over concrete argument values.
//!
//! Integer and decimal arithmetic is checked; floating arithmetic follows
//! IEEE semantics. Nulls propagate through arithmetic, make ordering
//! comparisons false, and compare equal only to other nulls.

use std::cmp::Ordering;
use std::fmt::Display;
use std::sync::Arc;

use miette::Diagnostic;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::trace;

use crate::diagnostics::BoxError;
use crate::expr::{BinaryOp, CollectionOp, Expr, Parameter, UnaryOp};
use crate::types::{NumericKind, ValueType};
use crate::value::{Number, Value, ValueError};

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("`{op}` overflowed {kind}")]
    Overflow { op: BinaryOp, kind: NumericKind },
    #[error("cannot {action} a null value")]
    NullReference { action: &'static str },
    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },
    #[error("parameter ${slot} is not bound")]
    UnboundParameter { slot: usize },
    #[error("expected {expected} argument(s), {actual} given")]
    Arity { expected: usize, actual: usize },
    #[error("function `{name}` failed")]
    Function {
        name: String,
        #[source]
        source: BoxError,
    },
    #[error(transparent)]
    Conversion(#[from] ValueError),
}

impl Diagnostic for EvalError {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        let code = match self {
            EvalError::DivisionByZero => "strexpr::eval::division_by_zero",
            EvalError::Overflow { .. } => "strexpr::eval::overflow",
            EvalError::NullReference { .. } => "strexpr::eval::null_reference",
            EvalError::TypeMismatch { .. } => "strexpr::eval::type_mismatch",
            EvalError::UnboundParameter { .. } => "strexpr::eval::unbound_parameter",
            EvalError::Arity { .. } => "strexpr::eval::arity",
            EvalError::Function { .. } => "strexpr::eval::function",
            EvalError::Conversion(_) => "strexpr::eval::conversion",
        };
        Some(Box::new(code))
    }
}

fn mismatch(expected: impl ToString, found: &Value) -> EvalError {
    EvalError::TypeMismatch {
        expected: expected.to_string(),
        found: found.to_string(),
    }
}

// =============================================================================
// LAMBDAS
// =============================================================================

/// A parsed expression together with the parameters it reads.
#[derive(Debug, Clone)]
pub struct Lambda {
    parameters: Vec<Parameter>,
    body: Expr,
}

impl Lambda {
    pub fn new(parameters: Vec<Parameter>, body: Expr) -> Self {
        Self { parameters, body }
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn body(&self) -> &Expr {
        &self.body
    }

    pub fn returns(&self) -> ValueType {
        self.body.ty()
    }

    /// Evaluates the body with `args` bound to the parameters in order.
    pub fn invoke(&self, args: &[Value]) -> Result<Value, EvalError> {
        if args.len() != self.parameters.len() {
            return Err(EvalError::Arity {
                expected: self.parameters.len(),
                actual: args.len(),
            });
        }
        evaluate(&self.body, &mut args.to_vec())
    }
}

// =============================================================================
// EVALUATION
// =============================================================================

/// Evaluates `expr` against the environment `env`, indexed by parameter slot.
///
/// Collection predicates bind their element to a slot past the caller's
/// parameters and restore `env` before returning.
pub fn evaluate(expr: &Expr, env: &mut Vec<Value>) -> Result<Value, EvalError> {
    match expr {
        Expr::Constant { value, .. } => Ok(value.clone()),
        Expr::Parameter { slot, .. } => env
            .get(*slot)
            .cloned()
            .ok_or(EvalError::UnboundParameter { slot: *slot }),
        Expr::Field {
            target, index, name, ..
        } => match evaluate(target, env)? {
            Value::Record(record) => record
                .field(*index)
                .cloned()
                .ok_or_else(|| {
                    mismatch(
                        format!("a record with field `{name}`"),
                        &Value::Record(record.clone()),
                    )
                }),
            Value::Null => Err(EvalError::NullReference {
                action: "read a field of",
            }),
            other => Err(mismatch("a record", &other)),
        },
        Expr::Convert { operand, ty } => convert(evaluate(operand, env)?, ty),
        Expr::Unary { op, operand, .. } => unary(*op, evaluate(operand, env)?),
        Expr::Binary {
            op, left, right, ..
        } => binary(*op, left, right, env),
        Expr::Call { function, args } => {
            let values = args
                .iter()
                .map(|arg| evaluate(arg, env))
                .collect::<Result<Vec<_>, _>>()?;
            trace!(function = function.name(), "invoking host function");
            function
                .invoke(&values)
                .map_err(|source| EvalError::Function {
                    name: function.name().to_string(),
                    source,
                })
        }
        Expr::List { items } => items
            .iter()
            .map(|item| evaluate(item, env))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Expr::Collection {
            op,
            source,
            parameter,
            body,
        } => collection(*op, source, *parameter, body.as_deref(), env),
    }
}

fn convert(value: Value, ty: &ValueType) -> Result<Value, EvalError> {
    if value.is_null() {
        return if ty.accepts_null() {
            Ok(Value::Null)
        } else {
            Err(EvalError::NullReference {
                action: "convert",
            })
        };
    }
    match (value, ty.underlying()) {
        (Value::Number(number), ValueType::Number(kind)) => {
            Ok(Value::Number(number.convert(*kind)?))
        }
        (Value::Number(number), ValueType::Enum(descriptor)) => {
            let value = number
                .as_i128()
                .and_then(|v| i64::try_from(v).ok())
                .ok_or_else(|| mismatch(descriptor.name(), &Value::Number(number)))?;
            Ok(Value::Enum {
                ty: Arc::clone(descriptor),
                value,
            })
        }
        (Value::Enum { value, .. }, ValueType::Number(kind)) => {
            Ok(Value::Number(Number::Long(value).convert(*kind)?))
        }
        (Value::Enum { value, .. }, ValueType::Enum(descriptor)) => Ok(Value::Enum {
            ty: Arc::clone(descriptor),
            value,
        }),
        (Value::DateTime(moment), ValueType::DateTimeOffset) => {
            Ok(Value::DateTimeOffset(moment.and_utc().fixed_offset()))
        }
        (value, target) => {
            if value.value_type().underlying() == target
                || matches!((&value, target), (Value::List(_), ValueType::Collection(_)))
            {
                Ok(value)
            } else {
                Err(mismatch(target, &value))
            }
        }
    }
}

fn unary(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    match (op, value) {
        (_, Value::Null) => Ok(Value::Null),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Negate, Value::Number(n)) => {
            let zero = Number::Int(0).convert(n.kind())?;
            arithmetic(BinaryOp::Subtract, zero, n).map(Value::Number)
        }
        (UnaryOp::Not, other) => Err(mismatch("bool", &other)),
        (UnaryOp::Negate, other) => Err(mismatch("a number", &other)),
    }
}

fn binary(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    env: &mut Vec<Value>,
) -> Result<Value, EvalError> {
    if matches!(op, BinaryOp::And | BinaryOp::Or) {
        let lhs = evaluate(left, env)?;
        let lhs = lhs.as_bool().ok_or_else(|| mismatch("bool", &lhs))?;
        if (op == BinaryOp::And) != lhs {
            return Ok(Value::Bool(lhs));
        }
        let rhs = evaluate(right, env)?;
        return rhs
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| mismatch("bool", &rhs));
    }

    let lhs = evaluate(left, env)?;
    let rhs = evaluate(right, env)?;
    if op.is_equality() {
        let equal = values_equal(&lhs, &rhs);
        return Ok(Value::Bool(equal == (op == BinaryOp::Equal)));
    }
    if op.is_ordering() {
        let ordering = match (&lhs, &rhs) {
            (Value::Null, _) | (_, Value::Null) => return Ok(Value::Bool(false)),
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.partial_cmp(b),
            (Value::DateTimeOffset(a), Value::DateTimeOffset(b)) => a.partial_cmp(b),
            _ => return Err(mismatch("numbers or dates", &lhs)),
        };
        let result = match (op, ordering) {
            (_, None) => false,
            (BinaryOp::Greater, Some(o)) => o == Ordering::Greater,
            (BinaryOp::GreaterOrEqual, Some(o)) => o != Ordering::Less,
            (BinaryOp::Less, Some(o)) => o == Ordering::Less,
            (_, Some(o)) => o != Ordering::Greater,
        };
        return Ok(Value::Bool(result));
    }
    match (lhs, rhs) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Number(a), Value::Number(b)) => arithmetic(op, a, b).map(Value::Number),
        (other, _) => Err(mismatch("a number", &other)),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b) == Some(Ordering::Equal),
        (Value::Enum { value: a, .. }, Value::Enum { value: b, .. }) => a == b,
        (a, b) => a == b,
    }
}

fn arithmetic(op: BinaryOp, a: Number, b: Number) -> Result<Number, EvalError> {
    let kind = a.kind();
    if b.kind() != kind {
        return Err(mismatch(kind, &Value::Number(b)));
    }
    let overflow = || EvalError::Overflow { op, kind };
    match (a, b) {
        (Number::Decimal(x), Number::Decimal(y)) => {
            if matches!(op, BinaryOp::Divide | BinaryOp::Modulo) && y.is_zero() {
                return Err(EvalError::DivisionByZero);
            }
            let result: Option<Decimal> = match op {
                BinaryOp::Add => x.checked_add(y),
                BinaryOp::Subtract => x.checked_sub(y),
                BinaryOp::Multiply => x.checked_mul(y),
                BinaryOp::Divide => x.checked_div(y),
                BinaryOp::Modulo => x.checked_rem(y),
                _ => return Err(mismatch("an arithmetic operator", &Value::Number(a))),
            };
            result.map(Number::Decimal).ok_or_else(overflow)
        }
        (Number::Float(_) | Number::Double(_), _) => {
            let (x, y) = (a.to_f64(), b.to_f64());
            let result = match op {
                BinaryOp::Add => x + y,
                BinaryOp::Subtract => x - y,
                BinaryOp::Multiply => x * y,
                BinaryOp::Divide => x / y,
                BinaryOp::Modulo => x % y,
                _ => return Err(mismatch("an arithmetic operator", &Value::Number(a))),
            };
            Ok(if kind == NumericKind::Float {
                Number::Float(result as f32)
            } else {
                Number::Double(result)
            })
        }
        _ => {
            let (Some(x), Some(y)) = (a.as_i128(), b.as_i128()) else {
                return Err(mismatch("an integral number", &Value::Number(a)));
            };
            if matches!(op, BinaryOp::Divide | BinaryOp::Modulo) && y == 0 {
                return Err(EvalError::DivisionByZero);
            }
            let result = match op {
                BinaryOp::Add => x.checked_add(y),
                BinaryOp::Subtract => x.checked_sub(y),
                BinaryOp::Multiply => x.checked_mul(y),
                BinaryOp::Divide => x.checked_div(y),
                BinaryOp::Modulo => x.checked_rem(y),
                _ => return Err(mismatch("an arithmetic operator", &Value::Number(a))),
            };
            result
                .and_then(|r| Number::from_integral(r, kind))
                .ok_or_else(overflow)
        }
    }
}

fn collection(
    op: CollectionOp,
    source: &Expr,
    parameter: Option<usize>,
    body: Option<&Expr>,
    env: &mut Vec<Value>,
) -> Result<Value, EvalError> {
    let items = match evaluate(source, env)? {
        Value::List(items) => items,
        Value::Null => {
            return Err(EvalError::NullReference {
                action: "enumerate",
            })
        }
        other => return Err(mismatch("a collection", &other)),
    };
    let Some(body) = body else {
        return Ok(Value::Bool(match op {
            CollectionOp::Any => !items.is_empty(),
            CollectionOp::All => true,
        }));
    };

    let mark = env.len();
    let result = (|| -> Result<bool, EvalError> {
        for item in items {
            if let Some(slot) = parameter {
                if env.len() <= slot {
                    env.resize(slot + 1, Value::Null);
                }
                env[slot] = item;
            }
            let verdict = evaluate(body, env)?;
            let verdict = verdict
                .as_bool()
                .ok_or_else(|| mismatch("bool", &verdict))?;
            match (op, verdict) {
                (CollectionOp::Any, true) => return Ok(true),
                (CollectionOp::All, false) => return Ok(false),
                _ => {}
            }
        }
        Ok(op == CollectionOp::All)
    })();
    env.truncate(mark);
    result.map(Value::Bool)
}

//! Implicit type conversions between expression operands.
//!
//! Operator and function builders call into this module to bring operands to
//! a common type before combining them:
//!
//! - numeric widening follows the fixed table on [`NumericKind::widenings`];
//! - a `null` literal takes the nullable form of the other side;
//! - nullable and plain forms of one type unify to the nullable form;
//! - a date and time without an offset widens to one with a UTC offset;
//! - enums can be coerced from integral numbers and from constant strings.
//!
//! Every helper either rewrites its operands in place and reports success, or
//! leaves them untouched.

use std::mem;
use std::sync::Arc;

use thiserror::Error;
use tracing::trace;

use crate::eval::{self, EvalError};
use crate::expr::{BinaryOp, Expr};
use crate::types::{EnumType, NumericKind, ValueType};
use crate::value::Value;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("`{value}` is not a member of enum `{enum_name}`")]
    EnumParse { value: String, enum_name: String },
    #[error("only constant strings can be converted to enum `{enum_name}`")]
    NotSupported { enum_name: String },
    #[error("the constant operand could not be evaluated")]
    Evaluation(#[from] EvalError),
}

/// The first kind both sides can widen to, scanning `a`'s widenings in order.
pub fn common_numeric(a: NumericKind, b: NumericKind) -> Option<NumericKind> {
    if a == b {
        return Some(a);
    }
    let targets = b.widenings();
    a.widenings()
        .iter()
        .copied()
        .find(|kind| targets.contains(kind))
}

/// The type both `a` and `b` can implicitly convert to.
pub fn common_type(a: &ValueType, b: &ValueType) -> Option<ValueType> {
    if a == b {
        return Some(a.clone());
    }
    match (a, b) {
        (ValueType::Null, other) | (other, ValueType::Null) => {
            return Some(other.clone().nullable())
        }
        _ => {}
    }
    let (ua, ub) = (a.underlying(), b.underlying());
    if ua == ub {
        return Some(ua.clone().nullable());
    }
    let common = match (ua, ub) {
        (ValueType::DateTime, ValueType::DateTimeOffset)
        | (ValueType::DateTimeOffset, ValueType::DateTime) => ValueType::DateTimeOffset,
        _ => ValueType::Number(common_numeric(a.numeric_kind()?, b.numeric_kind()?)?),
    };
    if a.is_nullable() || b.is_nullable() {
        Some(common.nullable())
    } else {
        Some(common)
    }
}

/// Replaces `expr` with `expr` converted to `ty`.
fn coerce(expr: &mut Expr, ty: &ValueType) {
    let operand = mem::replace(expr, Expr::null());
    *expr = Expr::convert(operand, ty.clone());
}

/// Converts both operands to their common type, if one exists.
pub fn try_implicitly_convert(left: &mut Expr, right: &mut Expr) -> bool {
    let (lt, rt) = (left.ty(), right.ty());
    if lt == rt {
        return true;
    }
    let Some(common) = common_type(&lt, &rt) else {
        return false;
    };
    trace!(%lt, %rt, %common, "implicit conversion");
    coerce(left, &common);
    coerce(right, &common);
    true
}

/// Splits a pair into `(enum side, other side)` when exactly one side is an enum.
fn enum_pair<'a>(
    left: &'a mut Expr,
    right: &'a mut Expr,
) -> Option<(Arc<EnumType>, ValueType, &'a mut Expr)> {
    let (lt, rt) = (left.ty(), right.ty());
    match (lt.enum_type().cloned(), rt.enum_type().cloned()) {
        (Some(descriptor), None) => Some((descriptor, lt, right)),
        (None, Some(descriptor)) => Some((descriptor, rt, left)),
        _ => None,
    }
}

/// Reinterprets an integral operand as the enum on the other side.
///
/// Returns `true` when both operands end up with the same type.
pub fn try_enum_number_convert(left: &mut Expr, right: &mut Expr) -> bool {
    if left.ty() == right.ty() {
        return true;
    }
    let Some((_, enum_ty, number)) = enum_pair(left, right) else {
        return false;
    };
    let number_ty = number.ty();
    let Some(kind) = number_ty.numeric_kind() else {
        return false;
    };
    if !kind.is_enum_compatible() {
        return false;
    }
    let target = if number_ty.is_nullable() {
        enum_ty.nullable()
    } else {
        enum_ty
    };
    coerce(number, &target);
    try_implicitly_convert(left, right)
}

/// Parses a constant string operand as the enum on the other side.
///
/// The string side must be closed so it can be evaluated now; computed strings
/// fail with [`ConversionError::NotSupported`] rather than at evaluation time.
pub fn try_enum_string_convert(
    left: &mut Expr,
    right: &mut Expr,
    ignore_case: bool,
) -> Result<bool, ConversionError> {
    if left.ty() == right.ty() {
        return Ok(true);
    }
    let Some((descriptor, enum_ty, string)) = enum_pair(left, right) else {
        return Ok(false);
    };
    if *string.ty().underlying() != ValueType::String {
        return Ok(false);
    }
    *string = parse_enum_constant(string, &descriptor, &enum_ty, ignore_case)?;
    Ok(try_implicitly_convert(left, right))
}

fn parse_enum_constant(
    string: &Expr,
    descriptor: &Arc<EnumType>,
    target: &ValueType,
    ignore_case: bool,
) -> Result<Expr, ConversionError> {
    if !string.is_closed() {
        return Err(ConversionError::NotSupported {
            enum_name: descriptor.name().to_string(),
        });
    }
    let text = match eval::evaluate(string, &mut Vec::new())? {
        Value::String(text) => text,
        Value::Null => {
            return Ok(Expr::convert(Expr::null(), target.clone().nullable()));
        }
        other => {
            return Err(ConversionError::EnumParse {
                value: other.to_string(),
                enum_name: descriptor.name().to_string(),
            })
        }
    };
    let value = descriptor
        .parse(&text, ignore_case)
        .ok_or_else(|| ConversionError::EnumParse {
            value: text.clone(),
            enum_name: descriptor.name().to_string(),
        })?;
    let constant = Expr::constant(Value::Enum {
        ty: Arc::clone(descriptor),
        value,
    });
    Ok(Expr::convert(constant, target.clone()))
}

/// Converts `expr` to `target` for a function argument.
///
/// Allows every implicit conversion plus explicit numeric casts and
/// enum/number reinterpretation. `Ok(None)` means no conversion exists.
pub fn try_convert(expr: Expr, target: &ValueType) -> Result<Option<Expr>, ConversionError> {
    let source = expr.ty();
    if source == *target {
        return Ok(Some(expr));
    }
    if expr.is_null_constant() {
        return Ok(target
            .accepts_null()
            .then(|| Expr::convert(expr, target.clone())));
    }
    if source.clone().nullable() == *target {
        return Ok(Some(Expr::convert(expr, target.clone())));
    }
    let converts = match (source.underlying(), target.underlying()) {
        (ValueType::Number(_), ValueType::Number(_)) => true,
        (ValueType::Number(kind), ValueType::Enum(_)) => kind.is_enum_compatible(),
        (ValueType::Enum(_), ValueType::Number(_)) => true,
        (ValueType::DateTime, ValueType::DateTimeOffset) => true,
        (ValueType::String, ValueType::Enum(descriptor)) => {
            let descriptor = Arc::clone(descriptor);
            return parse_enum_constant(&expr, &descriptor, target, true).map(Some);
        }
        (a, b) => a == b,
    };
    Ok(converts.then(|| Expr::convert(expr, target.clone())))
}

/// Makes `expr` boolean, rewriting it to `expr == true` when needed.
pub fn try_boolean(expr: &mut Expr) -> bool {
    if expr.ty().is_bool() {
        return true;
    }
    let mut left = expr.clone();
    let mut right = Expr::constant(true);
    if !try_implicitly_convert(&mut left, &mut right) {
        return false;
    }
    match Expr::binary(BinaryOp::Equal, left, right) {
        Ok(comparison) => {
            *expr = comparison;
            true
        }
        Err(_) => false,
    }
}

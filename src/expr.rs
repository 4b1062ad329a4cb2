//! Typed expression trees.
//!
//! The parser folds tokens into an [`Expr`]: a closed tagged union of
//! constants, bound parameters, field accesses, conversions, operators, host
//! function calls, lists and collection predicates. Every node knows its
//! static [`ValueType`], and the checked constructors refuse ill-typed trees,
//! so type errors surface while parsing instead of while evaluating.
//!
//! Turning a tree into something runnable is the job of [`crate::eval`].

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::diagnostics::BoxError;
use crate::types::ValueType;
use crate::value::Value;

/// Errors raised by the checked expression constructors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("operator `{op}` cannot be applied to {left} and {right}")]
    BinaryTypes {
        op: BinaryOp,
        left: ValueType,
        right: ValueType,
    },
    #[error("operator `{op}` cannot be applied to {operand}")]
    UnaryType { op: UnaryOp, operand: ValueType },
    #[error("{ty} is not a record, so it has no field `{field}`")]
    NotARecord { ty: ValueType, field: String },
    #[error("`{record}` has no field `{field}`")]
    UnknownField { record: String, field: String },
    #[error("`{function}` takes {expected} argument(s), {actual} given")]
    Arity {
        function: String,
        expected: usize,
        actual: usize,
    },
    #[error("argument {index} of `{function}` must be {expected}, found {actual}")]
    ArgumentType {
        function: String,
        index: usize,
        expected: ValueType,
        actual: ValueType,
    },
    #[error("{ty} is not a collection")]
    NotACollection { ty: ValueType },
    #[error("collection predicates must be bool, found {ty}")]
    PredicateType { ty: ValueType },
    #[error("`{op}` needs a predicate")]
    MissingPredicate { op: CollectionOp },
    #[error("cannot convert {from} to {to}")]
    Conversion { from: ValueType, to: ValueType },
    #[error("operator received {actual} operand(s), expected {expected}")]
    OperandCount { expected: usize, actual: usize },
    #[error("`{name}` needs a bound parameter to resolve against")]
    Unbound { name: String },
}

// =============================================================================
// OPERATORS AND FUNCTIONS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add
                | BinaryOp::Subtract
                | BinaryOp::Multiply
                | BinaryOp::Divide
                | BinaryOp::Modulo
        )
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOp::Equal | BinaryOp::NotEqual)
    }

    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            BinaryOp::Greater | BinaryOp::GreaterOrEqual | BinaryOp::Less | BinaryOp::LessOrEqual
        )
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterOrEqual => ">=",
            BinaryOp::Less => "<",
            BinaryOp::LessOrEqual => "<=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOp::Negate => "-",
            UnaryOp::Not => "!",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionOp {
    Any,
    All,
}

impl fmt::Display for CollectionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CollectionOp::Any => "any",
            CollectionOp::All => "all",
        })
    }
}

type HostFn = dyn Fn(&[Value]) -> Result<Value, BoxError> + Send + Sync;

/// A host function callable from expression trees.
#[derive(Clone)]
pub struct Function {
    name: Arc<str>,
    parameters: Vec<ValueType>,
    returns: ValueType,
    body: Arc<HostFn>,
}

impl Function {
    pub fn new<F, E>(
        name: &str,
        parameters: Vec<ValueType>,
        returns: ValueType,
        body: F,
    ) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self {
            name: Arc::from(name),
            parameters,
            returns,
            body: Arc::new(move |args: &[Value]| body(args).map_err(Into::into)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[ValueType] {
        &self.parameters
    }

    pub fn returns(&self) -> &ValueType {
        &self.returns
    }

    pub fn invoke(&self, args: &[Value]) -> Result<Value, BoxError> {
        (self.body)(args)
    }
}

impl PartialEq for Function {
    /// Host bodies cannot be compared; functions are identified by signature.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.parameters == other.parameters
            && self.returns == other.returns
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("returns", &self.returns)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// PARAMETERS
// =============================================================================

/// A bound variable visible to operand builders.
///
/// Parameters are addressed by their slot: their index in the parse state's
/// parameter list, which is also their index in the evaluation environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: Option<String>,
    ty: ValueType,
}

impl Parameter {
    pub fn new(ty: ValueType) -> Self {
        Self { name: None, ty }
    }

    pub fn named(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            name: Some(name.into()),
            ty,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn ty(&self) -> &ValueType {
        &self.ty
    }
}

// =============================================================================
// EXPRESSIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Constant {
        value: Value,
        ty: ValueType,
    },
    Parameter {
        slot: usize,
        name: Option<String>,
        ty: ValueType,
    },
    Field {
        target: Box<Expr>,
        index: usize,
        name: String,
        ty: ValueType,
    },
    Convert {
        operand: Box<Expr>,
        ty: ValueType,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        ty: ValueType,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        ty: ValueType,
    },
    Call {
        function: Function,
        args: Vec<Expr>,
    },
    List {
        items: Vec<Expr>,
    },
    Collection {
        op: CollectionOp,
        source: Box<Expr>,
        parameter: Option<usize>,
        body: Option<Box<Expr>>,
    },
}

impl Expr {
    /// A constant typed after its value.
    pub fn constant(value: impl Into<Value>) -> Expr {
        let value = value.into();
        let ty = value.value_type();
        Expr::Constant { value, ty }
    }

    /// The untyped `null` literal.
    pub fn null() -> Expr {
        Expr::Constant {
            value: Value::Null,
            ty: ValueType::Null,
        }
    }

    /// A `null` constant of a type that admits null.
    pub fn typed_null(ty: ValueType) -> Result<Expr, ExprError> {
        if !ty.accepts_null() {
            return Err(ExprError::Conversion {
                from: ValueType::Null,
                to: ty,
            });
        }
        Ok(Expr::Constant {
            value: Value::Null,
            ty,
        })
    }

    pub fn parameter(slot: usize, parameter: &Parameter) -> Expr {
        Expr::Parameter {
            slot,
            name: parameter.name.clone(),
            ty: parameter.ty.clone(),
        }
    }

    /// Accesses a record field, resolving the name case-insensitively.
    pub fn field(target: Expr, name: &str) -> Result<Expr, ExprError> {
        let target_ty = target.ty();
        let Some(record) = target_ty.record_type() else {
            return Err(ExprError::NotARecord {
                ty: target_ty.clone(),
                field: name.to_string(),
            });
        };
        let (index, field, ty) = record.field(name).ok_or_else(|| ExprError::UnknownField {
            record: record.name().to_string(),
            field: name.to_string(),
        })?;
        Ok(Expr::Field {
            index,
            name: field.to_string(),
            ty: ty.clone(),
            target: Box::new(target),
        })
    }

    /// Wraps `operand` in a conversion unless it already has type `ty`.
    ///
    /// Validity of the conversion is the caller's concern; see [`crate::conversions`].
    pub fn convert(operand: Expr, ty: ValueType) -> Expr {
        if operand.ty() == ty {
            return operand;
        }
        match operand {
            Expr::Constant {
                value: Value::Null, ..
            } if ty.accepts_null() => Expr::Constant {
                value: Value::Null,
                ty,
            },
            operand => Expr::Convert {
                operand: Box::new(operand),
                ty,
            },
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Result<Expr, ExprError> {
        let ty = operand.ty();
        let valid = match op {
            UnaryOp::Negate => ty
                .numeric_kind()
                .is_some_and(|kind| kind.is_arithmetic() && !kind.is_unsigned()),
            UnaryOp::Not => ty == ValueType::Bool,
        };
        if !valid {
            return Err(ExprError::UnaryType { op, operand: ty });
        }
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
            ty,
        })
    }

    /// Combines two operands. Both sides must already share one type.
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Result<Expr, ExprError> {
        let (lt, rt) = (left.ty(), right.ty());
        let mismatch = || ExprError::BinaryTypes {
            op,
            left: lt.clone(),
            right: rt.clone(),
        };
        if lt != rt {
            return Err(mismatch());
        }
        let ty = if op.is_arithmetic() {
            if !lt.numeric_kind().is_some_and(|kind| kind.is_arithmetic()) {
                return Err(mismatch());
            }
            lt.clone()
        } else if op.is_ordering() {
            if lt.numeric_kind().is_none() && !lt.is_temporal() {
                return Err(mismatch());
            }
            ValueType::Bool
        } else if op.is_equality() {
            if matches!(lt.underlying(), ValueType::Collection(_)) {
                return Err(mismatch());
            }
            ValueType::Bool
        } else {
            if lt != ValueType::Bool {
                return Err(mismatch());
            }
            ValueType::Bool
        };
        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            ty,
        })
    }

    /// Calls a host function; argument types must match its signature exactly.
    pub fn call(function: Function, args: Vec<Expr>) -> Result<Expr, ExprError> {
        if function.parameters.len() != args.len() {
            return Err(ExprError::Arity {
                function: function.name().to_string(),
                expected: function.parameters.len(),
                actual: args.len(),
            });
        }
        for (index, (expected, arg)) in function.parameters.iter().zip(&args).enumerate() {
            let actual = arg.ty();
            if *expected != actual {
                return Err(ExprError::ArgumentType {
                    function: function.name().to_string(),
                    index,
                    expected: expected.clone(),
                    actual,
                });
            }
        }
        Ok(Expr::Call { function, args })
    }

    pub fn list(items: Vec<Expr>) -> Expr {
        Expr::List { items }
    }

    /// An `any`/`all` predicate over a collection.
    ///
    /// `parameter` is the slot the element is bound to while `body` runs.
    pub fn collection(
        op: CollectionOp,
        source: Expr,
        parameter: Option<usize>,
        body: Option<Expr>,
    ) -> Result<Expr, ExprError> {
        let source_ty = source.ty();
        if source_ty.element().is_none() {
            return Err(ExprError::NotACollection { ty: source_ty });
        }
        match &body {
            Some(body) if !body.ty().is_bool() => {
                return Err(ExprError::PredicateType { ty: body.ty() })
            }
            None if op == CollectionOp::All => return Err(ExprError::MissingPredicate { op }),
            _ => {}
        }
        Ok(Expr::Collection {
            op,
            source: Box::new(source),
            parameter,
            body: body.map(Box::new),
        })
    }

    /// The static type of this node.
    pub fn ty(&self) -> ValueType {
        match self {
            Expr::Constant { ty, .. }
            | Expr::Parameter { ty, .. }
            | Expr::Field { ty, .. }
            | Expr::Convert { ty, .. }
            | Expr::Unary { ty, .. }
            | Expr::Binary { ty, .. } => ty.clone(),
            Expr::Call { function, .. } => function.returns.clone(),
            Expr::List { items } => ValueType::collection_of(
                items
                    .iter()
                    .map(Expr::ty)
                    .find(|ty| *ty != ValueType::Null)
                    .unwrap_or(ValueType::Null),
            ),
            Expr::Collection { .. } => ValueType::Bool,
        }
    }

    pub fn is_null_constant(&self) -> bool {
        matches!(
            self,
            Expr::Constant {
                value: Value::Null,
                ..
            }
        )
    }

    /// True when the tree references no parameter and can be evaluated on its own.
    pub fn is_closed(&self) -> bool {
        match self {
            Expr::Constant { .. } => true,
            Expr::Parameter { .. } | Expr::Collection { .. } => false,
            Expr::Field { target, .. } => target.is_closed(),
            Expr::Convert { operand, .. } | Expr::Unary { operand, .. } => operand.is_closed(),
            Expr::Binary { left, right, .. } => left.is_closed() && right.is_closed(),
            Expr::Call { args, .. } | Expr::List { items: args } => {
                args.iter().all(Expr::is_closed)
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant { value, .. } => write!(f, "{value}"),
            Expr::Parameter { slot, name, .. } => match name {
                Some(name) => f.write_str(name),
                None => write!(f, "${slot}"),
            },
            Expr::Field { target, name, .. } => write!(f, "{target}.{name}"),
            Expr::Convert { operand, ty } => write!(f, "({operand} as {ty})"),
            Expr::Unary { op, operand, .. } => write!(f, "({op}{operand})"),
            Expr::Binary {
                op, left, right, ..
            } => write!(f, "({left} {op} {right})"),
            Expr::Call { function, args } => {
                write!(f, "{}(", function.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Expr::List { items } => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Expr::Collection {
                op,
                source,
                parameter,
                body,
            } => {
                write!(f, "{source}.{op}(")?;
                if let Some(slot) = parameter {
                    write!(f, "${slot} => ")?;
                }
                if let Some(body) = body {
                    write!(f, "{body}")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordType;

    #[test]
    fn binary_requires_matching_types() {
        let err = Expr::binary(BinaryOp::Add, Expr::constant(1), Expr::constant("x")).unwrap_err();
        assert!(matches!(err, ExprError::BinaryTypes { .. }));
    }

    #[test]
    fn comparisons_yield_bool() {
        let cmp = Expr::binary(BinaryOp::Less, Expr::constant(1), Expr::constant(2)).unwrap();
        assert_eq!(cmp.ty(), ValueType::Bool);
        assert_eq!(cmp.to_string(), "(1 < 2)");
    }

    #[test]
    fn dates_order_but_guids_do_not() {
        let date = || Expr::parameter(0, &Parameter::new(ValueType::DATETIME.nullable()));
        let cmp = Expr::binary(BinaryOp::Less, date(), date()).unwrap();
        assert_eq!(cmp.ty(), ValueType::Bool);

        let guid = || Expr::parameter(0, &Parameter::new(ValueType::GUID));
        assert!(Expr::binary(BinaryOp::Equal, guid(), guid()).is_ok());
        assert!(Expr::binary(BinaryOp::Greater, guid(), guid()).is_err());
    }

    #[test]
    fn negate_rejects_unsigned() {
        use crate::value::Number;
        let err = Expr::unary(UnaryOp::Negate, Expr::constant(Number::UInt(3))).unwrap_err();
        assert!(matches!(err, ExprError::UnaryType { .. }));
    }

    #[test]
    fn fields_resolve_through_the_schema() {
        let row = Arc::new(RecordType::new("Row", [("Name", ValueType::STRING)]).unwrap());
        let param = Parameter::new(ValueType::Record(row));
        let field = Expr::field(Expr::parameter(0, &param), "name").unwrap();
        assert_eq!(field.ty(), ValueType::STRING);
        assert_eq!(field.to_string(), "$0.Name");
        assert!(!field.is_closed());
    }

    #[test]
    fn converting_null_retypes_the_constant() {
        let converted = Expr::convert(Expr::null(), ValueType::INT.nullable());
        assert!(converted.is_null_constant());
        assert_eq!(converted.ty(), ValueType::INT.nullable());
    }
}

//! Decimal arithmetic with math functions and record property paths.
//!
//! ```
//! # use rust_decimal::Decimal;
//! # use strexpr::languages::Arithmetic;
//! let arithmetic = Arithmetic::new().unwrap();
//! let value = arithmetic.evaluate("(1 + 2) * pow(2, 3)").unwrap();
//! assert_eq!(value, Decimal::from(24));
//! ```

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::conversions;
use crate::diagnostics::{BoxError, GrammarError, ParseError, StrexprError};
use crate::eval::{EvalError, Lambda};
use crate::expr::{BinaryOp, Expr, ExprError, Function, Parameter};
use crate::grammar::{Overload, Rule};
use crate::language::Language;
use crate::span::Span;
use crate::types::{NumericKind, RecordType, ValueType};
use crate::value::{Number, Value};

pub struct Arithmetic {
    language: Language,
}

impl Arithmetic {
    pub fn new() -> Result<Self, GrammarError> {
        Ok(Self {
            language: Language::new(rules())?,
        })
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    /// Compiles `text` to a zero-argument callable returning a decimal.
    pub fn parse(&self, text: &str) -> Result<Lambda, ParseError> {
        let body = self.language.parse(text)?;
        Ok(Lambda::new(Vec::new(), to_decimal(text, body)?))
    }

    /// Compiles `text` to a callable over one record of type `record`.
    ///
    /// Property paths such as `Order.Total` resolve against that record.
    pub fn parse_with(&self, text: &str, record: Arc<RecordType>) -> Result<Lambda, ParseError> {
        let parameters = vec![Parameter::new(ValueType::Record(record))];
        let body = self.language.parse_with(text, parameters.clone())?;
        Ok(Lambda::new(parameters, to_decimal(text, body)?))
    }

    /// Compiles and evaluates `text`.
    pub fn evaluate(&self, text: &str) -> Result<Decimal, StrexprError> {
        let value = self.parse(text)?.invoke(&[])?;
        Ok(decimal_of(value)?)
    }
}

fn to_decimal(text: &str, body: Expr) -> Result<Expr, ParseError> {
    let from = body.ty();
    match conversions::try_convert(body, &ValueType::DECIMAL) {
        Ok(Some(body)) if from.numeric_kind().is_some() => Ok(body),
        Ok(_) => Err(ParseError::OperationInvalid {
            span: Span::whole(Arc::from(text)),
            source: ExprError::Conversion {
                from,
                to: ValueType::DECIMAL,
            }
            .into(),
        }),
        Err(err) => Err(ParseError::OperationInvalid {
            span: Span::whole(Arc::from(text)),
            source: err.into(),
        }),
    }
}

/// Unwraps the decimal a compiled arithmetic lambda returns.
pub fn decimal_of(value: Value) -> Result<Decimal, EvalError> {
    match value {
        Value::Number(Number::Decimal(decimal)) => Ok(decimal),
        Value::Null => Err(EvalError::NullReference {
            action: "return",
        }),
        other => Err(EvalError::TypeMismatch {
            expected: ValueType::DECIMAL.to_string(),
            found: other.to_string(),
        }),
    }
}

// ============================================================================
// RULES
// ============================================================================

const FUNCTIONS: [&str; 7] = [
    "FN_SIN", "FN_COS", "FN_TAN", "FN_SQRT", "FN_POW", "FN_LOG", "FN_ROUND",
];

fn rules() -> Vec<Rule> {
    let mut opens = vec!["OPEN_BRACKET"];
    opens.extend(FUNCTIONS);

    vec![
        // Literals
        Rule::operand("DECIMAL", r"-?\d+(\.\d+)?", |text: &str| {
            Number::parse(text, NumericKind::Decimal).map(Expr::constant)
        }),
        Rule::operand("PI", r"\b[Pp][Ii]\b", |_: &str| {
            Ok::<_, BoxError>(Expr::constant(Number::Double(std::f64::consts::PI)))
        }),
        // Functions
        Rule::function_overloads("FN_SIN", r"[Ss][Ii][Nn]\(", vec![math("sin", f64::sin)]),
        Rule::function_overloads("FN_COS", r"[Cc][Oo][Ss]\(", vec![math("cos", f64::cos)]),
        Rule::function_overloads("FN_TAN", r"[Tt][Aa][Nn]\(", vec![math("tan", f64::tan)]),
        Rule::function_overloads("FN_SQRT", r"[Ss][Qq][Rr][Tt]\(", vec![math("sqrt", f64::sqrt)]),
        Rule::function_overloads("FN_POW", r"[Pp][Oo][Ww]\(", vec![math2("pow", f64::powf)]),
        Rule::function_overloads(
            "FN_LOG",
            r"[Ll][Oo][Gg]\(",
            vec![math("log", f64::ln), math2("log", f64::log)],
        ),
        Rule::function_overloads(
            "FN_ROUND",
            r"[Rr][Oo][Uu][Nn][Dd]\(",
            vec![
                call(Function::new(
                    "round",
                    vec![ValueType::DECIMAL],
                    ValueType::DECIMAL,
                    |args: &[Value]| -> Result<Value, BoxError> {
                        Ok(Value::from(decimal_arg(args, 0)?.round()))
                    },
                )),
                call(Function::new(
                    "round",
                    vec![ValueType::DECIMAL, ValueType::INT],
                    ValueType::DECIMAL,
                    |args: &[Value]| -> Result<Value, BoxError> {
                        let places = match args.get(1) {
                            Some(Value::Number(Number::Int(places))) => u32::try_from(*places)?,
                            _ => return Err("round needs a whole number of places".into()),
                        };
                        Ok(Value::from(decimal_arg(args, 0)?.round_dp(places)))
                    },
                )),
            ],
        ),
        // Brackets
        Rule::bracket_open("OPEN_BRACKET", r"\("),
        Rule::list_delimiter("COMMA", ","),
        Rule::bracket_close("CLOSE_BRACKET", r"\)", &opens, Some("COMMA")),
        // Operators
        Rule::binary("ADD", r"\+", 2, |l, r| Expr::binary(BinaryOp::Add, l, r)),
        Rule::binary("SUB", r"-", 2, |l, r| Expr::binary(BinaryOp::Subtract, l, r)),
        Rule::binary("MUL", r"\*", 1, |l, r| Expr::binary(BinaryOp::Multiply, l, r)),
        Rule::binary("DIV", r"/", 1, |l, r| Expr::binary(BinaryOp::Divide, l, r)),
        Rule::binary("MOD", r"%", 1, |l, r| Expr::binary(BinaryOp::Modulo, l, r)),
        // Properties
        Rule::operand_with_parameters(
            "PROPERTY_PATH",
            r"[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*",
            property_path,
        ),
        Rule::ignored("WHITESPACE", r"\s+"),
    ]
}

fn property_path(text: &str, parameters: &[Parameter]) -> Result<Expr, ExprError> {
    let record = parameters.first().ok_or_else(|| ExprError::Unbound {
        name: text.to_string(),
    })?;
    text.split('.')
        .try_fold(Expr::parameter(0, record), |target, name| Expr::field(target, name))
}

fn call(function: Function) -> Overload {
    let parameters = function.parameters().to_vec();
    Overload::fixed(parameters, move |args| Expr::call(function.clone(), args))
}

fn math(name: &str, f: fn(f64) -> f64) -> Overload {
    call(Function::new(
        name,
        vec![ValueType::DOUBLE],
        ValueType::DOUBLE,
        move |args: &[Value]| -> Result<Value, BoxError> {
            Ok(Value::Number(Number::Double(f(double_arg(args, 0)?))))
        },
    ))
}

fn math2(name: &str, f: fn(f64, f64) -> f64) -> Overload {
    call(Function::new(
        name,
        vec![ValueType::DOUBLE, ValueType::DOUBLE],
        ValueType::DOUBLE,
        move |args: &[Value]| -> Result<Value, BoxError> {
            let (a, b) = (double_arg(args, 0)?, double_arg(args, 1)?);
            Ok(Value::Number(Number::Double(f(a, b))))
        },
    ))
}

fn double_arg(args: &[Value], index: usize) -> Result<f64, BoxError> {
    args.get(index)
        .and_then(Value::as_number)
        .map(|number| number.to_f64())
        .ok_or_else(|| format!("argument {index} must be a number").into())
}

fn decimal_arg(args: &[Value], index: usize) -> Result<Decimal, BoxError> {
    match args.get(index) {
        Some(Value::Number(Number::Decimal(decimal))) => Ok(*decimal),
        _ => Err(format!("argument {index} must be a decimal").into()),
    }
}

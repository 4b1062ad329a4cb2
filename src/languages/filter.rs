//! An OData-style predicate language over one record.
//!
//! ```
//! # use std::sync::Arc;
//! # use strexpr::languages::Filter;
//! # use strexpr::types::{RecordType, ValueType};
//! # use strexpr::value::{Record, Value};
//! let person = Arc::new(
//!     RecordType::new("Person", [("Name", ValueType::STRING), ("Age", ValueType::INT)]).unwrap(),
//! );
//! let rows = vec![
//!     Record::from_pairs(Arc::clone(&person), [("Name", Value::from("Ada")), ("Age", Value::from(36))]),
//!     Record::from_pairs(Arc::clone(&person), [("Name", Value::from("Alan")), ("Age", Value::from(41))]),
//! ];
//! let filter = Filter::new().unwrap();
//! let matches = filter.filter("startswith(Name, 'A') and Age gt 40", &person, &rows).unwrap();
//! assert_eq!(matches.len(), 1);
//! ```
//!
//! Members are reached with `/` (`Address/City`); record fields resolve
//! case-insensitively. Collections take `any` and `all` predicates with a
//! named element: `Tags/any(t: t eq 'red')`. Dates, offsets and guids are
//! written `datetime'2020-01-31T10:00:00'`, `datetimeoffset'...'` and
//! `guid'...'`.

use std::sync::Arc;

use chrono::{Datelike, NaiveDateTime, Timelike};
use tracing::debug;

use crate::conversions;
use crate::diagnostics::{BoxError, GrammarError, ParseError, StrexprError};
use crate::eval::Lambda;
use crate::expr::{BinaryOp, CollectionOp, Expr, ExprError, Function, Parameter, UnaryOp};
use crate::grammar::{CollectionBody, Overload, Position, Rule};
use crate::language::Language;
use crate::span::Span;
use crate::types::{NumericKind, RecordType, ValueType};
use crate::value::{self, Number, Record, Value};

pub struct Filter {
    language: Language,
}

impl Filter {
    pub fn new() -> Result<Self, GrammarError> {
        Ok(Self {
            language: Language::new(rules())?,
        })
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    /// Compiles `text` to a predicate over one record of type `record`.
    pub fn parse(&self, text: &str, record: Arc<RecordType>) -> Result<Lambda, ParseError> {
        let parameters = vec![Parameter::new(ValueType::Record(record))];
        let mut body = self.language.parse_with(text, parameters.clone())?;
        if !conversions::try_boolean(&mut body) {
            return Err(ParseError::OperationInvalid {
                span: Span::whole(Arc::from(text)),
                source: ExprError::PredicateType { ty: body.ty() }.into(),
            });
        }
        Ok(Lambda::new(parameters, body))
    }

    /// The rows for which `text` holds. A null result counts as false.
    pub fn filter<'a>(
        &self,
        text: &str,
        record: &Arc<RecordType>,
        rows: &'a [Record],
    ) -> Result<Vec<&'a Record>, StrexprError> {
        let predicate = self.parse(text, Arc::clone(record))?;
        let mut matches = Vec::new();
        for row in rows {
            if predicate.invoke(&[Value::Record(row.clone())])? == Value::Bool(true) {
                matches.push(row);
            }
        }
        debug!(rows = rows.len(), matches = matches.len(), "filtered");
        Ok(matches)
    }
}

// ============================================================================
// RULES
// ============================================================================

const FUNCTIONS: [&str; 13] = [
    "FN_STARTSWITH",
    "FN_ENDSWITH",
    "FN_SUBSTRINGOF",
    "FN_TOLOWER",
    "FN_TOUPPER",
    "FN_LENGTH",
    "FN_ROUND",
    "FN_YEAR",
    "FN_MONTH",
    "FN_DAY",
    "FN_HOUR",
    "FN_MINUTE",
    "FN_SECOND",
];

fn rules() -> Vec<Rule> {
    let mut opens = vec!["OPEN_BRACKET"];
    opens.extend(FUNCTIONS);
    opens.extend(["ANY", "ALL"]);

    let mut rules = literals();
    rules.extend([
        // Collections, ahead of member access so `/any(` is not a member
        Rule::collection("ANY", r"/any\(", |_: &str, source, body| {
            collection(CollectionOp::Any, source, body)
        }),
        Rule::collection("ALL", r"/all\(", |_: &str, source, body| {
            collection(CollectionOp::All, source, body)
        }),
        // Functions
        string_function("FN_STARTSWITH", r"startswith\(", 2, ValueType::BOOL, |args| {
            Ok(Value::Bool(args[0].starts_with(args[1])))
        }),
        string_function("FN_ENDSWITH", r"endswith\(", 2, ValueType::BOOL, |args| {
            Ok(Value::Bool(args[0].ends_with(args[1])))
        }),
        string_function("FN_SUBSTRINGOF", r"substringof\(", 2, ValueType::BOOL, |args| {
            Ok(Value::Bool(args[1].contains(args[0])))
        }),
        string_function("FN_TOLOWER", r"tolower\(", 1, ValueType::STRING, |args| {
            Ok(Value::from(args[0].to_lowercase()))
        }),
        string_function("FN_TOUPPER", r"toupper\(", 1, ValueType::STRING, |args| {
            Ok(Value::from(args[0].to_uppercase()))
        }),
        string_function("FN_LENGTH", r"length\(", 1, ValueType::INT, |args| {
            let length = i32::try_from(args[0].chars().count())?;
            Ok(Value::from(length))
        }),
        Rule::function_overloads(
            "FN_ROUND",
            r"round\(",
            vec![call(Function::new(
                "round",
                vec![ValueType::DECIMAL],
                ValueType::DECIMAL,
                |args: &[Value]| -> Result<Value, BoxError> {
                    match args.first() {
                        Some(Value::Number(Number::Decimal(decimal))) => {
                            Ok(Value::from(decimal.round()))
                        }
                        Some(Value::Null) => Ok(Value::Null),
                        _ => Err("round needs a decimal".into()),
                    }
                },
            ))],
        ),
        date_part("FN_YEAR", r"year\(", |moment| moment.year()),
        date_part("FN_MONTH", r"month\(", |moment| moment.month() as i32),
        date_part("FN_DAY", r"day\(", |moment| moment.day() as i32),
        date_part("FN_HOUR", r"hour\(", |moment| moment.hour() as i32),
        date_part("FN_MINUTE", r"minute\(", |moment| moment.minute() as i32),
        date_part("FN_SECOND", r"second\(", |moment| moment.second() as i32),
        // Brackets
        Rule::bracket_open("OPEN_BRACKET", r"\("),
        Rule::list_delimiter("COMMA", ","),
        Rule::bracket_close("CLOSE_BRACKET", r"\)", &opens, Some("COMMA")),
        // Logical operators
        Rule::binary("EQ", r"\beq\b", 11, equality(BinaryOp::Equal)),
        Rule::binary("NE", r"\bne\b", 12, equality(BinaryOp::NotEqual)),
        Rule::binary("GT", r"\bgt\b", 13, |l, r| Expr::binary(BinaryOp::Greater, l, r)),
        Rule::binary("GE", r"\bge\b", 14, |l, r| Expr::binary(BinaryOp::GreaterOrEqual, l, r)),
        Rule::binary("LT", r"\blt\b", 15, |l, r| Expr::binary(BinaryOp::Less, l, r)),
        Rule::binary("LE", r"\ble\b", 16, |l, r| Expr::binary(BinaryOp::LessOrEqual, l, r)),
        Rule::binary("AND", r"\band\b", 17, logical(BinaryOp::And)),
        Rule::binary("OR", r"\bor\b", 18, logical(BinaryOp::Or)),
        Rule::unary("NOT", r"\bnot\b", 19, Position::Right, |mut operand| {
            conversions::try_boolean(&mut operand);
            Expr::unary(UnaryOp::Not, operand)
        }),
        // Arithmetic operators
        Rule::binary("ADD", r"\badd\b", 2, |l, r| Expr::binary(BinaryOp::Add, l, r)),
        Rule::binary("SUB", r"\bsub\b", 2, |l, r| Expr::binary(BinaryOp::Subtract, l, r)),
        Rule::binary("MUL", r"\bmul\b", 1, |l, r| Expr::binary(BinaryOp::Multiply, l, r)),
        Rule::binary("DIV", r"\bdiv\b", 1, |l, r| Expr::binary(BinaryOp::Divide, l, r)),
        Rule::binary("MOD", r"\bmod\b", 1, |l, r| Expr::binary(BinaryOp::Modulo, l, r)),
        // Properties
        Rule::collection_accessor("ACCESSOR", r"[A-Za-z_][A-Za-z0-9_]*:"),
        Rule::operand_with_parameters("PROPERTY", r"[A-Za-z_][A-Za-z0-9_]*", property),
        Rule::operator_with_text(
            "MEMBER",
            r"/[A-Za-z_][A-Za-z0-9_]*",
            Some(0),
            vec![Position::Left],
            |text: &str, args: Vec<Expr>| match <[Expr; 1]>::try_from(args) {
                Ok([target]) => Expr::field(target, &text[1..]),
                Err(args) => Err(ExprError::OperandCount {
                    expected: 1,
                    actual: args.len(),
                }),
            },
        ),
        Rule::ignored("WHITESPACE", r"\s+"),
    ]);
    rules
}

fn literals() -> Vec<Rule> {
    vec![
        Rule::operand(
            "GUID",
            r"guid'[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12}'",
            |text: &str| value::parse_guid(quoted(text)).map(Expr::constant),
        ),
        Rule::operand("DATETIME", r"(?i:datetime)'[^']+'", |text: &str| {
            value::parse_datetime(quoted(text)).map(Expr::constant)
        }),
        Rule::operand("DATETIMEOFFSET", r"datetimeoffset'[^']+'", |text: &str| {
            value::parse_datetime_offset(quoted(text)).map(Expr::constant)
        }),
        Rule::operand("STRING", r"'(?:\\.|[^'])*'", |text: &str| {
            Ok::<_, BoxError>(Expr::constant(unescape(&text[1..text.len() - 1])))
        }),
        Rule::operand("BYTE", r"0x[0-9A-Fa-f]{1,2}", |text: &str| {
            u8::from_str_radix(&text[2..], 16).map(|byte| Expr::constant(Number::Byte(byte)))
        }),
        Rule::operand("NULL", r"\bnull\b", |_: &str| Ok::<_, BoxError>(Expr::null())),
        Rule::operand("BOOL", r"\b(?:true|false)\b", |text: &str| {
            text.parse::<bool>().map(Expr::constant)
        }),
        number("FLOAT", r"-?\d+\.\d*f", NumericKind::Float),
        number("DOUBLE", r"-?\d+\.?\d*d", NumericKind::Double),
        number("DECIMAL_EXPLICIT", r"-?\d+\.?\d*[mM]", NumericKind::Decimal),
        number("DECIMAL", r"-?\d+\.\d+", NumericKind::Decimal),
        number("LONG", r"-?\d+L", NumericKind::Long),
        number("INTEGER", r"-?\d+", NumericKind::Int),
    ]
}

/// The text between the quotes of a prefixed literal such as `guid'...'`.
fn quoted(text: &str) -> &str {
    let body = text.split_once('\'').map_or(text, |(_, rest)| rest);
    body.strip_suffix('\'').unwrap_or(body)
}

/// A numeric literal with an optional one-letter type suffix.
fn number(name: &str, pattern: &str, kind: NumericKind) -> Rule {
    Rule::operand(name, pattern, move |text: &str| {
        let digits = text
            .trim_end_matches(|c: char| c.is_ascii_alphabetic())
            .trim_end_matches('.');
        Number::parse(digits, kind).map(Expr::constant)
    })
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('f') => out.push('\u{c}'),
            Some('b') => out.push('\u{8}'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Resolves a name to an element parameter in scope, else to a field of the record.
fn property(text: &str, parameters: &[Parameter]) -> Result<Expr, ExprError> {
    let named = parameters
        .iter()
        .rposition(|p| p.name().is_some_and(|name| name.eq_ignore_ascii_case(text)));
    if let Some(slot) = named {
        return Ok(Expr::parameter(slot, &parameters[slot]));
    }
    let record = parameters.first().ok_or_else(|| ExprError::Unbound {
        name: text.to_string(),
    })?;
    Expr::field(Expr::parameter(0, record), text)
}

fn collection(op: CollectionOp, source: Expr, body: CollectionBody) -> Result<Expr, ExprError> {
    let predicate = body.body.map(|mut predicate| {
        conversions::try_boolean(&mut predicate);
        predicate
    });
    let slot = body.parameter.map(|(slot, _)| slot);
    Expr::collection(op, source, slot, predicate)
}

/// Equality, coercing enums from numbers and from constant strings.
fn equality(op: BinaryOp) -> impl Fn(Expr, Expr) -> Result<Expr, BoxError> + Send + Sync {
    move |mut left, mut right| {
        if !conversions::try_enum_number_convert(&mut left, &mut right) {
            conversions::try_enum_string_convert(&mut left, &mut right, true)?;
        }
        Ok(Expr::binary(op, left, right)?)
    }
}

fn logical(op: BinaryOp) -> impl Fn(Expr, Expr) -> Result<Expr, ExprError> + Send + Sync {
    move |mut left, mut right| {
        conversions::try_boolean(&mut left);
        conversions::try_boolean(&mut right);
        Expr::binary(op, left, right)
    }
}

fn call(function: Function) -> Overload {
    let parameters = function.parameters().to_vec();
    Overload::fixed(parameters, move |args| Expr::call(function.clone(), args))
}

/// A function over `arity` string arguments. Null arguments yield null.
fn string_function(
    name: &str,
    pattern: &str,
    arity: usize,
    returns: ValueType,
    body: fn(&[&str]) -> Result<Value, BoxError>,
) -> Rule {
    let function_name = name.trim_start_matches("FN_").to_lowercase();
    let function = Function::new(
        &function_name,
        vec![ValueType::STRING; arity],
        returns.nullable(),
        move |args: &[Value]| -> Result<Value, BoxError> {
            if args.iter().any(Value::is_null) {
                return Ok(Value::Null);
            }
            let strings = args
                .iter()
                .map(|arg| arg.as_str().ok_or("expected a string"))
                .collect::<Result<Vec<_>, _>>()?;
            body(&strings)
        },
    );
    Rule::function_overloads(name, pattern, vec![call(function)])
}

/// A date-part function over dates with or without an offset. Offsets read
/// their local components. Null arguments yield null.
fn date_part(name: &str, pattern: &str, part: fn(&NaiveDateTime) -> i32) -> Rule {
    let function_name = name.trim_start_matches("FN_").to_lowercase();
    let overload = |parameter: ValueType| {
        call(Function::new(
            &function_name,
            vec![parameter.nullable()],
            ValueType::INT.nullable(),
            move |args: &[Value]| -> Result<Value, BoxError> {
                let moment = match args.first() {
                    Some(Value::DateTime(moment)) => *moment,
                    Some(Value::DateTimeOffset(moment)) => moment.naive_local(),
                    Some(Value::Null) => return Ok(Value::Null),
                    _ => return Err("expected a date and time".into()),
                };
                Ok(Value::from(part(&moment)))
            },
        ))
    };
    Rule::function_overloads(
        name,
        pattern,
        vec![
            overload(ValueType::DATETIME),
            overload(ValueType::DATETIMEOFFSET),
        ],
    )
}

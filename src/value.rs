//! Runtime values produced by evaluating expression trees.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use thiserror::Error;
use uuid::Uuid;

use crate::types::{EnumType, NumericKind, RecordType, ValueType};

/// Failures converting or parsing values outside an evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("`{text}` is not a valid {kind}")]
    InvalidNumber { text: String, kind: NumericKind },
    #[error("{value} does not fit in {kind}")]
    OutOfRange { value: String, kind: NumericKind },
    #[error("expected {expected}, found {found}")]
    Mismatch { expected: String, found: String },
    #[error("`{text}` is not a valid {ty}")]
    InvalidLiteral { text: String, ty: &'static str },
    #[error("record `{record}` has {expected} fields, {actual} values given")]
    FieldCount {
        record: String,
        expected: usize,
        actual: usize,
    },
}

// =============================================================================
// NUMBERS
// =============================================================================

/// A number tagged with its exact representation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    SByte(i8),
    Byte(u8),
    Short(i16),
    UShort(u16),
    Int(i32),
    UInt(u32),
    Long(i64),
    ULong(u64),
    Char(char),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
}

/// A lossless-enough common representation used for conversions and comparisons.
#[derive(Debug, Clone, Copy)]
enum Wide {
    Integral(i128),
    Float(f64),
    Decimal(Decimal),
}

impl Number {
    pub fn kind(&self) -> NumericKind {
        match self {
            Number::SByte(_) => NumericKind::SByte,
            Number::Byte(_) => NumericKind::Byte,
            Number::Short(_) => NumericKind::Short,
            Number::UShort(_) => NumericKind::UShort,
            Number::Int(_) => NumericKind::Int,
            Number::UInt(_) => NumericKind::UInt,
            Number::Long(_) => NumericKind::Long,
            Number::ULong(_) => NumericKind::ULong,
            Number::Char(_) => NumericKind::Char,
            Number::Float(_) => NumericKind::Float,
            Number::Double(_) => NumericKind::Double,
            Number::Decimal(_) => NumericKind::Decimal,
        }
    }

    fn wide(self) -> Wide {
        match self {
            Number::SByte(v) => Wide::Integral(v.into()),
            Number::Byte(v) => Wide::Integral(v.into()),
            Number::Short(v) => Wide::Integral(v.into()),
            Number::UShort(v) => Wide::Integral(v.into()),
            Number::Int(v) => Wide::Integral(v.into()),
            Number::UInt(v) => Wide::Integral(v.into()),
            Number::Long(v) => Wide::Integral(v.into()),
            Number::ULong(v) => Wide::Integral(v.into()),
            Number::Char(v) => Wide::Integral(u32::from(v).into()),
            Number::Float(v) => Wide::Float(v.into()),
            Number::Double(v) => Wide::Float(v),
            Number::Decimal(v) => Wide::Decimal(v),
        }
    }

    /// Converts to `kind`, failing when the value does not fit.
    ///
    /// Floating values converted to integral kinds truncate toward zero.
    pub fn convert(self, kind: NumericKind) -> Result<Number, ValueError> {
        if self.kind() == kind {
            return Ok(self);
        }
        let out_of_range = || ValueError::OutOfRange {
            value: self.to_string(),
            kind,
        };
        let wide = self.wide();
        let number = match kind {
            NumericKind::Float => Number::Float(match wide {
                Wide::Integral(v) => v as f32,
                Wide::Float(v) => v as f32,
                Wide::Decimal(v) => v.to_f32().ok_or_else(out_of_range)?,
            }),
            NumericKind::Double => Number::Double(match wide {
                Wide::Integral(v) => v as f64,
                Wide::Float(v) => v,
                Wide::Decimal(v) => v.to_f64().ok_or_else(out_of_range)?,
            }),
            NumericKind::Decimal => Number::Decimal(match wide {
                Wide::Integral(v) => Decimal::from_i128(v).ok_or_else(out_of_range)?,
                Wide::Float(v) => Decimal::from_f64(v).ok_or_else(out_of_range)?,
                Wide::Decimal(v) => v,
            }),
            integral => {
                let value: i128 = match wide {
                    Wide::Integral(v) => v,
                    Wide::Float(v) if v.is_finite() && v.abs() < 1e38 => v.trunc() as i128,
                    Wide::Float(_) => return Err(out_of_range()),
                    Wide::Decimal(v) => v.trunc().to_i128().ok_or_else(out_of_range)?,
                };
                Number::from_integral(value, integral).ok_or_else(out_of_range)?
            }
        };
        Ok(number)
    }

    /// Builds an integral number of `kind`, or `None` when out of range.
    pub fn from_integral(value: i128, kind: NumericKind) -> Option<Number> {
        Some(match kind {
            NumericKind::SByte => Number::SByte(value.try_into().ok()?),
            NumericKind::Byte => Number::Byte(value.try_into().ok()?),
            NumericKind::Short => Number::Short(value.try_into().ok()?),
            NumericKind::UShort => Number::UShort(value.try_into().ok()?),
            NumericKind::Int => Number::Int(value.try_into().ok()?),
            NumericKind::UInt => Number::UInt(value.try_into().ok()?),
            NumericKind::Long => Number::Long(value.try_into().ok()?),
            NumericKind::ULong => Number::ULong(value.try_into().ok()?),
            NumericKind::Char => Number::Char(char::from_u32(value.try_into().ok()?)?),
            _ => return None,
        })
    }

    /// The integral value, if this is an integral kind.
    pub fn as_i128(&self) -> Option<i128> {
        match self.wide() {
            Wide::Integral(v) => Some(v),
            _ => None,
        }
    }

    pub fn to_f64(&self) -> f64 {
        match self.wide() {
            Wide::Integral(v) => v as f64,
            Wide::Float(v) => v,
            Wide::Decimal(v) => v.to_f64().unwrap_or(f64::NAN),
        }
    }

    /// Parses `text` as a literal of `kind`.
    pub fn parse(text: &str, kind: NumericKind) -> Result<Number, ValueError> {
        let invalid = || ValueError::InvalidNumber {
            text: text.to_string(),
            kind,
        };
        let number = match kind {
            NumericKind::SByte => Number::SByte(text.parse().map_err(|_| invalid())?),
            NumericKind::Byte => Number::Byte(text.parse().map_err(|_| invalid())?),
            NumericKind::Short => Number::Short(text.parse().map_err(|_| invalid())?),
            NumericKind::UShort => Number::UShort(text.parse().map_err(|_| invalid())?),
            NumericKind::Int => Number::Int(text.parse().map_err(|_| invalid())?),
            NumericKind::UInt => Number::UInt(text.parse().map_err(|_| invalid())?),
            NumericKind::Long => Number::Long(text.parse().map_err(|_| invalid())?),
            NumericKind::ULong => Number::ULong(text.parse().map_err(|_| invalid())?),
            NumericKind::Char => Number::Char(text.parse().map_err(|_| invalid())?),
            NumericKind::Float => Number::Float(text.parse().map_err(|_| invalid())?),
            NumericKind::Double => Number::Double(text.parse().map_err(|_| invalid())?),
            NumericKind::Decimal => Number::Decimal(text.parse().map_err(|_| invalid())?),
        };
        Ok(number)
    }
}

impl PartialOrd for Number {
    /// Compares across kinds through a common representation.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.wide(), other.wide()) {
            (Wide::Integral(a), Wide::Integral(b)) => Some(a.cmp(&b)),
            (Wide::Decimal(a), Wide::Decimal(b)) => Some(a.cmp(&b)),
            (Wide::Decimal(a), Wide::Integral(b)) => Decimal::from_i128(b).map(|b| a.cmp(&b)),
            (Wide::Integral(a), Wide::Decimal(b)) => Decimal::from_i128(a).map(|a| a.cmp(&b)),
            _ => self.to_f64().partial_cmp(&other.to_f64()),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::SByte(v) => write!(f, "{v}"),
            Number::Byte(v) => write!(f, "{v}"),
            Number::Short(v) => write!(f, "{v}"),
            Number::UShort(v) => write!(f, "{v}"),
            Number::Int(v) => write!(f, "{v}"),
            Number::UInt(v) => write!(f, "{v}"),
            Number::Long(v) => write!(f, "{v}"),
            Number::ULong(v) => write!(f, "{v}"),
            Number::Char(v) => write!(f, "{v:?}"),
            Number::Float(v) => write!(f, "{v}"),
            Number::Double(v) => write!(f, "{v}"),
            Number::Decimal(v) => write!(f, "{}", v.normalize()),
        }
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Number::SByte(v) => serializer.serialize_i8(*v),
            Number::Byte(v) => serializer.serialize_u8(*v),
            Number::Short(v) => serializer.serialize_i16(*v),
            Number::UShort(v) => serializer.serialize_u16(*v),
            Number::Int(v) => serializer.serialize_i32(*v),
            Number::UInt(v) => serializer.serialize_u32(*v),
            Number::Long(v) => serializer.serialize_i64(*v),
            Number::ULong(v) => serializer.serialize_u64(*v),
            Number::Char(v) => serializer.serialize_char(*v),
            Number::Float(v) => serializer.serialize_f32(*v),
            Number::Double(v) => serializer.serialize_f64(*v),
            Number::Decimal(v) => Serialize::serialize(&v.normalize(), serializer),
        }
    }
}

// =============================================================================
// DATES, TIMES AND GUIDS
// =============================================================================

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

fn invalid(text: &str, ty: &'static str) -> ValueError {
    ValueError::InvalidLiteral {
        text: text.to_string(),
        ty,
    }
}

/// Parses a date and time without an offset. A bare date reads as midnight.
pub fn parse_datetime(text: &str) -> Result<NaiveDateTime, ValueError> {
    let text = text.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| invalid(text, "datetime"))
}

/// Parses an RFC 3339 timestamp; a space may stand in for the `T`.
pub fn parse_datetime_offset(text: &str) -> Result<DateTime<FixedOffset>, ValueError> {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text)
        .or_else(|_| DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z"))
        .map_err(|_| invalid(text, "datetimeoffset"))
}

pub fn parse_guid(text: &str) -> Result<Uuid, ValueError> {
    Uuid::parse_str(text.trim()).map_err(|_| invalid(text, "guid"))
}

// =============================================================================
// RECORDS
// =============================================================================

/// A record value laid out by its schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    ty: Arc<RecordType>,
    fields: Vec<Value>,
}

impl Record {
    pub fn new(ty: Arc<RecordType>, fields: Vec<Value>) -> Result<Self, ValueError> {
        if ty.fields().len() != fields.len() {
            return Err(ValueError::FieldCount {
                record: ty.name().to_string(),
                expected: ty.fields().len(),
                actual: fields.len(),
            });
        }
        Ok(Self { ty, fields })
    }

    /// Builds a record from named values; fields left out are null.
    pub fn from_pairs<I, S>(ty: Arc<RecordType>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: AsRef<str>,
    {
        let mut fields = vec![Value::Null; ty.fields().len()];
        for (name, value) in pairs {
            if let Some((index, _, _)) = ty.field(name.as_ref()) {
                fields[index] = value;
            }
        }
        Self { ty, fields }
    }

    pub fn ty(&self) -> &Arc<RecordType> {
        &self.ty
    }

    pub fn field(&self, index: usize) -> Option<&Value> {
        self.fields.get(index)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.ty
            .field(name)
            .and_then(|(index, _, _)| self.fields.get(index))
    }
}

// =============================================================================
// VALUES
// =============================================================================

/// The result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
    Guid(Uuid),
    Enum { ty: Arc<EnumType>, value: i64 },
    Record(Record),
    List(Vec<Value>),
}

impl Value {
    /// The most specific static type describing this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::Number(number) => ValueType::Number(number.kind()),
            Value::String(_) => ValueType::String,
            Value::DateTime(_) => ValueType::DateTime,
            Value::DateTimeOffset(_) => ValueType::DateTimeOffset,
            Value::Guid(_) => ValueType::Guid,
            Value::Enum { ty, .. } => ValueType::Enum(Arc::clone(ty)),
            Value::Record(record) => ValueType::Record(Arc::clone(record.ty())),
            Value::List(items) => ValueType::collection_of(
                items
                    .iter()
                    .find(|item| !item.is_null())
                    .map_or(ValueType::Null, Value::value_type),
            ),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Converts a JSON value to a value of the given type.
    pub fn from_json(json: &serde_json::Value, ty: &ValueType) -> Result<Value, ValueError> {
        use serde_json::Value as Json;

        let mismatch = || ValueError::Mismatch {
            expected: ty.to_string(),
            found: json.to_string(),
        };
        if json.is_null() {
            return if ty.accepts_null() {
                Ok(Value::Null)
            } else {
                Err(mismatch())
            };
        }
        match (ty.underlying(), json) {
            (ValueType::Bool, Json::Bool(b)) => Ok(Value::Bool(*b)),
            (ValueType::String, Json::String(s)) => Ok(Value::String(s.clone())),
            (ValueType::DateTime, Json::String(s)) => parse_datetime(s).map(Value::DateTime),
            (ValueType::DateTimeOffset, Json::String(s)) => {
                parse_datetime_offset(s).map(Value::DateTimeOffset)
            }
            (ValueType::Guid, Json::String(s)) => parse_guid(s).map(Value::Guid),
            (ValueType::Number(kind), Json::Number(n)) => {
                let number = match (n.as_i64(), n.as_u64()) {
                    (Some(i), _) => Number::Long(i),
                    (None, Some(u)) => Number::ULong(u),
                    _ => Number::parse(&n.to_string(), NumericKind::Decimal)
                        .or_else(|_| n.as_f64().map(Number::Double).ok_or_else(mismatch))?,
                };
                Ok(Value::Number(number.convert(*kind)?))
            }
            (ValueType::Enum(descriptor), Json::String(s)) => descriptor
                .parse(s, true)
                .map(|value| Value::Enum {
                    ty: Arc::clone(descriptor),
                    value,
                })
                .ok_or_else(mismatch),
            (ValueType::Enum(descriptor), Json::Number(n)) => n
                .as_i64()
                .map(|value| Value::Enum {
                    ty: Arc::clone(descriptor),
                    value,
                })
                .ok_or_else(mismatch),
            (ValueType::Collection(element), Json::Array(items)) => items
                .iter()
                .map(|item| Value::from_json(item, element))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            (ValueType::Record(record), Json::Object(map)) => {
                let fields = record
                    .fields()
                    .iter()
                    .map(|(name, field_ty)| match map.get(name) {
                        Some(field) => Value::from_json(field, field_ty),
                        None if field_ty.accepts_null() => Ok(Value::Null),
                        None => Err(mismatch()),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Record::new(Arc::clone(record), fields).map(Value::Record)
            }
            _ => Err(mismatch()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Number> for Value {
    fn from(value: Number) -> Self {
        Value::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::DateTime(value)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Value::DateTimeOffset(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Value::Guid(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(Number::Int(value))
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Number(Number::Decimal(value))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            Value::DateTime(moment) => {
                write!(f, "datetime'{}'", moment.format("%Y-%m-%dT%H:%M:%S%.f"))
            }
            Value::DateTimeOffset(moment) => write!(f, "datetimeoffset'{}'", moment.to_rfc3339()),
            Value::Guid(guid) => write!(f, "guid'{guid}'"),
            Value::Enum { ty, value } => match ty.symbol_of(*value) {
                Some(symbol) => write!(f, "{}.{symbol}", ty.name()),
                None => write!(f, "{}({value})", ty.name()),
            },
            Value::Record(record) => {
                write!(f, "{} {{", record.ty().name())?;
                for (i, ((name, _), value)) in record
                    .ty()
                    .fields()
                    .iter()
                    .zip(&record.fields)
                    .enumerate()
                {
                    let sep = if i == 0 { " " } else { ", " };
                    write!(f, "{sep}{name}: {value}")?;
                }
                f.write_str(" }")
            }
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::DateTime(moment) => Serialize::serialize(moment, serializer),
            Value::DateTimeOffset(moment) => Serialize::serialize(moment, serializer),
            Value::Guid(guid) => Serialize::serialize(guid, serializer),
            Value::Enum { ty, value } => match ty.symbol_of(*value) {
                Some(symbol) => serializer.serialize_str(symbol),
                None => serializer.serialize_i64(*value),
            },
            Value::Record(record) => {
                let mut map = serializer.serialize_map(Some(record.fields.len()))?;
                for ((name, _), value) in record.ty().fields().iter().zip(&record.fields) {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrowing_checks_range() {
        assert_eq!(
            Number::Int(300).convert(NumericKind::Byte),
            Err(ValueError::OutOfRange {
                value: "300".into(),
                kind: NumericKind::Byte
            })
        );
        assert_eq!(
            Number::Int(200).convert(NumericKind::Byte),
            Ok(Number::Byte(200))
        );
    }

    #[test]
    fn widening_to_decimal_is_exact() {
        let widened = Number::Long(12).convert(NumericKind::Decimal).unwrap();
        assert_eq!(widened, Number::Decimal(Decimal::from(12)));
    }

    #[test]
    fn decimals_serialize_normalized() {
        let json = serde_json::to_value(Number::Decimal(Decimal::new(250, 2))).unwrap();
        assert_eq!(json, serde_json::json!("2.5"));
        let json = serde_json::to_value(Value::from(Decimal::new(1200, 2))).unwrap();
        assert_eq!(json, serde_json::json!("12"));
    }

    #[test]
    fn temporal_literals_accept_the_common_forms() {
        let midnight = parse_datetime("2020-01-31").unwrap();
        assert_eq!(midnight, parse_datetime("2020-01-31T00:00:00").unwrap());
        assert_eq!(
            parse_datetime("2020-01-31 10:30").unwrap(),
            parse_datetime("2020-01-31T10:30:00.000").unwrap()
        );
        assert!(matches!(
            parse_datetime("31/01/2020"),
            Err(ValueError::InvalidLiteral { ty: "datetime", .. })
        ));

        let utc = parse_datetime_offset("2020-01-31T08:00:00Z").unwrap();
        let plus_two = parse_datetime_offset("2020-01-31 10:00:00+02:00").unwrap();
        assert_eq!(Value::from(utc), Value::from(plus_two));
        assert!(parse_guid("not-a-guid").is_err());
    }

    #[test]
    fn temporal_values_serialize_as_strings() {
        let moment = parse_datetime("2020-01-31T10:30:00").unwrap();
        assert_eq!(
            serde_json::to_value(Value::from(moment)).unwrap(),
            serde_json::json!("2020-01-31T10:30:00")
        );
        assert_eq!(Value::from(moment).to_string(), "datetime'2020-01-31T10:30:00'");
        let guid = parse_guid("12345678-aaaa-bbbb-cccc-1234567890ab").unwrap();
        assert_eq!(
            serde_json::to_value(Value::from(guid)).unwrap(),
            serde_json::json!("12345678-aaaa-bbbb-cccc-1234567890ab")
        );
    }

    #[test]
    fn numbers_compare_across_kinds() {
        assert!(Number::Int(2) < Number::Decimal(Decimal::new(25, 1)));
        assert!(Number::Double(2.5) > Number::Long(2));
    }

    #[test]
    fn json_objects_follow_the_schema() {
        let ty = Arc::new(
            RecordType::new(
                "Row",
                [
                    ("name", ValueType::STRING),
                    ("age", ValueType::INT.nullable()),
                ],
            )
            .unwrap(),
        );
        let json = serde_json::json!({ "name": "ada" });
        let value = Value::from_json(&json, &ValueType::Record(Arc::clone(&ty))).unwrap();
        let Value::Record(record) = value else {
            panic!("expected a record");
        };
        assert_eq!(record.get("NAME"), Some(&Value::from("ada")));
        assert_eq!(record.get("age"), Some(&Value::Null));
    }
}

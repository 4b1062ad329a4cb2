//! Static types of expression nodes.
//!
//! Types are described by explicit schemas: numeric kinds, enum descriptors
//! with their symbol tables, and record schemas listing typed fields. There
//! is no runtime introspection; a host registers the shapes it wants the
//! languages to see.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// NUMERIC KINDS
// =============================================================================

/// Every numeric representation the conversion lattice knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericKind {
    SByte,
    Byte,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    Char,
    Float,
    Double,
    Decimal,
}

use NumericKind::*;

impl NumericKind {
    pub const ALL: [NumericKind; 12] = [
        SByte, Byte, Short, UShort, Int, UInt, Long, ULong, Char, Float, Double, Decimal,
    ];

    /// The kinds this kind may implicitly widen to, itself first.
    ///
    /// All lists share one global ordering, which keeps the first common
    /// entry of any two lists the same whichever side is scanned.
    pub fn widenings(self) -> &'static [NumericKind] {
        match self {
            SByte => &[SByte, Short, Int, Long, Float, Double, Decimal],
            Byte => &[
                Byte, Short, UShort, Int, UInt, Long, ULong, Float, Double, Decimal,
            ],
            Short => &[Short, Int, Long, Float, Double, Decimal],
            UShort => &[UShort, Int, UInt, Long, ULong, Float, Double, Decimal],
            Int => &[Int, Long, Float, Double, Decimal],
            UInt => &[UInt, Long, ULong, Float, Double, Decimal],
            Long => &[Long, Float, Double, Decimal],
            Char => &[Char, UShort, Int, UInt, Long, ULong, Float, Double, Decimal],
            Float => &[Float, Double, Decimal],
            ULong => &[ULong, Float, Double, Decimal],
            Double => &[Double, Decimal],
            Decimal => &[Decimal],
        }
    }

    pub fn can_widen_to(self, target: NumericKind) -> bool {
        self.widenings().contains(&target)
    }

    /// Integral kinds that may back an enum or be reinterpreted as one.
    pub fn is_enum_compatible(self) -> bool {
        matches!(self, Byte | SByte | Short | UShort | Int | UInt | Long | ULong)
    }

    pub fn is_integral(self) -> bool {
        !matches!(self, Float | Double | Decimal)
    }

    pub fn is_unsigned(self) -> bool {
        matches!(self, Byte | UShort | UInt | ULong | Char)
    }

    /// Kinds that support arithmetic operators.
    pub fn is_arithmetic(self) -> bool {
        self != Char
    }

    pub fn name(self) -> &'static str {
        match self {
            SByte => "sbyte",
            Byte => "byte",
            Short => "short",
            UShort => "ushort",
            Int => "int",
            UInt => "uint",
            Long => "long",
            ULong => "ulong",
            Char => "char",
            Float => "float",
            Double => "double",
            Decimal => "decimal",
        }
    }
}

impl fmt::Display for NumericKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// SCHEMAS
// =============================================================================

/// Errors raised while declaring enum or record schemas.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("enum `{name}` cannot be backed by {kind}; use an integral kind")]
    EnumUnderlying { name: String, kind: NumericKind },
    #[error("`{owner}` declares `{member}` more than once")]
    DuplicateMember { owner: String, member: String },
}

/// An enum descriptor: a name, an integral representation and a symbol table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumType {
    name: String,
    underlying: NumericKind,
    members: Vec<(String, i64)>,
}

impl EnumType {
    pub fn new<I, S>(
        name: impl Into<String>,
        underlying: NumericKind,
        members: I,
    ) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        let name = name.into();
        if !underlying.is_enum_compatible() {
            return Err(SchemaError::EnumUnderlying {
                name,
                kind: underlying,
            });
        }
        let mut table: Vec<(String, i64)> = Vec::new();
        for (symbol, value) in members {
            let symbol = symbol.into();
            if table.iter().any(|(existing, _)| *existing == symbol) {
                return Err(SchemaError::DuplicateMember {
                    owner: name,
                    member: symbol,
                });
            }
            table.push((symbol, value));
        }
        Ok(Self {
            name,
            underlying,
            members: table,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn underlying(&self) -> NumericKind {
        self.underlying
    }

    pub fn members(&self) -> &[(String, i64)] {
        &self.members
    }

    /// Looks a symbol up; surrounding whitespace is ignored.
    pub fn parse(&self, symbol: &str, ignore_case: bool) -> Option<i64> {
        let symbol = symbol.trim();
        self.members
            .iter()
            .find(|(name, _)| {
                if ignore_case {
                    name.eq_ignore_ascii_case(symbol)
                } else {
                    name == symbol
                }
            })
            .map(|(_, value)| *value)
    }

    pub fn symbol_of(&self, value: i64) -> Option<&str> {
        self.members
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(name, _)| name.as_str())
    }
}

/// A record schema: the field accessor table for one bound-parameter type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordType {
    name: String,
    fields: Vec<(String, ValueType)>,
}

impl RecordType {
    pub fn new<I, S>(name: impl Into<String>, fields: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (S, ValueType)>,
        S: Into<String>,
    {
        let name = name.into();
        let mut table: Vec<(String, ValueType)> = Vec::new();
        for (field, ty) in fields {
            let field = field.into();
            if table.iter().any(|(existing, _)| *existing == field) {
                return Err(SchemaError::DuplicateMember {
                    owner: name,
                    member: field,
                });
            }
            table.push((field, ty));
        }
        Ok(Self {
            name,
            fields: table,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[(String, ValueType)] {
        &self.fields
    }

    /// Resolves a field by exact name, falling back to a case-insensitive match.
    pub fn field(&self, name: &str) -> Option<(usize, &str, &ValueType)> {
        self.fields
            .iter()
            .position(|(field, _)| field == name)
            .or_else(|| {
                self.fields
                    .iter()
                    .position(|(field, _)| field.eq_ignore_ascii_case(name))
            })
            .map(|index| {
                let (field, ty) = &self.fields[index];
                (index, field.as_str(), ty)
            })
    }
}

// =============================================================================
// VALUE TYPES
// =============================================================================

/// The static type of an expression node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// The type of the bare `null` literal.
    Null,
    Bool,
    Number(NumericKind),
    String,
    /// A date and time without an offset.
    DateTime,
    /// A date and time with a fixed UTC offset.
    DateTimeOffset,
    Guid,
    Enum(Arc<EnumType>),
    Record(Arc<RecordType>),
    Collection(Box<ValueType>),
    Nullable(Box<ValueType>),
}

impl ValueType {
    pub const BOOL: ValueType = ValueType::Bool;
    pub const STRING: ValueType = ValueType::String;
    pub const INT: ValueType = ValueType::Number(NumericKind::Int);
    pub const LONG: ValueType = ValueType::Number(NumericKind::Long);
    pub const DOUBLE: ValueType = ValueType::Number(NumericKind::Double);
    pub const DECIMAL: ValueType = ValueType::Number(NumericKind::Decimal);
    pub const DATETIME: ValueType = ValueType::DateTime;
    pub const DATETIMEOFFSET: ValueType = ValueType::DateTimeOffset;
    pub const GUID: ValueType = ValueType::Guid;

    pub fn collection_of(element: ValueType) -> ValueType {
        ValueType::Collection(Box::new(element))
    }

    /// The nullable form of this type. Types that already admit null are returned as-is.
    pub fn nullable(self) -> ValueType {
        if self.accepts_null() {
            self
        } else {
            ValueType::Nullable(Box::new(self))
        }
    }

    /// The type with any nullable wrapper removed.
    pub fn underlying(&self) -> &ValueType {
        match self {
            ValueType::Nullable(inner) => inner,
            other => other,
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, ValueType::Nullable(_))
    }

    /// Reference-like types admit null without a wrapper.
    pub fn is_reference_like(&self) -> bool {
        matches!(
            self,
            ValueType::Null | ValueType::String | ValueType::Record(_) | ValueType::Collection(_)
        )
    }

    pub fn accepts_null(&self) -> bool {
        self.is_nullable() || self.is_reference_like()
    }

    pub fn numeric_kind(&self) -> Option<NumericKind> {
        match self.underlying() {
            ValueType::Number(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn enum_type(&self) -> Option<&Arc<EnumType>> {
        match self.underlying() {
            ValueType::Enum(descriptor) => Some(descriptor),
            _ => None,
        }
    }

    pub fn record_type(&self) -> Option<&Arc<RecordType>> {
        match self.underlying() {
            ValueType::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn element(&self) -> Option<&ValueType> {
        match self.underlying() {
            ValueType::Collection(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_bool(&self) -> bool {
        *self == ValueType::Bool
    }

    /// Dates and times, with or without an offset. Both support ordering.
    pub fn is_temporal(&self) -> bool {
        matches!(
            self.underlying(),
            ValueType::DateTime | ValueType::DateTimeOffset
        )
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Null => f.write_str("null"),
            ValueType::Bool => f.write_str("bool"),
            ValueType::Number(kind) => write!(f, "{kind}"),
            ValueType::String => f.write_str("string"),
            ValueType::DateTime => f.write_str("datetime"),
            ValueType::DateTimeOffset => f.write_str("datetimeoffset"),
            ValueType::Guid => f.write_str("guid"),
            ValueType::Enum(descriptor) => f.write_str(descriptor.name()),
            ValueType::Record(record) => f.write_str(record.name()),
            ValueType::Collection(element) => write!(f, "collection<{element}>"),
            ValueType::Nullable(inner) => write!(f, "{inner}?"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_widens_to_itself_first() {
        for kind in NumericKind::ALL {
            assert_eq!(kind.widenings()[0], kind);
        }
    }

    #[test]
    fn enums_need_integral_backing() {
        let err = EnumType::new("Bad", NumericKind::Double, [("A", 1)]).unwrap_err();
        assert!(matches!(err, SchemaError::EnumUnderlying { .. }));
    }

    #[test]
    fn enum_parse_honours_case_flag() {
        let numbers = EnumType::new("Numbers", NumericKind::Int, [("One", 1), ("Two", 2)]).unwrap();
        assert_eq!(numbers.parse("tWo", true), Some(2));
        assert_eq!(numbers.parse("tWo", false), None);
        assert_eq!(numbers.symbol_of(1), Some("One"));
    }

    #[test]
    fn nullable_is_idempotent_and_skips_reference_types() {
        let int = ValueType::INT.nullable();
        assert_eq!(int.clone().nullable(), int);
        assert_eq!(ValueType::STRING.nullable(), ValueType::STRING);
        assert_eq!(int.to_string(), "int?");
        assert_eq!(ValueType::GUID.nullable().to_string(), "guid?");
        assert!(ValueType::DATETIMEOFFSET.nullable().is_temporal());
    }

    #[test]
    fn record_fields_resolve_case_insensitively() {
        let record = RecordType::new(
            "Row",
            [("Order", ValueType::BOOL), ("order", ValueType::INT)],
        )
        .unwrap();
        assert_eq!(record.field("order").unwrap().0, 1);
        assert_eq!(record.field("ORDER").unwrap().0, 0);
        assert!(record.field("missing").is_none());
    }
}

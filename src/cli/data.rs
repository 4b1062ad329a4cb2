//! Loads JSON record files for the `filter` and `tree` commands.
//!
//! The schema is inferred from the data: every object in the top-level array
//! contributes its fields, and a field that is missing or `null` in some rows
//! becomes nullable. Integers load as `long`, other numbers as `decimal`.
//! Strings holding RFC 3339 timestamps load as `datetimeoffset`, timestamps
//! without an offset as `datetime` and hyphenated uuids as `guid`, as long
//! as every row agrees.

use std::sync::Arc;

use thiserror::Error;

use crate::types::{RecordType, SchemaError, ValueType};
use crate::value::{self, Record, Value, ValueError};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("expected a JSON array of objects")]
    NotRows,
    #[error("field `{field}` holds both {first} and {second} values")]
    Conflict {
        field: String,
        first: &'static str,
        second: &'static str,
    },
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Value(#[from] ValueError),
}

/// A loaded data set: its inferred schema and one record per row.
#[derive(Debug)]
pub struct Rows {
    pub schema: Arc<RecordType>,
    pub records: Vec<Record>,
}

pub fn load(json: &serde_json::Value) -> Result<Rows, DataError> {
    let serde_json::Value::Array(items) = json else {
        return Err(DataError::NotRows);
    };
    let mut shape: Option<Shape> = None;
    for item in items {
        if !item.is_object() {
            return Err(DataError::NotRows);
        }
        shape = Some(match shape {
            None => shape_of(item),
            Some(shape) => merge(shape, shape_of(item), "")?,
        });
    }
    let shape = shape.unwrap_or(Shape::Object(Vec::new()));
    let ValueType::Record(schema) = to_type(&shape, "Row")? else {
        return Err(DataError::NotRows);
    };
    let ty = ValueType::Record(Arc::clone(&schema));
    let records = items
        .iter()
        .map(|item| match Value::from_json(item, &ty)? {
            Value::Record(record) => Ok(record),
            _ => Err(DataError::NotRows),
        })
        .collect::<Result<_, _>>()?;
    Ok(Rows { schema, records })
}

// ============================================================================
// SHAPE INFERENCE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Shape {
    /// The element of an empty array: no information yet.
    Unknown,
    Null,
    Bool,
    Integer,
    Decimal,
    String,
    DateTime,
    DateTimeOffset,
    Guid,
    List(Box<Shape>),
    Object(Vec<(String, Shape)>),
    Optional(Box<Shape>),
}

impl Shape {
    fn describe(&self) -> &'static str {
        match self {
            Shape::Unknown | Shape::Null => "null",
            Shape::Bool => "boolean",
            Shape::Integer | Shape::Decimal => "number",
            Shape::String | Shape::DateTime | Shape::DateTimeOffset | Shape::Guid => "string",
            Shape::List(_) => "array",
            Shape::Object(_) => "object",
            Shape::Optional(inner) => inner.describe(),
        }
    }

    /// Shapes loaded from JSON strings.
    fn is_text(&self) -> bool {
        matches!(
            self,
            Shape::String | Shape::DateTime | Shape::DateTimeOffset | Shape::Guid
        )
    }

    fn optional(self) -> Shape {
        match self {
            Shape::Unknown | Shape::Null | Shape::Optional(_) => self,
            other => Shape::Optional(Box::new(other)),
        }
    }
}

fn shape_of(json: &serde_json::Value) -> Shape {
    use serde_json::Value as Json;
    match json {
        Json::Null => Shape::Null,
        Json::Bool(_) => Shape::Bool,
        Json::Number(n) if n.is_i64() || n.is_u64() => Shape::Integer,
        Json::Number(_) => Shape::Decimal,
        Json::String(text) => string_shape(text),
        Json::Array(items) => Shape::List(Box::new(
            items
                .iter()
                .map(shape_of)
                .reduce(|acc, next| merge(acc.clone(), next, "").unwrap_or(acc))
                .unwrap_or(Shape::Unknown),
        )),
        Json::Object(map) => Shape::Object(
            map.iter()
                .map(|(name, value)| (name.clone(), shape_of(value)))
                .collect(),
        ),
    }
}

fn merge(a: Shape, b: Shape, field: &str) -> Result<Shape, DataError> {
    Ok(match (a, b) {
        (Shape::Unknown, other) | (other, Shape::Unknown) => other,
        (Shape::Null, other) | (other, Shape::Null) => other.optional(),
        (Shape::Optional(a), b) | (b, Shape::Optional(a)) => merge(*a, b, field)?.optional(),
        (Shape::Integer, Shape::Decimal) | (Shape::Decimal, Shape::Integer) => Shape::Decimal,
        (Shape::List(a), Shape::List(b)) => Shape::List(Box::new(merge(*a, *b, field)?)),
        (Shape::Object(mut fields), Shape::Object(other)) => {
            let mut seen = vec![false; fields.len()];
            for (name, shape) in other {
                let path = join(field, &name);
                match fields.iter().position(|(existing, _)| *existing == name) {
                    Some(index) => {
                        let current = std::mem::replace(&mut fields[index].1, Shape::Null);
                        fields[index].1 = merge(current, shape, &path)?;
                        seen[index] = true;
                    }
                    None => fields.push((name, shape.optional())),
                }
            }
            for (index, seen) in seen.into_iter().enumerate() {
                if !seen {
                    let current = std::mem::replace(&mut fields[index].1, Shape::Null);
                    fields[index].1 = current.optional();
                }
            }
            Shape::Object(fields)
        }
        (a, b) if a == b => a,
        (a, b) if a.is_text() && b.is_text() => Shape::String,
        (a, b) => {
            return Err(DataError::Conflict {
                field: field.to_string(),
                first: a.describe(),
                second: b.describe(),
            })
        }
    })
}

fn string_shape(text: &str) -> Shape {
    if chrono::DateTime::parse_from_rfc3339(text).is_ok() {
        Shape::DateTimeOffset
    } else if chrono::NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").is_ok() {
        Shape::DateTime
    } else if text.len() == 36 && value::parse_guid(text).is_ok() {
        Shape::Guid
    } else {
        Shape::String
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

fn to_type(shape: &Shape, name: &str) -> Result<ValueType, DataError> {
    Ok(match shape {
        Shape::Unknown | Shape::Null | Shape::String => ValueType::STRING,
        Shape::Bool => ValueType::BOOL,
        Shape::Integer => ValueType::LONG,
        Shape::DateTime => ValueType::DATETIME,
        Shape::DateTimeOffset => ValueType::DATETIMEOFFSET,
        Shape::Guid => ValueType::GUID,
        Shape::Decimal => ValueType::DECIMAL,
        Shape::List(element) => ValueType::collection_of(to_type(element, name)?),
        Shape::Object(fields) => {
            let fields = fields
                .iter()
                .map(|(field, shape)| Ok((field.clone(), to_type(shape, field)?)))
                .collect::<Result<Vec<_>, DataError>>()?;
            ValueType::Record(Arc::new(RecordType::new(name, fields)?))
        }
        Shape::Optional(inner) => to_type(inner, name)?.nullable(),
    })
}

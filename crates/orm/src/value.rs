//! Conversions between ``SeaQuery`` values and engine data types.
//!
//! Outbound values (statement parameters) are converted without regard to
//! the schema. Inbound values are decoded against the declared column kind,
//! since the engine reports booleans as integers and timestamps as text.

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, NaiveDateTime, Utc};
use sea_query::{Value, Values};

use crate::DataType;
use crate::error::Error;
use crate::field::FieldKind;

/// Types that can be extracted from a decoded column value.
pub trait FromValue: Sized {
    /// Convert a column value into `Self`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is null or of an incompatible type.
    fn from_value(value: Value) -> Result<Self>;
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::String(Some(v)) => Ok(*v),
            Value::Char(Some(ch)) => Ok(ch.to_string()),
            other => bail!("expected string value, found {}", describe(&other)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::TinyInt(Some(v)) => Ok(Self::from(v)),
            Value::SmallInt(Some(v)) => Ok(Self::from(v)),
            Value::Int(Some(v)) => Ok(Self::from(v)),
            Value::BigInt(Some(v)) => Ok(v),
            Value::TinyUnsigned(Some(v)) => Ok(Self::from(v)),
            Value::SmallUnsigned(Some(v)) => Ok(Self::from(v)),
            Value::Unsigned(Some(v)) => Ok(Self::from(v)),
            Value::BigUnsigned(Some(v)) => Ok(Self::try_from(v)?),
            other => bail!("expected integer value, found {}", describe(&other)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Result<Self> {
        let wide = i64::from_value(value)?;
        Self::try_from(wide).map_err(|_e| anyhow!("integer {wide} out of range for i32"))
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(Some(v)) => Ok(v),
            other => bail!("expected boolean value, found {}", describe(&other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Double(Some(v)) => Ok(v),
            Value::Float(Some(v)) => Ok(Self::from(v)),
            other => bail!("expected float value, found {}", describe(&other)),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::ChronoDateTimeUtc(Some(v)) => Ok(*v),
            Value::ChronoDateTime(Some(v)) => Ok(Self::from_naive_utc_and_offset(*v, Utc)),
            other => bail!("expected timestamp value, found {}", describe(&other)),
        }
    }
}

/// Returns `true` when the value is a typed SQL `NULL`.
#[must_use]
pub const fn is_null(value: &Value) -> bool {
    matches!(
        value,
        Value::Bool(None)
            | Value::TinyInt(None)
            | Value::SmallInt(None)
            | Value::Int(None)
            | Value::BigInt(None)
            | Value::TinyUnsigned(None)
            | Value::SmallUnsigned(None)
            | Value::Unsigned(None)
            | Value::BigUnsigned(None)
            | Value::Float(None)
            | Value::Double(None)
            | Value::String(None)
            | Value::Char(None)
            | Value::Bytes(None)
            | Value::ChronoDate(None)
            | Value::ChronoTime(None)
            | Value::ChronoDateTime(None)
            | Value::ChronoDateTimeUtc(None)
    )
}

/// The kind name used in type-check errors.
#[must_use]
pub const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Bool(_) => "boolean",
        Value::TinyInt(_)
        | Value::SmallInt(_)
        | Value::Int(_)
        | Value::BigInt(_)
        | Value::TinyUnsigned(_)
        | Value::SmallUnsigned(_)
        | Value::Unsigned(_)
        | Value::BigUnsigned(_) => "integer",
        Value::Float(_) | Value::Double(_) => "float",
        Value::String(_) | Value::Char(_) => "string",
        Value::Bytes(_) => "bytes",
        Value::ChronoDate(_) => "date",
        Value::ChronoTime(_) => "time",
        Value::ChronoDateTime(_) | Value::ChronoDateTimeUtc(_) => "timestamp",
        _ => "unknown",
    }
}

fn describe(value: &Value) -> &'static str {
    if is_null(value) { "null" } else { kind_of(value) }
}

// Outbound conversion
pub fn values_to_datatypes(values: Values) -> Result<Vec<DataType>> {
    values.into_iter().map(value_to_datatype).collect()
}

pub fn value_to_datatype(value: Value) -> Result<DataType> {
    let data_type = match value {
        Value::Bool(v) => DataType::Boolean(v),
        Value::TinyInt(v) => DataType::Int32(v.map(i32::from)),
        Value::SmallInt(v) => DataType::Int32(v.map(i32::from)),
        Value::Int(v) => DataType::Int32(v),
        Value::BigInt(v) => DataType::Int64(v),
        Value::TinyUnsigned(v) => DataType::Uint32(v.map(u32::from)),
        Value::SmallUnsigned(v) => DataType::Uint32(v.map(u32::from)),
        Value::Unsigned(v) => DataType::Uint32(v),
        Value::BigUnsigned(v) => DataType::Uint64(v),
        Value::Float(v) => DataType::Float(v),
        Value::Double(v) => DataType::Double(v),
        Value::String(v) => DataType::Str(v.map(|value| *value)),
        Value::Char(v) => DataType::Str(v.map(|ch| ch.to_string())),
        Value::Bytes(v) => DataType::Binary(v.map(|bytes| *bytes)),
        Value::ChronoDate(v) => DataType::Date(v.map(|date| date.to_string())),
        Value::ChronoTime(v) => DataType::Time(v.map(|time| time.to_string())),
        Value::ChronoDateTime(v) => DataType::Timestamp(v.map(|dt| dt.to_string())),
        Value::ChronoDateTimeUtc(v) => DataType::Timestamp(v.map(|dt| dt.to_rfc3339())),
        other => return Err(Error::UnsupportedValue(format!("{other:?}")).into()),
    };
    Ok(data_type)
}

// Inbound conversion
pub fn decode(kind: FieldKind, data: &DataType) -> Result<Value> {
    if data.is_null() {
        return Ok(kind.null());
    }

    let value = match kind {
        FieldKind::String { .. } => Value::String(Some(Box::new(as_string(data)?))),
        FieldKind::Integer => Value::BigInt(Some(as_i64(data)?)),
        FieldKind::Boolean => Value::Bool(Some(as_bool(data)?)),
        FieldKind::Float => Value::Double(Some(as_f64(data)?)),
        FieldKind::Timestamp => Value::ChronoDateTimeUtc(Some(Box::new(as_timestamp(data)?))),
    };
    Ok(value)
}

fn as_string(value: &DataType) -> Result<String> {
    match value {
        DataType::Str(Some(raw)) => Ok(raw.clone()),
        _ => bail!("expected string data type"),
    }
}

fn as_i64(value: &DataType) -> Result<i64> {
    match value {
        DataType::Int32(Some(v)) => Ok(i64::from(*v)),
        DataType::Int64(Some(v)) => Ok(*v),
        DataType::Uint32(Some(v)) => Ok(i64::from(*v)),
        DataType::Uint64(Some(v)) => Ok(i64::try_from(*v)?),
        _ => bail!("expected integer data type"),
    }
}

fn as_bool(value: &DataType) -> Result<bool> {
    match value {
        DataType::Boolean(Some(v)) => Ok(*v),
        DataType::Int32(Some(v)) => Ok(*v != 0),
        DataType::Int64(Some(v)) => Ok(*v != 0),
        _ => bail!("expected boolean data type"),
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_f64(value: &DataType) -> Result<f64> {
    match value {
        DataType::Float(Some(v)) => Ok(f64::from(*v)),
        DataType::Double(Some(v)) => Ok(*v),
        DataType::Int64(Some(v)) => Ok(*v as f64),
        DataType::Int32(Some(v)) => Ok(f64::from(*v)),
        _ => bail!("expected float data type"),
    }
}

fn as_timestamp(value: &DataType) -> Result<DateTime<Utc>> {
    match value {
        DataType::Timestamp(Some(raw)) | DataType::Str(Some(raw)) => {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
                return Ok(parsed.with_timezone(&Utc));
            }

            if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
                return Ok(DateTime::<Utc>::from_naive_utc_and_offset(parsed, Utc));
            }

            bail!(
                "unsupported timestamp: {raw}; expected RFC3339 or \"%Y-%m-%d %H:%M:%S%.f\" format"
            )
        }
        _ => bail!("expected timestamp data type"),
    }
}

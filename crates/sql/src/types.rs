//! Values exchanged with the engine.

use anyhow::{Result, anyhow};

/// A single, possibly null, value as stored by the engine.
#[derive(Clone, Debug, PartialEq)]
pub enum DataType {
    /// Boolean.
    Boolean(Option<bool>),
    /// 32-bit signed integer.
    Int32(Option<i32>),
    /// 64-bit signed integer.
    Int64(Option<i64>),
    /// 32-bit unsigned integer.
    Uint32(Option<u32>),
    /// 64-bit unsigned integer.
    Uint64(Option<u64>),
    /// Single precision float.
    Float(Option<f32>),
    /// Double precision float.
    Double(Option<f64>),
    /// UTF-8 text.
    Str(Option<String>),
    /// Raw bytes.
    Binary(Option<Vec<u8>>),
    /// Date formatted as `%Y-%m-%d`.
    Date(Option<String>),
    /// Time formatted as `%H:%M:%S%.f`.
    Time(Option<String>),
    /// Timestamp, RFC 3339 or `%Y-%m-%d %H:%M:%S%.f`.
    Timestamp(Option<String>),
}

impl DataType {
    /// Returns `true` when the value is SQL `NULL`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(
            self,
            Self::Boolean(None)
                | Self::Int32(None)
                | Self::Int64(None)
                | Self::Uint32(None)
                | Self::Uint64(None)
                | Self::Float(None)
                | Self::Double(None)
                | Self::Str(None)
                | Self::Binary(None)
                | Self::Date(None)
                | Self::Time(None)
                | Self::Timestamp(None)
        )
    }
}

/// A named value within a [`Row`].
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    /// Column name as reported by the engine.
    pub name: String,

    /// Column value.
    pub value: DataType,
}

/// A single result row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    /// Position of the row within its result set.
    pub index: String,

    /// Column values in projection order.
    pub fields: Vec<Field>,
}

impl Row {
    /// Look up a column value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DataType> {
        self.fields.iter().find(|field| field.name == name).map(|field| &field.value)
    }

    /// Look up a column value by name, failing when the column is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the row has no column called `name`.
    pub fn try_get(&self, name: &str) -> Result<&DataType> {
        self.get(name).ok_or_else(|| anyhow!("missing column '{name}'"))
    }
}

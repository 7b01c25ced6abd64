//! Field declarations.
//!
//! A model's attributes are declared with [`Field`] (one column) or
//! [`ReferenceField`] (a foreign key and its shadow columns). Declarations are
//! metadata only; the values live in the model's struct fields and cross the
//! boundary through [`FieldValue`].

use std::sync::Arc;

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use sea_query::Value;

use crate::model::Model;
use crate::schema::{Column, TableSchema};
use crate::value::{FromValue, is_null, kind_of};

/// Column type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// `VARCHAR`, optionally length limited.
    String {
        /// Maximum length, if any.
        length: Option<u32>,
    },
    /// Integer.
    Integer,
    /// Boolean.
    Boolean,
    /// Double precision float.
    Float,
    /// UTC timestamp.
    Timestamp,
}

impl FieldKind {
    /// Name used in type-check errors.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::String { .. } => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Float => "float",
            Self::Timestamp => "timestamp",
        }
    }

    /// Typed `NULL` for this kind.
    #[must_use]
    pub const fn null(self) -> Value {
        match self {
            Self::String { .. } => Value::String(None),
            Self::Integer => Value::BigInt(None),
            Self::Boolean => Value::Bool(None),
            Self::Float => Value::Double(None),
            Self::Timestamp => Value::ChronoDateTimeUtc(None),
        }
    }

    /// Whether `value` may be stored in a column of this kind. `NULL` is
    /// always accepted.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        is_null(value) || kind_of(value) == self.name()
    }
}

/// Declares a single column.
///
/// ```ignore
/// Field::varchar(100).primary_key()
/// Field::integer().name("years").not_null()
/// Field::boolean().default(false)
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    name: Option<&'static str>,
    kind: FieldKind,
    primary_key: bool,
    nullable: bool,
    default: Option<Value>,
}

impl Field {
    /// Declares a column of the given kind.
    #[must_use]
    pub const fn new(kind: FieldKind) -> Self {
        Self {
            name: None,
            kind,
            primary_key: false,
            nullable: true,
            default: None,
        }
    }

    /// Unbounded string column.
    #[must_use]
    pub const fn string() -> Self {
        Self::new(FieldKind::String { length: None })
    }

    /// String column limited to `length` characters.
    #[must_use]
    pub const fn varchar(length: u32) -> Self {
        Self::new(FieldKind::String {
            length: Some(length),
        })
    }

    /// Integer column.
    #[must_use]
    pub const fn integer() -> Self {
        Self::new(FieldKind::Integer)
    }

    /// Boolean column.
    #[must_use]
    pub const fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    /// Float column.
    #[must_use]
    pub const fn float() -> Self {
        Self::new(FieldKind::Float)
    }

    /// UTC timestamp column.
    #[must_use]
    pub const fn timestamp() -> Self {
        Self::new(FieldKind::Timestamp)
    }

    /// Overrides the column name, which otherwise is the struct field name.
    #[must_use]
    pub const fn name(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    /// Makes the column part of the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Disallows `NULL`.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the column default.
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Column kind.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Resolve the declaration into a column named after `attribute` unless
    /// an explicit name was given.
    pub(crate) fn into_column(self, attribute: &str) -> Column {
        Column {
            name: self.name.map_or_else(|| attribute.to_string(), ToString::to_string),
            kind: self.kind,
            primary_key: self.primary_key,
            nullable: self.nullable,
            default: self.default,
        }
    }
}

/// Declares a foreign key to another model.
///
/// The referencing table gets one shadow column per key column of the
/// referenced model, named `fk_<referenced table>_<key column>`.
#[derive(Clone, Debug)]
pub struct ReferenceField {
    name: Option<&'static str>,
    target: &'static str,
    target_schema: fn() -> Result<Arc<TableSchema>>,
}

impl ReferenceField {
    /// Reference the model `M`.
    #[must_use]
    pub fn to<M: Model>() -> Self {
        Self {
            name: None,
            target: M::NAME,
            target_schema: M::schema,
        }
    }

    /// Overrides the constraint name, which otherwise is `fk_<attribute>`.
    #[must_use]
    pub const fn name(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    /// Name of the referenced table.
    #[must_use]
    pub const fn target(&self) -> &'static str {
        self.target
    }

    /// Schema of the referenced model.
    ///
    /// # Errors
    ///
    /// Returns an error if the referenced model's schema is invalid.
    pub fn target_schema(&self) -> Result<Arc<TableSchema>> {
        (self.target_schema)()
    }

    /// Constraint name for a reference declared on `attribute`.
    #[must_use]
    pub fn constraint_name(&self, attribute: &str) -> String {
        self.name.map_or_else(|| apply_prefix(&[attribute]), ToString::to_string)
    }

    /// Shadow columns holding the referenced key, paired with the referenced
    /// key column each one mirrors.
    ///
    /// # Errors
    ///
    /// Returns an error if the referenced model's schema is invalid.
    pub fn fk_columns(&self) -> Result<Vec<(Column, String)>> {
        let target = self.target_schema()?;
        let prefix = self.target.to_lowercase();

        let mut columns = Vec::new();
        for key in target.key_name() {
            let Some(key_column) = target.column(key) else {
                bail!("`{}` has no key column `{key}`", self.target);
            };
            let column = Column {
                name: apply_prefix(&[&prefix, key]),
                kind: key_column.kind,
                primary_key: false,
                nullable: true,
                default: None,
            };
            columns.push((column, key.clone()));
        }
        Ok(columns)
    }
}

fn apply_prefix(parts: &[&str]) -> String {
    format!("fk_{}", parts.join("_"))
}

/// A single declared attribute, as produced by the `model!` macro.
#[derive(Clone, Debug)]
pub enum Declaration {
    /// A plain column.
    Column(Field),
    /// A foreign key.
    Reference(ReferenceField),
}

impl From<Field> for Declaration {
    fn from(field: Field) -> Self {
        Self::Column(field)
    }
}

impl From<ReferenceField> for Declaration {
    fn from(field: ReferenceField) -> Self {
        Self::Reference(field)
    }
}

/// Struct field types usable as model attributes.
///
/// A field stores one value per column it declares: one for a plain column,
/// one per referenced key column for a reference.
pub trait FieldValue {
    /// Current column values.
    fn to_values(&self) -> Vec<Value>;

    /// Replace the current values with `values`.
    ///
    /// # Errors
    ///
    /// Returns an error if the number or types of `values` do not fit the
    /// field.
    fn load(&mut self, values: Vec<Value>) -> Result<()>;
}

fn single(values: Vec<Value>) -> Result<Value> {
    let count = values.len();
    let mut values = values.into_iter();
    match (values.next(), values.next()) {
        (Some(value), None) => Ok(value),
        _ => bail!("expected a single value, found {count}"),
    }
}

macro_rules! scalar_field {
    ($($ty:ty),* $(,)?) => {$(
        #[allow(clippy::clone_on_copy)]
        impl FieldValue for $ty {
            fn to_values(&self) -> Vec<Value> {
                vec![Value::from(self.clone())]
            }

            fn load(&mut self, values: Vec<Value>) -> Result<()> {
                *self = <$ty as FromValue>::from_value(single(values)?)?;
                Ok(())
            }
        }

        #[allow(clippy::clone_on_copy)]
        impl FieldValue for Option<$ty> {
            fn to_values(&self) -> Vec<Value> {
                vec![Value::from(self.clone())]
            }

            fn load(&mut self, values: Vec<Value>) -> Result<()> {
                let value = single(values)?;
                *self = if is_null(&value) {
                    None
                } else {
                    Some(<$ty as FromValue>::from_value(value)?)
                };
                Ok(())
            }
        }
    )*};
}

scalar_field!(String, i64, i32, bool, f64, DateTime<Utc>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_builders() {
        let column = Field::varchar(100).primary_key().into_column("code");
        assert_eq!(column.name, "code");
        assert_eq!(column.kind, FieldKind::String { length: Some(100) });
        assert!(column.primary_key);
        assert!(!column.nullable);

        let column = Field::integer().name("years").default(18).into_column("age");
        assert_eq!(column.name, "years");
        assert!(column.nullable);
        assert_eq!(column.default, Some(Value::Int(Some(18))));
    }

    #[test]
    fn kind_accepts_matching_values_and_null() {
        assert!(FieldKind::Integer.accepts(&Value::Int(Some(1))));
        assert!(FieldKind::Integer.accepts(&Value::BigInt(Some(1))));
        assert!(FieldKind::Integer.accepts(&Value::String(None)));
        assert!(!FieldKind::Integer.accepts(&Value::String(Some(Box::new("1".into())))));
        assert!(FieldKind::Float.accepts(&Value::Double(Some(1.0))));
        assert!(!FieldKind::Boolean.accepts(&Value::Int(Some(1))));
    }

    #[test]
    fn optional_scalars_round_trip_null() {
        let mut name: Option<String> = Some("Jon".to_string());
        assert_eq!(name.to_values(), vec![Value::String(Some(Box::new("Jon".to_string())))]);

        name.load(vec![Value::String(None)]).unwrap();
        assert_eq!(name, None);

        let mut age: Option<i32> = None;
        age.load(vec![Value::BigInt(Some(32))]).unwrap();
        assert_eq!(age, Some(32));
    }

    #[test]
    fn required_scalars_reject_null() {
        let mut name = String::new();
        let err = name.load(vec![Value::String(None)]).unwrap_err();
        assert!(err.to_string().contains("found null"));
    }

    #[test]
    fn scalars_take_exactly_one_value() {
        let mut flag = false;
        let err = flag.load(vec![]).unwrap_err();
        assert_eq!(err.to_string(), "expected a single value, found 0");
        flag.load(vec![Value::Bool(Some(true)), Value::Bool(Some(false))]).unwrap_err();
    }
}

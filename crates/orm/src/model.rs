//! Models and the `model!` macro.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use sea_query::Value;
use tracing::instrument;

use crate::Row;
use crate::database::Database;
use crate::delete::DeleteBuilder;
use crate::error::Error;
use crate::field::{Declaration, FieldKind};
use crate::filter::Filter;
use crate::insert::InsertBuilder;
use crate::schema::{self, AUTO_KEY, TableSchema};
use crate::select::Query;
use crate::update::UpdateBuilder;
use crate::value::{FromValue, decode, is_null, kind_of};

/// Declares a model: a struct whose fields map to the columns of a table.
///
/// Every field carries its declaration after `=`. The table is named after the
/// struct unless `table = ".."` is given. When no field is declared as primary
/// key, an integer `id` key is added and stored in the generated `auto_id`
/// field.
///
/// The macro implements `Default` for the struct, so `Default` must not be
/// derived.
///
/// # Examples
///
/// ```ignore
/// model! {
///     #[derive(Debug, Clone)]
///     pub struct Person {
///         pub name: Option<String> = Field::string(),
///         pub age: Option<i64> = Field::integer(),
///     }
/// }
///
/// model! {
///     table = "pets",
///     #[derive(Debug, Clone)]
///     pub struct Pet {
///         pub name: String = Field::varchar(50).primary_key(),
///         pub owner: Reference<Person> = ReferenceField::to::<Person>(),
///     }
/// }
/// ```
#[macro_export]
macro_rules! model {
    (
        table = $table:expr,
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $field_type:ty = $declaration:expr
            ),* $(,)?
        }
    ) => {
        #[allow(missing_docs)]
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field : $field_type,
            )*
            /// Automatically assigned key, when no primary key is declared.
            pub auto_id: Option<i64>,
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $( $field: Default::default(), )*
                    auto_id: None,
                }
            }
        }

        impl $crate::Model for $name {
            const NAME: &'static str = $table;

            fn declarations() -> Vec<(&'static str, $crate::Declaration)> {
                vec![
                    $( (stringify!($field), $crate::Declaration::from($declaration)), )*
                ]
            }
        }

        impl $crate::ModelValues for $name {
            #[allow(unused_variables)]
            fn __attribute_values(
                &self, attribute: &str,
            ) -> Option<Vec<$crate::__private::Value>> {
                $(
                    if attribute == stringify!($field) {
                        return Some($crate::FieldValue::to_values(&self.$field));
                    }
                )*
                None
            }

            #[allow(unused_variables)]
            fn __load_attribute(
                &mut self, attribute: &str, values: Vec<$crate::__private::Value>,
            ) -> $crate::__private::anyhow::Result<bool> {
                $(
                    if attribute == stringify!($field) {
                        $crate::FieldValue::load(&mut self.$field, values)?;
                        return Ok(true);
                    }
                )*
                Ok(false)
            }

            fn __auto_id(&self) -> Option<i64> {
                self.auto_id
            }

            fn __set_auto_id(&mut self, id: Option<i64>) {
                self.auto_id = id;
            }
        }
    };

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident $body:tt
    ) => {
        $crate::model! {
            table = stringify!($name),
            $(#[$meta])*
            $vis struct $name $body
        }
    };
}

/// Internal trait for reaching model field values by attribute name.
/// Automatically implemented by the `model!` macro.
#[doc(hidden)]
pub trait ModelValues {
    fn __attribute_values(&self, attribute: &str) -> Option<Vec<Value>>;

    /// Returns `false` when the model has no such attribute.
    ///
    /// # Errors
    ///
    /// Returns an error if the values do not fit the field.
    fn __load_attribute(&mut self, attribute: &str, values: Vec<Value>) -> Result<bool>;

    fn __auto_id(&self) -> Option<i64>;

    fn __set_auto_id(&mut self, id: Option<i64>);
}

/// A struct mapped to a table.
///
/// Typically implemented via the `model!` macro rather than manually.
#[allow(async_fn_in_trait)]
pub trait Model: ModelValues + Default + Send + Sync + Sized + 'static {
    /// Table name.
    const NAME: &'static str;

    /// Attribute declarations, in struct order.
    fn declarations() -> Vec<(&'static str, Declaration)>;

    /// The model's table schema, built once per model type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKeyField`] when the model declares no key and
    /// `id` is taken.
    fn schema() -> Result<Arc<TableSchema>> {
        schema::cached::<Self>()
    }

    /// Names of the primary key columns, sorted alphabetically.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema is invalid.
    fn key_name() -> Result<Vec<String>> {
        Ok(Self::schema()?.key_name().to_vec())
    }

    /// Value of `column`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] if the model has no such column.
    fn get(&self, column: &str) -> Result<Value> {
        let schema = Self::schema()?;
        if schema.has_auto_key() && column == AUTO_KEY {
            return Ok(Value::BigInt(self.__auto_id()));
        }

        let (attribute, index) = schema.attribute_of(column).ok_or_else(|| unknown::<Self>(column))?;
        let values =
            self.__attribute_values(attribute.name).ok_or_else(|| unknown::<Self>(attribute.name))?;
        values
            .into_iter()
            .nth(index)
            .ok_or_else(|| anyhow!("`{}` holds no value for `{column}`", attribute.name))
    }

    /// Assign `value` to `column`, checking it against the column kind.
    /// `NULL` always passes the check.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldType`] when the value does not match the column
    /// kind, [`Error::UnknownField`] when there is no such column.
    fn set(&mut self, column: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let schema = Self::schema()?;
        let definition = schema.column(column).ok_or_else(|| unknown::<Self>(column))?;
        if !definition.kind.accepts(&value) {
            return Err(Error::FieldType {
                column: column.to_string(),
                expected: definition.kind.name(),
                found: kind_of(&value),
            }
            .into());
        }

        if schema.has_auto_key() && column == AUTO_KEY {
            let id = if is_null(&value) { None } else { Some(i64::from_value(value)?) };
            self.__set_auto_id(id);
            return Ok(());
        }

        let (attribute, index) = schema.attribute_of(column).ok_or_else(|| unknown::<Self>(column))?;
        let mut values =
            self.__attribute_values(attribute.name).ok_or_else(|| unknown::<Self>(attribute.name))?;
        let slot = values
            .get_mut(index)
            .ok_or_else(|| anyhow!("`{}` holds no value for `{column}`", attribute.name))?;
        *slot = value;
        self.__load_attribute(attribute.name, values)?;
        Ok(())
    }

    /// `(column, value)` pairs over every column, key included.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema is invalid.
    fn values(&self) -> Result<Vec<(String, Value)>> {
        let schema = Self::schema()?;
        schema
            .columns()
            .map(|column| Ok((column.name.clone(), self.get(&column.name)?)))
            .collect()
    }

    /// Key values in [`Model::key_name`] order, or `None` while any key
    /// column is `NULL`.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema is invalid.
    fn key(&self) -> Result<Option<Vec<Value>>> {
        let schema = Self::schema()?;
        let mut key = Vec::with_capacity(schema.key_name().len());
        for column in schema.key_name() {
            let value = self.get(column)?;
            if is_null(&value) {
                return Ok(None);
            }
            key.push(value);
        }
        Ok(Some(key))
    }

    /// Construct a model from a row holding every column.
    ///
    /// # Errors
    ///
    /// Returns an error if a column is missing or cannot be decoded.
    fn from_row(row: &Row) -> Result<Self> {
        populate(row, false)
    }

    /// Construct a model from a row holding a subset of the columns. Attributes
    /// whose columns are absent keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a column cannot be decoded.
    fn from_partial_row(row: &Row) -> Result<Self> {
        populate(row, true)
    }

    /// Query over every column.
    #[must_use]
    fn select() -> Query<Self> {
        Query::new()
    }

    /// Query over `columns` only.
    #[must_use]
    fn select_columns(columns: &[&str]) -> Query<Self> {
        Query::new().columns(columns.iter().copied())
    }

    /// Number of rows in the table.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    async fn count(db: &Database) -> Result<u64> {
        Self::select().count(db).await
    }

    /// Fetch the row with the given key.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails or the row cannot be decoded.
    async fn get_by_key(db: &Database, key: &[(&str, Value)]) -> Result<Option<Self>> {
        let query = key.iter().fold(Self::select(), |query, (column, value)| {
            query.r#where(Filter::eq(*column, value.clone()))
        });
        query.fetchone(db).await
    }

    /// Insert the instance. Key columns left `NULL` are assigned by the engine
    /// and written back.
    ///
    /// # Errors
    ///
    /// Returns the engine's error when the key already exists.
    #[instrument(skip_all, fields(table = Self::NAME))]
    async fn save(&mut self, db: &Database) -> Result<u64> {
        let schema = db.get_table::<Self>().await?;

        let mut insert = InsertBuilder::<Self>::new();
        for (name, value) in self.values()? {
            let Some(column) = schema.column(&name) else {
                continue;
            };
            if is_null(&value) && (column.primary_key || column.default.is_some()) {
                continue;
            }
            insert = insert.set(name, value);
        }
        for key in schema.key_name() {
            insert = insert.returning(key.clone());
        }

        let rows = db.fetch(insert.build()?).await?;
        if let Some(row) = rows.first() {
            for key in schema.key_name() {
                let kind = schema.column(key).map_or(FieldKind::Integer, |column| column.kind);
                let value = decode(kind, row.try_get(key)?)?;
                self.set(key, value)?;
            }
        }

        Ok(u64::try_from(rows.len())?)
    }

    /// Update every non-key column except the attributes in `exclude`.
    /// Returns `0` without touching the database when the key is incomplete.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] for an unknown excluded attribute, or
    /// the engine's error.
    #[instrument(skip_all, fields(table = Self::NAME))]
    async fn update(&self, db: &Database, exclude: &[&str]) -> Result<u64> {
        let Some(key) = self.key()? else {
            return Ok(0);
        };
        let schema = db.get_table::<Self>().await?;
        let key_name = schema.key_name();

        let mut excluded = Vec::new();
        for name in exclude {
            if key_name.iter().any(|key| key == name) {
                continue;
            }
            let attribute = schema.attribute(name).ok_or_else(|| unknown::<Self>(name))?;
            excluded.extend(attribute.columns.iter().map(|column| column.name.clone()));
        }

        let mut update = UpdateBuilder::<Self>::new();
        let mut assigned = false;
        for (name, value) in self.values()? {
            if key_name.contains(&name) || excluded.contains(&name) {
                continue;
            }
            update = update.set(name, value);
            assigned = true;
        }

        // affected rows must still reflect whether the row exists
        if !assigned && let (Some(name), Some(value)) = (key_name.first(), key.first()) {
            update = update.set(name.clone(), value.clone());
        }

        for (name, value) in key_name.iter().zip(key) {
            update = update.r#where(Filter::eq(name.as_str(), value));
        }

        db.execute(update.build()?).await
    }

    /// Update the row when the instance has a key and the row exists,
    /// otherwise insert it.
    ///
    /// # Errors
    ///
    /// Returns the error of the underlying update or save.
    async fn update_or_save(&mut self, db: &Database) -> Result<u64> {
        if self.key()?.is_some() {
            let updated = self.update(db, &[]).await?;
            if updated > 0 {
                return Ok(updated);
            }
        }
        self.save(db).await
    }

    /// Delete the row by key. Returns `0` when the key is incomplete.
    ///
    /// # Errors
    ///
    /// Returns the engine's error.
    #[instrument(skip_all, fields(table = Self::NAME))]
    async fn delete(&self, db: &Database) -> Result<u64> {
        let Some(key) = self.key()? else {
            return Ok(0);
        };
        let schema = db.get_table::<Self>().await?;

        let mut delete = DeleteBuilder::<Self>::new();
        for (name, value) in schema.key_name().iter().zip(key) {
            delete = delete.r#where(Filter::eq(name.as_str(), value));
        }

        db.execute(delete.build()?).await
    }
}

fn unknown<M: Model>(name: &str) -> anyhow::Error {
    Error::UnknownField {
        model: M::NAME,
        name: name.to_string(),
    }
    .into()
}

fn populate<M: Model>(row: &Row, partial: bool) -> Result<M> {
    let schema = M::schema()?;
    let mut model = M::default();

    for attribute in schema.attributes() {
        if partial && attribute.columns.iter().any(|column| row.get(&column.name).is_none()) {
            continue;
        }

        let values = attribute
            .columns
            .iter()
            .map(|column| decode(column.kind, row.try_get(&column.name)?))
            .collect::<Result<Vec<_>>>()?;
        if !model.__load_attribute(attribute.name, values)? {
            return Err(unknown::<M>(attribute.name));
        }
    }

    if schema.has_auto_key() {
        let data = if partial { row.get(AUTO_KEY) } else { Some(row.try_get(AUTO_KEY)?) };
        if let Some(data) = data {
            let id = decode(FieldKind::Integer, data)?;
            model.__set_auto_id(if is_null(&id) { None } else { Some(i64::from_value(id)?) });
        }
    }

    Ok(model)
}

//! Table schemas derived from model declarations.
//!
//! Building a schema names every column, expands references into shadow
//! columns and foreign keys, and settles the primary key. Schemas are pure
//! metadata: nothing here touches the database.

use std::any::TypeId;
use std::sync::{Arc, LazyLock};

use anyhow::Result;
use dashmap::DashMap;
use sea_query::{
    Alias, ColumnDef, ForeignKey as ForeignKeyStatement, Index, SchemaStatementBuilder,
    SqliteQueryBuilder, Table, TableCreateStatement, TableDropStatement, Value,
};

use crate::error::Error;
use crate::field::{Declaration, Field, FieldKind};
use crate::model::Model;

/// Name of the key column added when a model declares no primary key.
pub const AUTO_KEY: &str = "id";

static SCHEMAS: LazyLock<DashMap<TypeId, Arc<TableSchema>>> = LazyLock::new(DashMap::new);

/// A resolved column definition.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Column type.
    pub kind: FieldKind,
    /// Part of the primary key.
    pub primary_key: bool,
    /// Accepts `NULL`.
    pub nullable: bool,
    /// Default applied by the database when the value is omitted.
    pub default: Option<Value>,
}

/// A foreign-key constraint contributed by a reference.
#[derive(Clone, Debug)]
pub struct ForeignKey {
    /// Constraint name.
    pub name: String,
    /// Shadow columns on the referencing table.
    pub columns: Vec<String>,
    /// Referenced key columns, aligned with `columns`.
    pub target_columns: Vec<String>,
    /// Referenced table.
    pub target: Arc<TableSchema>,
}

/// A declared attribute and the columns it maps to.
#[derive(Clone, Debug)]
pub struct Attribute {
    /// Struct field name.
    pub name: &'static str,
    /// Columns, one for a plain field and one per key column for a reference.
    pub columns: Vec<Column>,
    /// Constraint, for references.
    pub reference: Option<ForeignKey>,
}

/// The table behind a model.
#[derive(Clone, Debug)]
pub struct TableSchema {
    name: &'static str,
    attributes: Vec<Attribute>,
    auto_key: Option<Column>,
    key_name: Vec<String>,
}

impl TableSchema {
    /// Build the schema for `M`.
    ///
    /// Prefer [`Model::schema`], which caches the result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKeyField`] when no primary key is declared and
    /// `id` is already taken, or an error from a referenced model's schema.
    pub fn of<M: Model>() -> Result<Self> {
        Self::build(M::NAME, M::declarations())
    }

    /// Build a schema from raw declarations.
    ///
    /// # Errors
    ///
    /// See [`TableSchema::of`].
    pub fn build(
        name: &'static str, declarations: Vec<(&'static str, Declaration)>,
    ) -> Result<Self> {
        let mut attributes = Vec::with_capacity(declarations.len());

        for (attribute, declaration) in declarations {
            match declaration {
                Declaration::Column(field) => attributes.push(Attribute {
                    name: attribute,
                    columns: vec![field.into_column(attribute)],
                    reference: None,
                }),
                Declaration::Reference(field) => {
                    let (columns, target_columns): (Vec<Column>, Vec<String>) =
                        field.fk_columns()?.into_iter().unzip();
                    let reference = ForeignKey {
                        name: field.constraint_name(attribute),
                        columns: columns.iter().map(|column| column.name.clone()).collect(),
                        target_columns,
                        target: field.target_schema()?,
                    };
                    attributes.push(Attribute {
                        name: attribute,
                        columns,
                        reference: Some(reference),
                    });
                }
            }
        }

        let mut key_name: Vec<String> = attributes
            .iter()
            .flat_map(|attribute| &attribute.columns)
            .filter(|column| column.primary_key)
            .map(|column| column.name.clone())
            .collect();
        key_name.sort();

        let mut auto_key = None;
        if key_name.is_empty() {
            let taken = attributes.iter().any(|attribute| {
                attribute.name == AUTO_KEY
                    || attribute.columns.iter().any(|column| column.name == AUTO_KEY)
            });
            if taken {
                return Err(Error::InvalidKeyField { model: name }.into());
            }
            key_name.push(AUTO_KEY.to_string());
            auto_key = Some(Field::integer().primary_key().into_column(AUTO_KEY));
        }

        Ok(Self {
            name,
            attributes,
            auto_key,
            key_name,
        })
    }

    /// Table name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Declared attributes, in declaration order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Look up an attribute by struct field name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }

    /// The attribute owning `column` and the column's position within it.
    /// `None` for the automatic key column.
    #[must_use]
    pub fn attribute_of(&self, column: &str) -> Option<(&Attribute, usize)> {
        self.attributes.iter().find_map(|attribute| {
            attribute
                .columns
                .iter()
                .position(|candidate| candidate.name == column)
                .map(|index| (attribute, index))
        })
    }

    /// All columns: declared ones (including reference shadow columns) in
    /// declaration order, followed by the automatic key if present.
    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.attributes.iter().flat_map(|attribute| &attribute.columns).chain(&self.auto_key)
    }

    /// Look up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns().find(|column| column.name == name)
    }

    /// Names of the primary key columns, sorted alphabetically.
    #[must_use]
    pub fn key_name(&self) -> &[String] {
        &self.key_name
    }

    /// Whether the `id` key column was added automatically.
    #[must_use]
    pub const fn has_auto_key(&self) -> bool {
        self.auto_key.is_some()
    }

    /// Foreign keys contributed by references.
    pub fn foreign_keys(&self) -> impl Iterator<Item = &ForeignKey> {
        self.attributes.iter().filter_map(|attribute| attribute.reference.as_ref())
    }

    /// `CREATE TABLE IF NOT EXISTS` for this table.
    #[must_use]
    pub fn create_statement(&self) -> TableCreateStatement {
        let mut table = Table::create();
        table.table(Alias::new(self.name)).if_not_exists();

        let inline_key = self.key_name.len() == 1;
        for column in self.columns() {
            let mut def = ColumnDef::new(Alias::new(column.name.as_str()));
            match column.kind {
                FieldKind::String { length: Some(length) } => {
                    def.string_len(length);
                }
                FieldKind::String { length: None } => {
                    def.string();
                }
                FieldKind::Integer => {
                    def.integer();
                }
                FieldKind::Boolean => {
                    def.boolean();
                }
                FieldKind::Float => {
                    def.double();
                }
                FieldKind::Timestamp => {
                    def.timestamp_with_time_zone();
                }
            }

            // an `INTEGER PRIMARY KEY` must stay nullable on insert so the
            // engine can assign it
            if column.primary_key {
                if inline_key {
                    def.primary_key();
                }
            } else if !column.nullable {
                def.not_null();
            }

            if let Some(default) = &column.default {
                def.default(default.clone());
            }

            table.col(&mut def);
        }

        if !inline_key {
            let mut index = Index::create();
            for key in &self.key_name {
                index.col(Alias::new(key.as_str()));
            }
            table.primary_key(&mut index);
        }

        for reference in self.foreign_keys() {
            let mut foreign_key = ForeignKeyStatement::create();
            foreign_key
                .name(reference.name.as_str())
                .from_tbl(Alias::new(self.name))
                .to_tbl(Alias::new(reference.target.name()));
            for column in &reference.columns {
                foreign_key.from_col(Alias::new(column.as_str()));
            }
            for column in &reference.target_columns {
                foreign_key.to_col(Alias::new(column.as_str()));
            }
            table.foreign_key(&mut foreign_key);
        }

        table.to_owned()
    }

    /// `DROP TABLE IF EXISTS` for this table.
    #[must_use]
    pub fn drop_statement(&self) -> TableDropStatement {
        Table::drop().table(Alias::new(self.name)).if_exists().to_owned()
    }

    /// SQL text of [`TableSchema::create_statement`].
    #[must_use]
    pub fn create_sql(&self) -> String {
        self.create_statement().to_string(SqliteQueryBuilder)
    }

    /// SQL text of [`TableSchema::drop_statement`].
    #[must_use]
    pub fn drop_sql(&self) -> String {
        self.drop_statement().to_string(SqliteQueryBuilder)
    }
}

/// Cached schema for `M`. Failed builds are not cached.
pub(crate) fn cached<M: Model>() -> Result<Arc<TableSchema>> {
    let id = TypeId::of::<M>();
    if let Some(schema) = SCHEMAS.get(&id) {
        return Ok(Arc::clone(schema.value()));
    }

    // built outside the map guard: references recurse into other models
    let schema = Arc::new(TableSchema::of::<M>()?);
    SCHEMAS.insert(id, Arc::clone(&schema));
    Ok(schema)
}

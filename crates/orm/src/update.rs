use std::marker::PhantomData;

use anyhow::Result;
use sea_query::{Alias, SqliteQueryBuilder, Value};

use crate::Statement;
use crate::filter::Filter;
use crate::model::Model;
use crate::value::values_to_datatypes;

/// Builder for constructing UPDATE queries.
pub struct UpdateBuilder<M: Model> {
    set_clauses: Vec<(String, Value)>,
    filters: Vec<Filter>,
    returning: Vec<String>,
    _marker: PhantomData<M>,
}

impl<M: Model> Default for UpdateBuilder<M> {
    fn default() -> Self {
        Self {
            set_clauses: Vec::new(),
            filters: Vec::new(),
            returning: Vec::new(),
            _marker: PhantomData,
        }
    }
}

impl<M: Model> UpdateBuilder<M> {
    /// Creates a new UPDATE query builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column to a new value.
    #[must_use]
    pub fn set<V>(mut self, column: impl Into<String>, value: V) -> Self
    where
        V: Into<Value>,
    {
        self.set_clauses.push((column.into(), value.into()));
        self
    }

    /// Adds a WHERE clause filter.
    #[must_use]
    pub fn r#where(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Specifies columns to return from updated rows.
    #[must_use]
    pub fn returning(mut self, column: impl Into<String>) -> Self {
        self.returning.push(column.into());
        self
    }

    /// Build the UPDATE query.
    ///
    /// # Errors
    ///
    /// Returns an error if the model's schema is invalid or query values
    /// cannot be converted to engine data types.
    pub fn build(self) -> Result<Statement> {
        let schema = M::schema()?;
        let table = schema.name();

        let mut statement = sea_query::Query::update();
        statement.table(Alias::new(table));

        for (column, value) in self.set_clauses {
            statement.value(Alias::new(column), value);
        }

        for filter in self.filters {
            statement.and_where(filter.into_expr(table));
        }

        for column in self.returning {
            statement.returning_col(Alias::new(column));
        }

        let (sql, values) = statement.build(SqliteQueryBuilder);
        let params = values_to_datatypes(values)?;

        tracing::debug!(
            table = table,
            sql = %sql,
            param_count = params.len(),
            "UpdateBuilder generated SQL"
        );

        Ok(Statement { sql, params })
    }
}

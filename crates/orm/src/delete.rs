use std::marker::PhantomData;

use anyhow::Result;
use sea_query::{Alias, SqliteQueryBuilder};

use crate::Statement;
use crate::filter::Filter;
use crate::model::Model;
use crate::value::values_to_datatypes;

/// Builder for constructing DELETE queries.
pub struct DeleteBuilder<M: Model> {
    filters: Vec<Filter>,
    returning: Vec<String>,
    _marker: PhantomData<M>,
}

impl<M: Model> Default for DeleteBuilder<M> {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            returning: Vec::new(),
            _marker: PhantomData,
        }
    }
}

impl<M: Model> DeleteBuilder<M> {
    /// Creates a new DELETE query builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a WHERE clause filter.
    #[must_use]
    pub fn r#where(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Specifies columns to return from deleted rows.
    #[must_use]
    pub fn returning(mut self, column: impl Into<String>) -> Self {
        self.returning.push(column.into());
        self
    }

    /// Build the DELETE query.
    ///
    /// # Errors
    ///
    /// Returns an error if the model's schema is invalid or query values
    /// cannot be converted to engine data types.
    pub fn build(self) -> Result<Statement> {
        let schema = M::schema()?;
        let table = schema.name();

        let mut statement = sea_query::Query::delete();
        statement.from_table(Alias::new(table));

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
            "DeleteBuilder generated SQL"
        );

        Ok(Statement { sql, params })
    }
}

use std::marker::PhantomData;

use anyhow::Result;
use sea_query::{Alias, SimpleExpr, SqliteQueryBuilder, Value};

use crate::Statement;
use crate::model::Model;
use crate::value::values_to_datatypes;

/// Builder for constructing INSERT queries.
pub struct InsertBuilder<M: Model> {
    values: Vec<(String, Value)>,
    returning: Vec<String>,
    _marker: PhantomData<M>,
}

impl<M: Model> Default for InsertBuilder<M> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            returning: Vec::new(),
            _marker: PhantomData,
        }
    }
}

impl<M: Model> InsertBuilder<M> {
    /// Creates a new INSERT query builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column value for the insert.
    #[must_use]
    pub fn set<V>(mut self, column: impl Into<String>, value: V) -> Self
    where
        V: Into<Value>,
    {
        self.values.push((column.into(), value.into()));
        self
    }

    /// Specifies columns to return from the inserted row.
    #[must_use]
    pub fn returning(mut self, column: impl Into<String>) -> Self {
        self.returning.push(column.into());
        self
    }

    /// Build the INSERT query. Without any column values the row is inserted
    /// with `DEFAULT VALUES`.
    ///
    /// # Errors
    ///
    /// Returns an error if the model's schema is invalid or query values
    /// cannot be converted to engine data types.
    pub fn build(self) -> Result<Statement> {
        let schema = M::schema()?;
        let table = schema.name();

        let mut statement = sea_query::Query::insert();
        statement.into_table(Alias::new(table));

        if self.values.is_empty() {
            statement.or_default_values();
        } else {
            let columns: Vec<_> =
                self.values.iter().map(|(column, _)| Alias::new(column.as_str())).collect();
            let row: Vec<SimpleExpr> =
                self.values.into_iter().map(|(_, value)| SimpleExpr::Value(value)).collect();
            statement.columns(columns);
            statement.values(row)?;
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
            "InsertBuilder generated SQL"
        );

        Ok(Statement { sql, params })
    }
}

use std::marker::PhantomData;

use anyhow::Result;
use sea_query::{
    Alias, Asterisk, ColumnRef, Expr, Func, IntoIden, Order, SimpleExpr, SqliteQueryBuilder,
};
use tracing::instrument;

use crate::Statement;
use crate::database::Database;
use crate::field::FieldKind;
use crate::filter::Filter;
use crate::model::Model;
use crate::value::{FromValue, decode, values_to_datatypes};

/// Fluent SELECT over a model's table.
///
/// ```ignore
/// let people = Person::select()
///     .r#where(Filter::eq("name", "Jon Doe"))
///     .order_by("age")
///     .fetchall(&db)
///     .await?;
/// ```
pub struct Query<M: Model> {
    columns: Vec<String>,
    filters: Vec<Filter>,
    limit: Option<u64>,
    offset: Option<u64>,
    order: Vec<(String, Order)>,
    _marker: PhantomData<M>,
}

impl<M: Model> Default for Query<M> {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            filters: Vec::new(),
            limit: None,
            offset: None,
            order: Vec::new(),
            _marker: PhantomData,
        }
    }
}

impl<M: Model> Query<M> {
    /// Select every column of the model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select only `columns`. Attributes whose columns are not selected keep
    /// their default values on the returned models.
    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a WHERE clause filter, combined with earlier ones by AND.
    #[must_use]
    pub fn r#where(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Sets the maximum number of rows to return.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the number of rows to skip.
    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Adds ascending ORDER BY clause.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order.push((column.into(), Order::Asc));
        self
    }

    /// Adds descending ORDER BY clause.
    #[must_use]
    pub fn order_by_desc(mut self, column: impl Into<String>) -> Self {
        self.order.push((column.into(), Order::Desc));
        self
    }

    /// Build the SELECT statement.
    ///
    /// # Errors
    ///
    /// Returns an error if the model's schema is invalid or a query value
    /// cannot be bound.
    pub fn build(&self) -> Result<Statement> {
        let schema = M::schema()?;
        let table = schema.name();
        let mut statement = sea_query::Query::select();

        if self.columns.is_empty() {
            for column in schema.columns() {
                statement.column(table_column(table, &column.name));
            }
        } else {
            for column in &self.columns {
                statement.column(table_column(table, column));
            }
        }

        statement.from(Alias::new(table));

        for filter in &self.filters {
            statement.and_where(filter.clone().into_expr(table));
        }

        if let Some(limit) = self.limit {
            statement.limit(limit);
        }

        if let Some(offset) = self.offset {
            statement.offset(offset);
        }

        for (column, order) in &self.order {
            statement.order_by(table_column(table, column), order.clone());
        }

        let (sql, values) = statement.build(SqliteQueryBuilder);
        let params = values_to_datatypes(values)?;

        tracing::debug!(
            table = table,
            sql = %sql,
            param_count = params.len(),
            "Query generated SQL"
        );

        Ok(Statement { sql, params })
    }

    /// Build the `SELECT COUNT(*)` statement for the same filters.
    ///
    /// # Errors
    ///
    /// Returns an error if the model's schema is invalid or a query value
    /// cannot be bound.
    pub fn build_count(&self) -> Result<Statement> {
        let schema = M::schema()?;
        let table = schema.name();
        let mut statement = sea_query::Query::select();

        let count: SimpleExpr = Func::count(Expr::col(Asterisk)).into();
        statement.expr_as(count, Alias::new(COUNT)).from(Alias::new(table));

        for filter in &self.filters {
            statement.and_where(filter.clone().into_expr(table));
        }

        let (sql, values) = statement.build(SqliteQueryBuilder);
        let params = values_to_datatypes(values)?;

        tracing::debug!(
            table = table,
            sql = %sql,
            param_count = params.len(),
            "Query generated count SQL"
        );

        Ok(Statement { sql, params })
    }

    async fn rows(&self, db: &Database) -> Result<Vec<M>> {
        db.get_table::<M>().await?;
        let rows = db.fetch(self.build()?).await?;
        let partial = !self.columns.is_empty();
        rows.iter()
            .map(|row| if partial { M::from_partial_row(row) } else { M::from_row(row) })
            .collect()
    }

    /// Fetch every matching row.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails or a row cannot be decoded.
    #[instrument(skip_all, fields(table = M::NAME))]
    pub async fn fetchall(self, db: &Database) -> Result<Vec<M>> {
        self.rows(db).await
    }

    /// Fetch at most `size` matching rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails or a row cannot be decoded.
    #[instrument(skip_all, fields(table = M::NAME))]
    pub async fn fetchmany(self, db: &Database, size: u64) -> Result<Vec<M>> {
        self.limit(size).rows(db).await
    }

    /// Fetch the first matching row, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails or the row cannot be decoded.
    #[instrument(skip_all, fields(table = M::NAME))]
    pub async fn fetchone(self, db: &Database) -> Result<Option<M>> {
        Ok(self.rows(db).await?.into_iter().next())
    }

    /// Fetch the first matching row, limiting the query to a single row.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails or the row cannot be decoded.
    pub async fn first(self, db: &Database) -> Result<Option<M>> {
        self.limit(1).fetchone(db).await
    }

    /// Count matching rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    #[instrument(skip_all, fields(table = M::NAME))]
    pub async fn count(self, db: &Database) -> Result<u64> {
        db.get_table::<M>().await?;
        let rows = db.fetch(self.build_count()?).await?;
        let Some(row) = rows.first() else {
            return Ok(0);
        };
        let count = i64::from_value(decode(FieldKind::Integer, row.try_get(COUNT)?)?)?;
        Ok(u64::try_from(count)?)
    }
}

const COUNT: &str = "count";

/// `"table"."column"`.
pub fn table_column(table: &str, column: &str) -> ColumnRef {
    ColumnRef::TableColumn(Alias::new(table).into_iden(), Alias::new(column).into_iden())
}

use sea_query::{Expr, ExprTrait, SimpleExpr, Value};

use crate::select::table_column;
use crate::value::is_null;

/// Filter represents database predicates without exposing ``SeaQuery`` types to callers.
///
/// Values are stored internally as ``sea_query::Value`` but callers use natural Rust types
/// (i64, String, ``DateTime<Utc>``) which convert via From. Columns are qualified with the
/// queried model's table when the filter is applied.
#[derive(Debug, Clone)]
pub enum Filter {
    /// column = value (`IS NULL` when the value is null)
    Eq(String, Value),
    /// column != value (`IS NOT NULL` when the value is null)
    Ne(String, Value),
    /// column > value
    Gt(String, Value),
    /// column >= value
    Gte(String, Value),
    /// column < value
    Lt(String, Value),
    /// column <= value
    Lte(String, Value),
    /// column IN (values)
    In(String, Vec<Value>),
    /// column NOT IN (values)
    NotIn(String, Vec<Value>),
    /// column IS NULL
    IsNull(String),
    /// column IS NOT NULL
    IsNotNull(String),
    /// column LIKE pattern
    Like(String, String),
    /// column NOT LIKE pattern
    NotLike(String, String),
    /// column BETWEEN low AND high
    Between(String, Value, Value),
    /// column NOT BETWEEN low AND high
    NotBetween(String, Value, Value),
    /// Verbatim SQL condition, e.g. `name = 'John Doe'`
    Raw(String),
    /// Logical AND of multiple filters
    And(Vec<Self>),
    /// Logical OR of multiple filters
    Or(Vec<Self>),
    /// Logical NOT of a filter
    Not(Box<Self>),
}

impl Filter {
    fn column(table: &str, col: &str) -> SimpleExpr {
        Expr::col(table_column(table, col)).into()
    }

    /// Convert Filter to ``SeaQuery`` ``SimpleExpr`` against the given table.
    #[must_use]
    pub fn into_expr(self, table: &str) -> SimpleExpr {
        match self {
            Self::Eq(col, val) if is_null(&val) => Self::column(table, &col).is_null(),
            Self::Eq(col, val) => Self::column(table, &col).eq(val),
            Self::Ne(col, val) if is_null(&val) => Self::column(table, &col).is_not_null(),
            Self::Ne(col, val) => Self::column(table, &col).ne(val),
            Self::Gt(col, val) => Self::column(table, &col).gt(val),
            Self::Gte(col, val) => Self::column(table, &col).gte(val),
            Self::Lt(col, val) => Self::column(table, &col).lt(val),
            Self::Lte(col, val) => Self::column(table, &col).lte(val),
            Self::In(col, vals) => Self::column(table, &col).is_in(vals),
            Self::NotIn(col, vals) => Self::column(table, &col).is_not_in(vals),
            Self::IsNull(col) => Self::column(table, &col).is_null(),
            Self::IsNotNull(col) => Self::column(table, &col).is_not_null(),
            Self::Like(col, pattern) => Self::column(table, &col).like(pattern),
            Self::NotLike(col, pattern) => Self::column(table, &col).not_like(pattern),
            Self::Between(col, low, high) => Self::column(table, &col).between(low, high),
            Self::NotBetween(col, low, high) => {
                Self::column(table, &col).not_between(low, high)
            }
            Self::Raw(sql) => SimpleExpr::Custom(sql),
            Self::And(filters) => {
                let mut exprs = filters.into_iter().map(|f| f.into_expr(table));
                exprs.next().map_or_else(
                    || Expr::value(true), // no filters, so all conditions satisfied, hence `true`
                    |first| exprs.fold(first, sea_query::SimpleExpr::and),
                )
            }
            Self::Or(filters) => {
                let mut exprs = filters.into_iter().map(|f| f.into_expr(table));
                exprs.next().map_or_else(
                    || Expr::value(false), // no filters, so 0 conditions satisfied, hence `false`
                    |first| exprs.fold(first, sea_query::SimpleExpr::or),
                )
            }
            Self::Not(filter) => Expr::expr(filter.into_expr(table)).not(),
        }
    }

    /// Creates an equality filter (column = value).
    #[must_use]
    pub fn eq(col: impl Into<String>, val: impl Into<Value>) -> Self {
        Self::Eq(col.into(), val.into())
    }

    /// Creates an inequality filter (column != value).
    #[must_use]
    pub fn ne(col: impl Into<String>, val: impl Into<Value>) -> Self {
        Self::Ne(col.into(), val.into())
    }

    /// Creates a greater-than filter (column > value).
    #[must_use]
    pub fn gt(col: impl Into<String>, val: impl Into<Value>) -> Self {
        Self::Gt(col.into(), val.into())
    }

    /// Creates a greater-than-or-equal filter (column >= value).
    #[must_use]
    pub fn gte(col: impl Into<String>, val: impl Into<Value>) -> Self {
        Self::Gte(col.into(), val.into())
    }

    /// Creates a less-than filter (column < value).
    #[must_use]
    pub fn lt(col: impl Into<String>, val: impl Into<Value>) -> Self {
        Self::Lt(col.into(), val.into())
    }

    /// Creates a less-than-or-equal filter (column <= value).
    #[must_use]
    pub fn lte(col: impl Into<String>, val: impl Into<Value>) -> Self {
        Self::Lte(col.into(), val.into())
    }

    /// Creates an IN filter (column IN (values)).
    #[must_use]
    pub fn r#in(col: impl Into<String>, vals: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self::In(col.into(), vals.into_iter().map(Into::into).collect())
    }

    /// Creates a NOT IN filter (column NOT IN (values)).
    #[must_use]
    pub fn not_in(
        col: impl Into<String>, vals: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Self {
        Self::NotIn(col.into(), vals.into_iter().map(Into::into).collect())
    }

    /// Creates an IS NULL filter.
    #[must_use]
    pub fn is_null(col: impl Into<String>) -> Self {
        Self::IsNull(col.into())
    }

    /// Creates an IS NOT NULL filter.
    #[must_use]
    pub fn is_not_null(col: impl Into<String>) -> Self {
        Self::IsNotNull(col.into())
    }

    /// Creates a LIKE filter with pattern matching.
    #[must_use]
    pub fn like(col: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::Like(col.into(), pattern.into())
    }

    /// Creates a NOT LIKE filter with pattern matching.
    #[must_use]
    pub fn not_like(col: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::NotLike(col.into(), pattern.into())
    }

    /// Creates a BETWEEN filter (column BETWEEN low AND high).
    #[must_use]
    pub fn between(
        col: impl Into<String>, low: impl Into<Value>, high: impl Into<Value>,
    ) -> Self {
        Self::Between(col.into(), low.into(), high.into())
    }

    /// Creates a NOT BETWEEN filter.
    #[must_use]
    pub fn not_between(
        col: impl Into<String>, low: impl Into<Value>, high: impl Into<Value>,
    ) -> Self {
        Self::NotBetween(col.into(), low.into(), high.into())
    }

    /// Creates a verbatim SQL condition.
    #[must_use]
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::Raw(sql.into())
    }

    /// All of `filters` must hold.
    #[must_use]
    pub const fn and(filters: Vec<Self>) -> Self {
        Self::And(filters)
    }

    /// Any of `filters` must hold.
    #[must_use]
    pub const fn or(filters: Vec<Self>) -> Self {
        Self::Or(filters)
    }

    /// `filter` must not hold.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: Self) -> Self {
        Self::Not(Box::new(filter))
    }
}

use std::fmt::Debug;

use crate::traits::FutureResult;
use crate::types::{DataType, Row};

/// Engine backends implement [`Connection`] to execute SQL statements on
/// behalf of the ORM.
pub trait Connection: Debug + Send + Sync + 'static {
    /// Execute a query and return the resulting rows.
    ///
    /// Also used for data-modifying statements with a `RETURNING` clause.
    fn query(&self, query: String, params: Vec<DataType>) -> FutureResult<Vec<Row>>;

    /// Execute a statement that does not return rows (e.g., an `INSERT`,
    /// `UPDATE`, `DELETE` or DDL statement) and return the number of rows
    /// affected.
    fn exec(&self, query: String, params: Vec<DataType>) -> FutureResult<u64>;
}

/// A SQL string with its positional parameters, ready to be handed to a
/// [`Connection`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Statement {
    /// SQL text.
    pub sql: String,

    /// Statement parameters, in placeholder order.
    pub params: Vec<DataType>,
}

impl Statement {
    /// A statement without parameters.
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Run the statement as a query.
    pub fn query(self, conn: &dyn Connection) -> FutureResult<Vec<Row>> {
        conn.query(self.sql, self.params)
    }

    /// Run the statement for its side effects.
    pub fn exec(self, conn: &dyn Connection) -> FutureResult<u64> {
        conn.exec(self.sql, self.params)
    }
}

//! `SQLite` backend.
//!
//! This is a lightweight implementation for development and tests.

#![allow(clippy::significant_drop_tightening)]

use std::sync::Arc;

use anyhow::{Context, Result};
use fromenv::FromEnv;
use futures::FutureExt;
use rusqlite::types::ValueRef;
use rusqlite::{Connection as RawConnection, params_from_iter};
use tracing::instrument;

use crate::connection::Connection;
use crate::traits::{Backend, FutureResult};
use crate::types::{DataType, Field, Row};

/// Options used to connect to the `SQLite` database.
///
/// Loaded from environment variables.
#[derive(Debug, Clone, FromEnv)]
pub struct ConnectOptions {
    /// Database path or URI.
    #[env(from = "SQL_DATABASE", default = "file::memory:?cache=shared")]
    pub database: String,
}

impl crate::FromEnv for ConnectOptions {
    fn from_env() -> Result<Self> {
        Self::from_env().finalize().context("issue loading connection options")
    }
}

/// `SQLite` connection.
///
/// Cloning is cheap: clones share the underlying connection.
#[derive(Debug, Clone)]
pub struct Sqlite {
    // Mutex is necessary since rusqlite::Connection isn't `Sync`
    conn: Arc<parking_lot::Mutex<RawConnection>>,
}

impl Sqlite {
    /// Open a database at `path`. `":memory:"` opens a private in-memory
    /// database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open(path: &str) -> Result<Self> {
        tracing::debug!("opening SQLite database: {path}");
        let conn = RawConnection::open(path).context("failed to open SQLite database")?;
        Ok(Self {
            conn: Arc::new(parking_lot::Mutex::new(conn)),
        })
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn memory() -> Result<Self> {
        Self::open(":memory:")
    }
}

impl Backend for Sqlite {
    type ConnectOptions = ConnectOptions;

    #[instrument]
    async fn connect_with(options: Self::ConnectOptions) -> Result<Self> {
        Self::open(&options.database)
    }
}

impl Connection for Sqlite {
    fn query(&self, query: String, params: Vec<DataType>) -> FutureResult<Vec<Row>> {
        tracing::debug!("executing query: {}", query);
        let conn = Arc::clone(&self.conn);

        async move {
            let conn = conn.lock();
            let mut stmt = conn.prepare(&query).context("failed to prepare statement")?;

            let sqlite_params =
                params.iter().map(datatype_to_sqlite_value).collect::<Result<Vec<_>>>()?;

            let column_names: Vec<String> =
                stmt.column_names().iter().map(ToString::to_string).collect();

            let mut rows = stmt
                .query(params_from_iter(sqlite_params.iter()))
                .context("failed to execute query")?;

            let mut result_rows = Vec::new();
            let mut index = 0;
            while let Some(row) = rows.next().context("failed to fetch row")? {
                let mut fields = Vec::with_capacity(column_names.len());

                for (i, name) in column_names.iter().enumerate() {
                    let value = row.get_ref(i).context("failed to get column value")?;
                    fields.push(Field {
                        name: name.clone(),
                        value: sqlite_value_to_datatype(value)?,
                    });
                }

                result_rows.push(Row {
                    index: index.to_string(),
                    fields,
                });
                index += 1;
            }

            Ok(result_rows)
        }
        .boxed()
    }

    fn exec(&self, query: String, params: Vec<DataType>) -> FutureResult<u64> {
        tracing::debug!("executing statement: {}", query);
        let conn = Arc::clone(&self.conn);

        async move {
            let conn = conn.lock();
            let mut stmt = conn.prepare(&query).context("failed to prepare statement")?;

            let sqlite_params =
                params.iter().map(datatype_to_sqlite_value).collect::<Result<Vec<_>>>()?;

            let rows_affected = stmt
                .execute(params_from_iter(sqlite_params.iter()))
                .context("failed to execute statement")?;

            Ok(rows_affected as u64)
        }
        .boxed()
    }
}

fn datatype_to_sqlite_value(dt: &DataType) -> Result<rusqlite::types::Value> {
    use rusqlite::types::Value;

    let value = match dt {
        DataType::Boolean(Some(b)) => Value::Integer(i64::from(*b)),
        DataType::Int32(Some(i)) => Value::Integer(i64::from(*i)),
        DataType::Int64(Some(i)) => Value::Integer(*i),
        DataType::Uint32(Some(u)) => Value::Integer(i64::from(*u)),
        DataType::Uint64(Some(u)) => Value::Integer(
            i64::try_from(*u).with_context(|| format!("unsigned value {u} out of range"))?,
        ),
        DataType::Float(Some(f)) => Value::Real(f64::from(*f)),
        DataType::Double(Some(f)) => Value::Real(*f),
        DataType::Str(Some(s))
        | DataType::Date(Some(s))
        | DataType::Time(Some(s))
        | DataType::Timestamp(Some(s)) => Value::Text(s.clone()),
        DataType::Binary(Some(b)) => Value::Blob(b.clone()),
        // All None variants map to NULL
        _ => Value::Null,
    };
    Ok(value)
}

fn sqlite_value_to_datatype(value: ValueRef) -> Result<DataType> {
    match value {
        ValueRef::Null => Ok(DataType::Str(None)),
        ValueRef::Integer(i) => Ok(DataType::Int64(Some(i))),
        ValueRef::Real(f) => Ok(DataType::Double(Some(f))),
        ValueRef::Text(t) => {
            let s = std::str::from_utf8(t).context("invalid UTF-8 in text value")?;
            Ok(DataType::Str(Some(s.to_string())))
        }
        ValueRef::Blob(b) => Ok(DataType::Binary(Some(b.to_vec()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sqlite_operations() {
        let sqlite = Sqlite::connect_with(ConnectOptions {
            database: ":memory:".to_string(),
        })
        .await
        .expect("connect");

        let rows_affected = sqlite
            .exec(
                "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, age INTEGER)".to_string(),
                vec![],
            )
            .await
            .expect("create table");
        assert_eq!(rows_affected, 0);

        let rows_affected = sqlite
            .exec(
                "INSERT INTO users (name, age) VALUES (?, ?)".to_string(),
                vec![DataType::Str(Some("Alice".to_string())), DataType::Int32(Some(30))],
            )
            .await
            .expect("insert");
        assert_eq!(rows_affected, 1);

        let rows_affected = sqlite
            .exec(
                "INSERT INTO users (name, age) VALUES (?, ?)".to_string(),
                vec![DataType::Str(Some("Bob".to_string())), DataType::Int32(None)],
            )
            .await
            .expect("insert");
        assert_eq!(rows_affected, 1);

        let rows = sqlite
            .query("SELECT id, name, age FROM users ORDER BY name".to_string(), vec![])
            .await
            .expect("query");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fields[1].name, "name");
        assert_eq!(rows[0].get("name"), Some(&DataType::Str(Some("Alice".to_string()))));
        assert_eq!(rows[0].get("age"), Some(&DataType::Int64(Some(30))));
        assert!(rows[1].get("age").is_some_and(DataType::is_null));
        assert_eq!(rows[1].index, "1");
    }

    #[tokio::test]
    async fn returning_rows_from_insert() {
        let sqlite = Sqlite::memory().expect("open");
        sqlite
            .exec("CREATE TABLE t (id INTEGER PRIMARY KEY, v REAL)".to_string(), vec![])
            .await
            .expect("create table");

        let rows = sqlite
            .query(
                "INSERT INTO t (v) VALUES ($1) RETURNING id".to_string(),
                vec![DataType::Double(Some(1.5))],
            )
            .await
            .expect("insert returning");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id"), Some(&DataType::Int64(Some(1))));
    }

    #[tokio::test]
    async fn prepare_error_has_context() {
        let sqlite = Sqlite::memory().expect("open");
        let err = sqlite.query("SELEC 1".to_string(), vec![]).await.unwrap_err();
        assert_eq!(err.to_string(), "failed to prepare statement");
        assert!(format!("{err:#}").contains("syntax error"));
    }

    #[test]
    fn booleans_bind_as_integers() {
        use rusqlite::types::Value;

        assert_eq!(
            datatype_to_sqlite_value(&DataType::Boolean(Some(true))).unwrap(),
            Value::Integer(1)
        );
        assert_eq!(datatype_to_sqlite_value(&DataType::Uint32(None)).unwrap(), Value::Null);
        assert_eq!(
            datatype_to_sqlite_value(&DataType::Timestamp(Some("2024-01-15".to_string()))).unwrap(),
            Value::Text("2024-01-15".to_string())
        );
    }

    #[test]
    fn unsigned_values_must_fit_integer() {
        use rusqlite::types::Value;

        assert_eq!(
            datatype_to_sqlite_value(&DataType::Uint64(Some(42))).unwrap(),
            Value::Integer(42)
        );
        let err = datatype_to_sqlite_value(&DataType::Uint64(Some(u64::MAX))).unwrap_err();
        assert!(err.to_string().contains("out of range"), "{err}");
    }

    #[tokio::test]
    async fn oversized_unsigned_parameter_is_rejected() {
        let sqlite = Sqlite::memory().expect("open");
        sqlite
            .exec("CREATE TABLE t (n INTEGER)".to_string(), vec![])
            .await
            .expect("create table");

        let err = sqlite
            .exec("INSERT INTO t (n) VALUES (?)".to_string(), vec![DataType::Uint64(Some(u64::MAX))])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("out of range"), "{err}");

        let rows = sqlite.query("SELECT n FROM t".to_string(), vec![]).await.expect("query");
        assert!(rows.is_empty());
    }
}

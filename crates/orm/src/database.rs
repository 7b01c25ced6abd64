//! Connection plus the registry of tables known to the engine.

use std::sync::{Arc, LazyLock};

use anyhow::{Context, Result};
use parking_lot::RwLock;
use sea_query::{Alias, SchemaStatementBuilder, SqliteQueryBuilder, Table as DropTable};
use tracing::instrument;

use crate::error::Error;
use crate::model::Model;
use crate::schema::TableSchema;
use crate::{Backend, Connection, Row, Sqlite, Statement};

static CONNECTION: LazyLock<RwLock<Option<Database>>> = LazyLock::new(|| RwLock::new(None));

const REFLECT_SQL: &str =
    "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name";

const REFERENCED_SQL: &str = r#"SELECT DISTINCT "table" FROM pragma_foreign_key_list(?)"#;

#[derive(Clone, Debug)]
struct Table {
    name: String,
    // `None` for tables found by reflection
    schema: Option<Arc<TableSchema>>,
}

/// A connection and the tables registered against it.
///
/// Cloning is cheap; clones share the connection and the registry.
#[derive(Clone, Debug)]
pub struct Database {
    conn: Arc<dyn Connection>,
    tables: Arc<RwLock<Vec<Table>>>,
}

impl Database {
    /// Wrap `conn`, registering the tables that already exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the existing tables cannot be listed.
    pub async fn new(conn: impl Connection) -> Result<Self> {
        let db = Self {
            conn: Arc::new(conn),
            tables: Arc::new(RwLock::new(Vec::new())),
        };
        db.reflect().await?;
        Ok(db)
    }

    /// Open the SQLite database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub async fn sqlite(path: &str) -> Result<Self> {
        Self::new(Sqlite::open(path)?).await
    }

    /// Open the SQLite database configured by the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the database
    /// cannot be opened.
    pub async fn connect() -> Result<Self> {
        let conn = Sqlite::connect().await.context("connecting to configured database")?;
        Self::new(conn).await
    }

    /// The underlying connection.
    #[must_use]
    pub fn connection(&self) -> &dyn Connection {
        &*self.conn
    }

    /// Register existing tables not yet known.
    ///
    /// # Errors
    ///
    /// Returns an error if the existing tables cannot be listed.
    #[instrument(skip(self))]
    pub async fn reflect(&self) -> Result<()> {
        let rows = self.fetch(Statement::new(REFLECT_SQL)).await?;

        let mut names = Vec::with_capacity(rows.len());
        for row in &rows {
            match row.try_get("name")? {
                crate::DataType::Str(Some(name)) => names.push(name.clone()),
                other => anyhow::bail!("unexpected table name {other:?}"),
            }
        }

        let mut tables = self.tables.write();
        for name in names {
            if !tables.iter().any(|table| table.name == name) {
                tracing::debug!(table = %name, "reflected table");
                tables.push(Table { name, schema: None });
            }
        }
        Ok(())
    }

    /// Create the table for `M` if needed and register it. Referenced tables
    /// are created first. Registering an already registered model is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema is invalid or the table cannot be
    /// created; the table is then not registered.
    pub async fn add_model<M: Model>(&self) -> Result<Arc<TableSchema>> {
        let schema = M::schema()?;

        let mut pending = Vec::new();
        creation_order(&schema, &mut pending);

        for table in pending {
            if self.registered(table.name()).is_some() {
                continue;
            }

            let sql = table.create_sql();
            tracing::debug!(table = table.name(), sql = %sql, "creating table");
            self.execute(Statement::new(sql))
                .await
                .with_context(|| format!("failed to create table `{}`", table.name()))?;

            let mut tables = self.tables.write();
            if let Some(known) = tables.iter_mut().find(|known| known.name == table.name()) {
                known.schema = Some(Arc::clone(&table));
            } else {
                tables.push(Table {
                    name: table.name().to_string(),
                    schema: Some(Arc::clone(&table)),
                });
            }
        }

        Ok(schema)
    }

    /// The schema of `M`, creating its table on first use.
    ///
    /// # Errors
    ///
    /// See [`Database::add_model`].
    pub async fn get_table<M: Model>(&self) -> Result<Arc<TableSchema>> {
        if let Some(schema) = self.registered(M::NAME) {
            return Ok(schema);
        }
        self.add_model::<M>().await
    }

    fn registered(&self, name: &str) -> Option<Arc<TableSchema>> {
        self.tables
            .read()
            .iter()
            .find(|table| table.name == name)
            .and_then(|table| table.schema.clone())
    }

    /// Whether a table named `name` is known, by registration or reflection.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tables.read().iter().any(|table| table.name == name)
    }

    /// Names of the known tables, in registration order.
    #[must_use]
    pub fn tables(&self) -> Vec<String> {
        self.tables.read().iter().map(|table| table.name.clone()).collect()
    }

    /// Drop every known table and clear the registry. A table is dropped
    /// before any table it references.
    ///
    /// # Errors
    ///
    /// Returns an error if a table cannot be dropped. Tables not yet dropped
    /// remain registered.
    #[instrument(skip(self))]
    pub async fn drop_all(&self) -> Result<()> {
        let tables = self.tables.read().clone();

        let mut references = Vec::with_capacity(tables.len());
        for table in &tables {
            references.push(self.referenced_tables(table).await?);
        }

        for index in drop_order(&tables, &references) {
            let table = &tables[index];
            let sql = match &table.schema {
                Some(schema) => schema.drop_sql(),
                None => DropTable::drop()
                    .table(Alias::new(table.name.as_str()))
                    .if_exists()
                    .to_string(SqliteQueryBuilder),
            };
            self.execute(Statement::new(sql))
                .await
                .with_context(|| format!("failed to drop table `{}`", table.name))?;
            self.tables.write().retain(|known| known.name != table.name);
        }
        Ok(())
    }

    // names of the tables `table` holds foreign keys to
    async fn referenced_tables(&self, table: &Table) -> Result<Vec<String>> {
        if let Some(schema) = &table.schema {
            return Ok(schema.foreign_keys().map(|key| key.target.name().to_string()).collect());
        }

        let statement = Statement {
            sql: REFERENCED_SQL.to_string(),
            params: vec![crate::DataType::Str(Some(table.name.clone()))],
        };
        let rows = self.fetch(statement).await?;

        let mut names = Vec::with_capacity(rows.len());
        for row in &rows {
            match row.try_get("table")? {
                crate::DataType::Str(Some(name)) => names.push(name.clone()),
                other => anyhow::bail!("unexpected referenced table {other:?}"),
            }
        }
        Ok(names)
    }

    /// Run a statement for its side effects, returning the rows affected.
    ///
    /// # Errors
    ///
    /// Returns the engine's error.
    pub async fn execute(&self, statement: Statement) -> Result<u64> {
        statement.exec(&*self.conn).await
    }

    /// Run a statement returning rows.
    ///
    /// # Errors
    ///
    /// Returns the engine's error.
    pub async fn fetch(&self, statement: Statement) -> Result<Vec<Row>> {
        statement.query(&*self.conn).await
    }
}

// referenced tables before the tables referencing them
fn creation_order(schema: &Arc<TableSchema>, order: &mut Vec<Arc<TableSchema>>) {
    if order.iter().any(|known| known.name() == schema.name()) {
        return;
    }
    for reference in schema.foreign_keys() {
        if reference.target.name() != schema.name() {
            creation_order(&reference.target, order);
        }
    }
    order.push(Arc::clone(schema));
}

// indexes into `tables`, every referencing table ahead of the tables it
// references; `references[i]` names the tables `tables[i]` references
fn drop_order(tables: &[Table], references: &[Vec<String>]) -> Vec<usize> {
    fn visit(
        index: usize,
        tables: &[Table],
        references: &[Vec<String>],
        seen: &mut [bool],
        order: &mut Vec<usize>,
    ) {
        if seen[index] {
            return;
        }
        seen[index] = true;
        for name in &references[index] {
            if let Some(target) = tables.iter().position(|table| &table.name == name)
                && target != index
            {
                visit(target, tables, references, seen, order);
            }
        }
        order.push(index);
    }

    let mut seen = vec![false; tables.len()];
    let mut order = Vec::with_capacity(tables.len());
    for index in 0..tables.len() {
        visit(index, tables, references, &mut seen, &mut order);
    }
    order.reverse();
    order
}

/// Install `db` as the process-wide default connection, replacing any
/// previous one.
pub fn install_connection(db: Database) {
    *CONNECTION.write() = Some(db);
}

/// The process-wide default connection, if installed.
#[must_use]
pub fn connection() -> Option<Database> {
    CONNECTION.read().clone()
}

/// The process-wide default connection.
///
/// # Errors
///
/// Returns [`Error::NoConnection`] until [`install_connection`] is called.
pub fn require_connection() -> Result<Database> {
    connection().ok_or_else(|| Error::NoConnection.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reflected(names: &[&str]) -> Vec<Table> {
        names
            .iter()
            .map(|name| Table {
                name: (*name).to_string(),
                schema: None,
            })
            .collect()
    }

    #[test]
    fn referencing_tables_drop_first() {
        let tables = reflected(&["Child", "Parent", "Toy"]);
        let references = vec![
            vec!["Parent".to_string()],
            Vec::new(),
            vec!["Child".to_string(), "Toy".to_string()],
        ];

        let order: Vec<_> =
            drop_order(&tables, &references).into_iter().map(|i| tables[i].name.as_str()).collect();
        assert_eq!(order, ["Toy", "Child", "Parent"]);
    }

    #[test]
    fn unknown_targets_are_ignored() {
        let tables = reflected(&["audit", "Parent"]);
        let references = vec![vec!["gone".to_string()], Vec::new()];

        let order = drop_order(&tables, &references);
        assert_eq!(order.len(), 2);
        assert!(order.contains(&0) && order.contains(&1));
    }
}

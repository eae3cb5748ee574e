//! SQLite database backend implementation
//!
//! This module provides a SQLite implementation of the Database trait. Schema
//! introspection maps `PRAGMA table_info` onto the `DESCRIBE` shape.

use crate::core::{
    database::{Database, DEFAULT_OPERATION_TIMEOUT},
    database_types::DatabaseType,
    error::{DatabaseError, Result},
    schema::{ColumnDefinition, AUTO_INCREMENT_FLAG, PRIMARY_KEY_MARKER},
    value::{DatabaseResult, DatabaseRow, DatabaseValue, QueryParams},
};
use async_trait::async_trait;
use rusqlite::{types::Value, types::ValueRef, Connection, Row, Statement};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// SQLite database implementation
pub struct SqliteDatabase {
    connection: Arc<Mutex<Option<Connection>>>,
    connected: AtomicBool,
    in_transaction: Arc<AtomicBool>,
    operation_timeout: Duration,
}

impl SqliteDatabase {
    /// Create a new SQLite database instance
    pub fn new() -> Self {
        Self {
            connection: Arc::new(Mutex::new(None)),
            connected: AtomicBool::new(false),
            in_transaction: Arc::new(AtomicBool::new(false)),
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Set the deadline for each database operation
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Convert a rusqlite Row to a DatabaseRow
    fn row_to_database_row(row: &Row) -> rusqlite::Result<DatabaseRow> {
        let mut db_row = DatabaseRow::new();
        let column_count = row.as_ref().column_count();

        for i in 0..column_count {
            let column_name = row.as_ref().column_name(i)?.to_string();
            let value = match row.get_ref(i)? {
                ValueRef::Null => DatabaseValue::Null,
                ValueRef::Integer(v) => DatabaseValue::Long(v),
                ValueRef::Real(v) => DatabaseValue::Double(v),
                ValueRef::Text(v) => DatabaseValue::String(String::from_utf8_lossy(v).to_string()),
                ValueRef::Blob(v) => DatabaseValue::Bytes(v.to_vec()),
            };
            db_row.insert(column_name, value);
        }

        Ok(db_row)
    }

    /// Convert DatabaseValue to an owned rusqlite value
    fn value_to_sql(value: &DatabaseValue) -> Value {
        match value {
            DatabaseValue::Null => Value::Null,
            DatabaseValue::Bool(v) => Value::Integer(*v as i64),
            DatabaseValue::Int(v) => Value::Integer(*v as i64),
            DatabaseValue::Long(v) => Value::Integer(*v),
            DatabaseValue::Float(v) => Value::Real(*v as f64),
            DatabaseValue::Double(v) => Value::Real(*v),
            DatabaseValue::String(v) => Value::Text(v.clone()),
            DatabaseValue::Bytes(v) => Value::Blob(v.clone()),
        }
    }

    /// Bind positional or named parameters to a prepared statement
    fn bind_params(stmt: &mut Statement<'_>, params: &QueryParams) -> Result<()> {
        match params {
            QueryParams::None => {}
            QueryParams::Positional(values) => {
                let expected = stmt.parameter_count();
                if values.len() != expected {
                    return Err(DatabaseError::query(format!(
                        "statement expects {} parameters, {} given",
                        expected,
                        values.len()
                    )));
                }
                for (i, value) in values.iter().enumerate() {
                    stmt.raw_bind_parameter(i + 1, Self::value_to_sql(value))?;
                }
            }
            QueryParams::Named(entries) => {
                for (name, value) in entries {
                    let index = stmt.parameter_index(name)?.ok_or_else(|| {
                        DatabaseError::query(format!("statement has no parameter {}", name))
                    })?;
                    stmt.raw_bind_parameter(index, Self::value_to_sql(value))?;
                }
            }
        }
        Ok(())
    }

    /// Run blocking work against the open connection on the blocking pool, with timeout
    async fn run<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection_arc = Arc::clone(&self.connection);
        let timeout = self.operation_timeout;

        let mut task = tokio::task::spawn_blocking(move || -> Result<T> {
            let connection = connection_arc.blocking_lock();
            let conn = connection
                .as_ref()
                .ok_or_else(|| DatabaseError::connection("Not connected to database"))?;
            work(conn)
        });

        // Use select! to abort task on timeout, preventing resource leaks
        tokio::select! {
            result = &mut task => result?,
            _ = tokio::time::sleep(timeout) => {
                task.abort();
                Err(DatabaseError::query_timeout(timeout.as_millis() as u64))
            }
        }
    }

    /// Run a transaction-control statement, moving the transaction flag from `from` to `!from`
    ///
    /// The flag is checked and flipped while the connection is held.
    async fn transition(&self, sql: &'static str, from: bool) -> Result<()> {
        let in_transaction = Arc::clone(&self.in_transaction);
        self.run(move |conn| {
            if in_transaction.load(Ordering::Acquire) != from {
                return Err(DatabaseError::query(if from {
                    "Not in a transaction"
                } else {
                    "Already in a transaction"
                }));
            }
            // Execute SQL first, only flip the flag on success
            conn.execute(sql, [])?;
            in_transaction.store(!from, Ordering::Release);
            Ok(())
        })
        .await
    }

    /// Prepare, bind and execute one statement
    fn execute_bound(conn: &Connection, query: &str, params: &QueryParams) -> Result<u64> {
        let mut stmt = conn.prepare(query)?;
        Self::bind_params(&mut stmt, params)?;
        Ok(stmt.raw_execute()? as u64)
    }
}

/// Map `PRAGMA table_info` rows onto `DESCRIBE`-shaped definitions
///
/// A lone `integer` primary key aliases the rowid, so it is reported as `auto_increment`.
pub fn columns_from_table_info(rows: &DatabaseResult) -> Vec<ColumnDefinition> {
    let long = |row: &DatabaseRow, key: &str| row.get(key).and_then(DatabaseValue::as_long);
    let text = |row: &DatabaseRow, key: &str| row.get(key).and_then(DatabaseValue::to_text);

    let pk_columns = rows
        .iter()
        .filter(|row| long(row, "pk").unwrap_or(0) > 0)
        .count();

    rows.iter()
        .map(|row| {
            let column_type = text(row, "type").unwrap_or_default().to_lowercase();
            let is_pk = long(row, "pk").unwrap_or(0) > 0;
            let rowid_alias = is_pk && pk_columns == 1 && column_type == "integer";

            ColumnDefinition {
                field: text(row, "name").unwrap_or_default(),
                null: if long(row, "notnull").unwrap_or(0) != 0 || rowid_alias {
                    "NO".to_string()
                } else {
                    "YES".to_string()
                },
                key: if is_pk {
                    PRIMARY_KEY_MARKER.to_string()
                } else {
                    String::new()
                },
                default: text(row, "dflt_value").and_then(|d| unquote_default(&d)),
                extra: if rowid_alias {
                    AUTO_INCREMENT_FLAG.to_string()
                } else {
                    String::new()
                },
                column_type,
            }
        })
        .collect()
}

/// `'abc'` -> `abc`, `NULL` -> none, anything else verbatim
fn unquote_default(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("null") {
        return None;
    }
    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        return Some(raw[1..raw.len() - 1].replace("''", "'"));
    }
    Some(raw.to_string())
}

impl Default for SqliteDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    async fn connect(&self, connection_string: &str) -> Result<()> {
        // Clean up any existing connection first
        self.connected.store(false, Ordering::Release);
        {
            let mut connection = self.connection.lock().await;
            *connection = None;
        }

        // Reset transaction flag to handle failed/aborted attempts
        self.in_transaction.store(false, Ordering::Release);

        let connection_string = connection_string.to_string();
        let connection_arc = Arc::clone(&self.connection);
        let timeout = self.operation_timeout;

        let mut task = tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = Connection::open(&connection_string)
                .map_err(|e| DatabaseError::connection(format!("{}: {}", connection_string, e)))?;

            // Enable foreign keys
            conn.execute("PRAGMA foreign_keys = ON", [])
                .map_err(|e| DatabaseError::connection(e.to_string()))?;

            let mut connection = connection_arc.blocking_lock();
            *connection = Some(conn);

            Ok(())
        });

        tokio::select! {
            result = &mut task => result??,
            _ = tokio::time::sleep(timeout) => {
                task.abort();
                return Err(DatabaseError::connection(format!(
                    "connection attempt timed out after {}ms",
                    timeout.as_millis()
                )));
            }
        }

        self.connected.store(true, Ordering::Release);
        log::debug!("sqlite connected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::Release);

        // Clear transaction flag to prevent stale state after reconnect
        self.in_transaction.store(false, Ordering::Release);

        let mut connection = self.connection.lock().await;
        *connection = None;
        Ok(())
    }

    async fn query_with_params(
        &self,
        query: &str,
        params: &QueryParams,
    ) -> Result<DatabaseResult> {
        let query = query.to_string();
        let params = params.clone();

        self.run(move |conn| {
            let mut stmt = conn.prepare(&query)?;
            Self::bind_params(&mut stmt, &params)?;

            let mut results = Vec::new();
            let mut rows = stmt.raw_query();
            while let Some(row) = rows.next()? {
                results.push(Self::row_to_database_row(row)?);
            }
            Ok(results)
        })
        .await
    }

    async fn execute_with_params(&self, query: &str, params: &QueryParams) -> Result<u64> {
        let query = query.to_string();
        let params = params.clone();

        self.run(move |conn| Self::execute_bound(conn, &query, &params))
            .await
    }

    async fn insert_with_params(&self, query: &str, params: &QueryParams) -> Result<(u64, i64)> {
        let query = query.to_string();
        let params = params.clone();

        self.run(move |conn| {
            let nested = !conn.is_autocommit();
            let (open, close, undo) = if nested {
                (
                    "SAVEPOINT record_insert",
                    "RELEASE record_insert",
                    "ROLLBACK TO record_insert; RELEASE record_insert",
                )
            } else {
                ("BEGIN", "COMMIT", "ROLLBACK")
            };

            conn.execute_batch(open)?;
            let inserted = Self::execute_bound(conn, &query, &params).and_then(
                |affected| -> Result<(u64, i64)> {
                    let id = conn.last_insert_rowid();
                    conn.execute_batch(close)?;
                    Ok((affected, id))
                },
            );
            if inserted.is_err() {
                if let Err(undo_err) = conn.execute_batch(undo) {
                    log::warn!("undoing failed insert failed: {}", undo_err);
                }
            }
            inserted
        })
        .await
    }

    async fn last_insert_id(&self) -> Result<i64> {
        self.run(|conn| Ok(conn.last_insert_rowid())).await
    }

    async fn describe(&self, table: &str) -> Result<Vec<ColumnDefinition>> {
        let rows = self
            .query(&DatabaseType::Sqlite.describe_statement(table))
            .await?;
        Ok(columns_from_table_info(&rows))
    }

    async fn begin_transaction(&self) -> Result<()> {
        self.transition("BEGIN TRANSACTION", false).await
    }

    async fn commit(&self) -> Result<()> {
        self.transition("COMMIT", true).await
    }

    async fn rollback(&self) -> Result<()> {
        self.transition("ROLLBACK", true).await
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction.load(Ordering::Acquire)
    }
}

impl Drop for SqliteDatabase {
    fn drop(&mut self) {
        // Best-effort rollback of an open transaction; Drop cannot be async
        if self.in_transaction.load(Ordering::Acquire) {
            if let Ok(connection) = self.connection.try_lock() {
                if let Some(conn) = connection.as_ref() {
                    let _ = conn.execute("ROLLBACK", []);
                }
            }
        }
    }
}

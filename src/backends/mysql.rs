//! MySQL database backend implementation
//!
//! Holds one persistent connection, applies the configured character set after connecting
//! and introspects tables with `DESCRIBE`.

use crate::core::{
    database::{Database, DEFAULT_OPERATION_TIMEOUT},
    database_types::DatabaseType,
    error::{DatabaseError, Result},
    schema::{parse_description, ColumnDefinition},
    value::{DatabaseResult, DatabaseRow, DatabaseValue, QueryParams},
};
use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Opts, Params, Row, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Server error code for a table that does not exist
const ER_NO_SUCH_TABLE: u16 = 1146;

/// MySQL database implementation
pub struct MysqlDatabase {
    connection: Arc<Mutex<Option<Conn>>>,
    connected: AtomicBool,
    in_transaction: AtomicBool,
    last_insert_id: Mutex<u64>,
    charset: String,
    operation_timeout: Duration,
}

impl MysqlDatabase {
    /// Create a new MySQL database instance using `utf8`
    pub fn new() -> Self {
        Self {
            connection: Arc::new(Mutex::new(None)),
            connected: AtomicBool::new(false),
            in_transaction: AtomicBool::new(false),
            last_insert_id: Mutex::new(0),
            charset: "utf8".to_string(),
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Create an instance from connection parameters; call `connect` with
    /// `config.build_connection_string()` afterwards
    pub fn from_config(config: &crate::core::ConnectionConfig) -> Self {
        Self::new()
            .with_charset(config.charset.clone())
            .with_operation_timeout(config.timeout())
    }

    /// Character set sent with `SET NAMES` after connecting
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Set the deadline for each database operation
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    fn row_to_database_row(row: Row) -> DatabaseRow {
        let names: Vec<String> = row
            .columns_ref()
            .iter()
            .map(|c| c.name_str().into_owned())
            .collect();
        names
            .into_iter()
            .zip(row.unwrap())
            .map(|(name, value)| (name, Self::value_from_sql(value)))
            .collect()
    }

    fn value_from_sql(value: Value) -> DatabaseValue {
        match value {
            Value::NULL => DatabaseValue::Null,
            Value::Int(v) => DatabaseValue::Long(v),
            // Unsigned values past i64 keep their digits as text
            Value::UInt(v) => match i64::try_from(v) {
                Ok(v) => DatabaseValue::Long(v),
                Err(_) => DatabaseValue::String(v.to_string()),
            },
            Value::Float(v) => DatabaseValue::Float(v),
            Value::Double(v) => DatabaseValue::Double(v),
            Value::Bytes(bytes) => match String::from_utf8(bytes) {
                Ok(text) => DatabaseValue::String(text),
                Err(e) => DatabaseValue::Bytes(e.into_bytes()),
            },
            other => DatabaseValue::String(other.as_sql(true).trim_matches('\'').to_string()),
        }
    }

    fn value_to_sql(value: &DatabaseValue) -> Value {
        match value {
            DatabaseValue::Null => Value::NULL,
            DatabaseValue::Bool(v) => Value::Int(*v as i64),
            DatabaseValue::Int(v) => Value::Int(*v as i64),
            DatabaseValue::Long(v) => Value::Int(*v),
            DatabaseValue::Float(v) => Value::Float(*v),
            DatabaseValue::Double(v) => Value::Double(*v),
            DatabaseValue::String(v) => Value::Bytes(v.clone().into_bytes()),
            DatabaseValue::Bytes(v) => Value::Bytes(v.clone()),
        }
    }

    fn to_params(params: &QueryParams) -> Params {
        match params {
            QueryParams::None => Params::Empty,
            QueryParams::Positional(values) => {
                Params::Positional(values.iter().map(Self::value_to_sql).collect())
            }
            QueryParams::Named(entries) => Params::Named(
                entries
                    .iter()
                    .map(|(name, value)| {
                        (
                            name.trim_start_matches(':').as_bytes().to_vec(),
                            Self::value_to_sql(value),
                        )
                    })
                    .collect::<HashMap<_, _>>(),
            ),
        }
    }

    /// Store the id an OK packet reported; none reported means the statement generated none
    async fn record_insert_id(&self, reported: Option<u64>) -> u64 {
        let id = reported.unwrap_or(0);
        *self.last_insert_id.lock().await = id;
        id
    }

    fn to_generated_id(id: u64) -> Result<i64> {
        i64::try_from(id)
            .map_err(|_| DatabaseError::unexpected(format!("generated id {} exceeds i64", id)))
    }

    /// Run a transaction-control statement, moving the transaction flag from `from` to `!from`
    ///
    /// The flag is checked and flipped while the connection is held.
    async fn transition(&self, sql: &'static str, from: bool) -> Result<()> {
        let mut connection = self.connection.lock().await;
        let conn = connection
            .as_mut()
            .ok_or_else(|| DatabaseError::connection("Not connected to database"))?;

        if self.in_transaction.load(Ordering::Acquire) != from {
            return Err(DatabaseError::query(if from {
                "Not in a transaction"
            } else {
                "Already in a transaction"
            }));
        }
        self.with_deadline(async {
            conn.query_drop(sql).await?;
            Ok::<_, DatabaseError>(())
        })
        .await?;
        self.in_transaction.store(!from, Ordering::Release);
        Ok(())
    }

    async fn with_deadline<T>(&self, work: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.operation_timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(DatabaseError::query_timeout(
                self.operation_timeout.as_millis() as u64,
            )),
        }
    }
}

impl Default for MysqlDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Database for MysqlDatabase {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Mysql
    }

    async fn connect(&self, connection_string: &str) -> Result<()> {
        let opts = Opts::from_url(connection_string)
            .map_err(|e| DatabaseError::connection(e.to_string()))?;

        let mut connection = self.connection.lock().await;
        self.connected.store(false, Ordering::Release);
        if let Some(old) = connection.take() {
            let _ = old.disconnect().await;
        }
        self.in_transaction.store(false, Ordering::Release);

        let charset = self.charset.clone();
        let conn = self
            .with_deadline(async move {
                let mut conn = Conn::new(opts)
                    .await
                    .map_err(|e| DatabaseError::connection(e.to_string()))?;
                conn.query_drop(format!("SET NAMES '{}'", charset))
                    .await
                    .map_err(|e| DatabaseError::connection(e.to_string()))?;
                Ok::<_, DatabaseError>(conn)
            })
            .await
            .map_err(|e| match e {
                DatabaseError::QueryExecutionFailure(msg) => DatabaseError::connection(msg),
                other => other,
            })?;

        *connection = Some(conn);
        self.connected.store(true, Ordering::Release);
        log::debug!("mysql connected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::Release);
        self.in_transaction.store(false, Ordering::Release);
        let mut connection = self.connection.lock().await;
        if let Some(conn) = connection.take() {
            conn.disconnect().await?;
        }
        Ok(())
    }

    async fn query_with_params(
        &self,
        query: &str,
        params: &QueryParams,
    ) -> Result<DatabaseResult> {
        let mut connection = self.connection.lock().await;
        let conn = connection
            .as_mut()
            .ok_or_else(|| DatabaseError::connection("Not connected to database"))?;

        let rows: Vec<Row> = self
            .with_deadline(async {
                let rows: Vec<Row> = match params {
                    QueryParams::None => conn.query(query).await?,
                    other => conn.exec(query, Self::to_params(other)).await?,
                };
                Ok::<_, DatabaseError>(rows)
            })
            .await?;

        Ok(rows.into_iter().map(Self::row_to_database_row).collect())
    }

    async fn execute_with_params(&self, query: &str, params: &QueryParams) -> Result<u64> {
        let mut connection = self.connection.lock().await;
        let conn = connection
            .as_mut()
            .ok_or_else(|| DatabaseError::connection("Not connected to database"))?;

        let (affected, insert_id) = self
            .with_deadline(async {
                match params {
                    QueryParams::None => conn.query_drop(query).await?,
                    other => conn.exec_drop(query, Self::to_params(other)).await?,
                }
                Ok::<_, DatabaseError>((conn.affected_rows(), conn.last_insert_id()))
            })
            .await?;

        self.record_insert_id(insert_id).await;
        Ok(affected)
    }

    async fn insert_with_params(&self, query: &str, params: &QueryParams) -> Result<(u64, i64)> {
        let mut connection = self.connection.lock().await;
        let conn = connection
            .as_mut()
            .ok_or_else(|| DatabaseError::connection("Not connected to database"))?;

        let (open, close, undo) = if self.in_transaction.load(Ordering::Acquire) {
            (
                "SAVEPOINT record_insert",
                "RELEASE SAVEPOINT record_insert",
                "ROLLBACK TO SAVEPOINT record_insert",
            )
        } else {
            ("START TRANSACTION", "COMMIT", "ROLLBACK")
        };

        let (affected, insert_id) = self
            .with_deadline(async {
                conn.query_drop(open).await?;
                let inserted = match params {
                    QueryParams::None => conn.query_drop(query).await,
                    other => conn.exec_drop(query, Self::to_params(other)).await,
                };
                let reported = (conn.affected_rows(), conn.last_insert_id());
                let closed = match inserted {
                    Ok(()) => conn.query_drop(close).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = closed {
                    if let Err(undo_err) = conn.query_drop(undo).await {
                        log::warn!("undoing failed insert failed: {}", undo_err);
                    }
                    return Err(DatabaseError::from(e));
                }
                Ok::<_, DatabaseError>(reported)
            })
            .await?;

        let id = self.record_insert_id(insert_id).await;
        Ok((affected, Self::to_generated_id(id)?))
    }

    async fn last_insert_id(&self) -> Result<i64> {
        Self::to_generated_id(*self.last_insert_id.lock().await)
    }

    async fn describe(&self, table: &str) -> Result<Vec<ColumnDefinition>> {
        let statement = DatabaseType::Mysql.describe_statement(table);
        let mut connection = self.connection.lock().await;
        let conn = connection
            .as_mut()
            .ok_or_else(|| DatabaseError::connection("Not connected to database"))?;

        let rows: Option<Vec<Row>> = self
            .with_deadline(async {
                match conn.query::<Row, _>(statement.as_str()).await {
                    Ok(rows) => Ok(Some(rows)),
                    Err(mysql_async::Error::Server(e)) if e.code == ER_NO_SUCH_TABLE => Ok(None),
                    Err(e) => Err(DatabaseError::from(e)),
                }
            })
            .await?;

        match rows {
            Some(rows) => {
                let rows: DatabaseResult =
                    rows.into_iter().map(Self::row_to_database_row).collect();
                parse_description(&rows)
            }
            None => Ok(Vec::new()),
        }
    }

    async fn begin_transaction(&self) -> Result<()> {
        self.transition("START TRANSACTION", false).await
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

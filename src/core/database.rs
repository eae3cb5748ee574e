//! Database trait and connection configuration
//!
//! The [`Database`] trait is the connection provider the mapper executes through. It owns
//! the live handle; the mapper only borrows it for the duration of each call.

use super::database_types::DatabaseType;
use super::error::{DatabaseError, Result};
use super::schema::ColumnDefinition;
use super::value::{DatabaseResult, QueryParams};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default timeout for database operations (30 seconds)
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection provider that every backend implements
///
/// A provider holds one connection, so a transaction is connection-wide: while one is open,
/// statements from every caller sharing the provider run inside it.
#[async_trait]
pub trait Database: Send + Sync {
    /// Get the database type
    fn database_type(&self) -> DatabaseType;

    /// Connect to the database with the given connection string
    async fn connect(&self, connection_string: &str) -> Result<()>;

    /// Check if connected to the database
    fn is_connected(&self) -> bool;

    /// Disconnect from the database
    async fn disconnect(&self) -> Result<()>;

    /// Execute a statement without parameters, returning the affected row count
    ///
    /// # Security Warning
    ///
    /// The text is executed as-is. Use `execute_with_params()` for anything carrying user
    /// input.
    async fn execute(&self, query: &str) -> Result<u64> {
        self.execute_with_params(query, &QueryParams::None).await
    }

    /// Run a query without parameters and return its rows
    async fn query(&self, query: &str) -> Result<DatabaseResult> {
        self.query_with_params(query, &QueryParams::None).await
    }

    /// Run a prepared query and return its rows
    async fn query_with_params(&self, query: &str, params: &QueryParams)
        -> Result<DatabaseResult>;

    /// Execute a prepared statement, returning the affected row count
    async fn execute_with_params(&self, query: &str, params: &QueryParams) -> Result<u64>;

    /// Run an INSERT atomically, returning the affected row count and its generated identifier
    ///
    /// The statement and the identifier read happen while the connection is held, so no
    /// other statement can land between them. Outside a transaction the INSERT runs in its
    /// own BEGIN/COMMIT; inside one it runs under a savepoint of the open transaction. A
    /// failure rolls back only the INSERT. The identifier is 0 when the statement
    /// generated none.
    async fn insert_with_params(&self, query: &str, params: &QueryParams) -> Result<(u64, i64)>;

    /// Identifier generated by the most recent INSERT on this connection
    async fn last_insert_id(&self) -> Result<i64>;

    /// Describe a table's columns in `DESCRIBE` shape
    ///
    /// A missing table yields an empty list or a query error, depending on the dialect.
    async fn describe(&self, table: &str) -> Result<Vec<ColumnDefinition>>;

    /// Begin a transaction
    async fn begin_transaction(&self) -> Result<()>;

    /// Commit the current transaction
    async fn commit(&self) -> Result<()>;

    /// Rollback the current transaction
    async fn rollback(&self) -> Result<()>;

    /// Check if currently in a transaction
    fn in_transaction(&self) -> bool;
}

/// Connection parameters, treated as opaque by the mapper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub db_type: DatabaseType,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Character set applied after connecting (`SET NAMES`)
    pub charset: String,
    /// Deadline for a single statement, in milliseconds
    pub operation_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            db_type: DatabaseType::default(),
            host: None,
            port: None,
            database: None,
            username: None,
            password: None,
            charset: "utf8".to_string(),
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT.as_millis() as u64,
        }
    }
}

impl ConnectionConfig {
    /// Create a configuration for the specified database type
    pub fn new(db_type: DatabaseType) -> Self {
        Self {
            db_type,
            ..Default::default()
        }
    }

    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| DatabaseError::unexpected(format!("invalid connection config: {}", e)))
    }

    /// Set the database host
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the database port
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the database name (the file path for SQLite)
    pub fn database<S: Into<String>>(mut self, database: S) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the username
    pub fn username<S: Into<String>>(mut self, username: S) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the password
    pub fn password<S: Into<String>>(mut self, password: S) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the connection character set
    pub fn charset<S: Into<String>>(mut self, charset: S) -> Self {
        self.charset = charset.into();
        self
    }

    /// Set the per-statement deadline
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Per-statement deadline
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// Build the connection string
    pub fn build_connection_string(&self) -> String {
        match self.db_type {
            DatabaseType::Sqlite => self
                .database
                .clone()
                .unwrap_or_else(|| ":memory:".to_string()),
            DatabaseType::Mysql => {
                let host = self.host.as_deref().unwrap_or("localhost");
                let port = self.port.or(self.db_type.default_port()).unwrap_or(3306);
                let database = self.database.as_deref().unwrap_or("");
                let username = self.username.as_deref().unwrap_or("root");
                let password = self.password.as_deref().unwrap_or("");
                format!(
                    "mysql://{}:{}@{}:{}/{}",
                    username, password, host, port, database
                )
            }
        }
    }
}

//! Error types for the record mapper
//!
//! Every failure the mapper can raise falls into one of four kinds. Driver-level errors are
//! translated into these kinds at the point where they cross into the mapper.

use std::fmt;

/// Result type alias for mapper operations
pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Classification of a [`DatabaseError`], with a stable numeric code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Anything not otherwise classified
    Unexpected,
    /// The database rejected or failed to execute a statement
    QueryExecution,
    /// The database is unreachable or refused the credentials
    Connection,
    /// Introspection returned no columns for a table
    SchemaRetrieval,
}

impl ErrorKind {
    /// Numeric code reported to diagnostics
    pub fn code(&self) -> u32 {
        match self {
            ErrorKind::Unexpected => 10000,
            ErrorKind::QueryExecution => 10001,
            ErrorKind::Connection => 10002,
            ErrorKind::SchemaRetrieval => 10003,
        }
    }

    /// Base message for this kind, before any detail is appended
    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::Unexpected => "An unexpected error has occurred",
            ErrorKind::QueryExecution => "Query execution failed:",
            ErrorKind::Connection => "Could not connect to database.",
            ErrorKind::SchemaRetrieval => "Could not retrieve table structure attributes.",
        }
    }

    /// Short identifier used in log output
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unexpected => "unexpected_error",
            ErrorKind::QueryExecution => "query_execution_failure",
            ErrorKind::Connection => "connection_failure",
            ErrorKind::SchemaRetrieval => "schema_retrieval_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error types for mapper operations
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Database unreachable, authentication rejected, or the provider is not connected
    #[error("{base} Notes: {0}", base = ErrorKind::Connection.message())]
    ConnectionFailure(String),

    /// Introspection returned no columns for the table
    #[error("{base} Notes: table `{table}`", base = ErrorKind::SchemaRetrieval.message())]
    SchemaRetrievalFailure { table: String },

    /// The database rejected or failed to execute a statement; carries the driver message
    #[error("{base} {0}", base = ErrorKind::QueryExecution.message())]
    QueryExecutionFailure(String),

    /// Catch-all
    #[error("{base}. Notes: {0}", base = ErrorKind::Unexpected.message())]
    UnexpectedError(String),
}

impl DatabaseError {
    /// Create a connection failure
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        DatabaseError::ConnectionFailure(msg.into())
    }

    /// Create a schema retrieval failure for a table
    pub fn schema_retrieval<S: Into<String>>(table: S) -> Self {
        DatabaseError::SchemaRetrievalFailure {
            table: table.into(),
        }
    }

    /// Create a query execution failure
    pub fn query<S: Into<String>>(msg: S) -> Self {
        DatabaseError::QueryExecutionFailure(msg.into())
    }

    /// Create a query execution failure for an operation that ran past its deadline
    pub fn query_timeout(timeout_ms: u64) -> Self {
        DatabaseError::QueryExecutionFailure(format!("operation timed out after {}ms", timeout_ms))
    }

    /// Create an unexpected error
    pub fn unexpected<S: Into<String>>(msg: S) -> Self {
        DatabaseError::UnexpectedError(msg.into())
    }

    /// Kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            DatabaseError::ConnectionFailure(_) => ErrorKind::Connection,
            DatabaseError::SchemaRetrievalFailure { .. } => ErrorKind::SchemaRetrieval,
            DatabaseError::QueryExecutionFailure(_) => ErrorKind::QueryExecution,
            DatabaseError::UnexpectedError(_) => ErrorKind::Unexpected,
        }
    }

    /// Numeric code of this error's kind
    pub fn code(&self) -> u32 {
        self.kind().code()
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        DatabaseError::QueryExecutionFailure(err.to_string())
    }
}

#[cfg(feature = "mysql")]
impl From<mysql_async::Error> for DatabaseError {
    fn from(err: mysql_async::Error) -> Self {
        match err {
            mysql_async::Error::Io(e) => DatabaseError::ConnectionFailure(e.to_string()),
            other => DatabaseError::QueryExecutionFailure(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for DatabaseError {
    fn from(err: tokio::task::JoinError) -> Self {
        DatabaseError::UnexpectedError(format!("Task join error: {}", err))
    }
}

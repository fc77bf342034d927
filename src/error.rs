//! Error types for the adoption database engine.
//!
//! This module defines all error types using `thiserror`. Every error that
//! leaves the engine carries enough context (statement text, parameters,
//! migration step) for the HTTP layer to render an accurate response.

use thiserror::Error;

/// SQLSTATE for `unique_violation`.
pub const SQLSTATE_UNIQUE_VIOLATION: &str = "23505";

/// SQLSTATE for `foreign_key_violation`.
pub const SQLSTATE_FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Error, Debug)]
pub enum DbError {
    #[error("No connection available within {waited_ms}ms")]
    PoolExhaustedOrTimeout { waited_ms: u64 },

    #[error("Connection pool is closed")]
    PoolClosed,

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Statement failed: {message}")]
    Statement {
        message: String,
        /// e.g., "23505" for unique violation
        sql_state: Option<String>,
        sql: String,
        /// Rendered positional parameters, in order
        params: Vec<String>,
    },

    #[error("Query timed out after {timeout_ms}ms")]
    QueryTimeout { timeout_ms: u64, sql: String },

    #[error("Migration step '{step}' failed: {message}")]
    Migration { step: String, message: String },

    #[error("Another migration run is in progress")]
    MigrationInProgress,

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a statement error.
    pub fn statement(
        message: impl Into<String>,
        sql_state: Option<String>,
        sql: impl Into<String>,
        params: Vec<String>,
    ) -> Self {
        Self::Statement {
            message: message.into(),
            sql_state,
            sql: sql.into(),
            params,
        }
    }

    pub fn query_timeout(timeout_ms: u64, sql: impl Into<String>) -> Self {
        Self::QueryTimeout {
            timeout_ms,
            sql: sql.into(),
        }
    }

    /// Create a migration step failure.
    pub fn migration(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Migration {
            step: step.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Attach statement text and parameters to a driver error.
    ///
    /// Database-level failures become [`DbError::Statement`]; pool and
    /// connection failures keep their own variant.
    pub fn from_sqlx(err: sqlx::Error, sql: &str, params: Vec<String>) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::statement(db_err.message(), code, sql, params)
            }
            sqlx::Error::RowNotFound => {
                DbError::statement("No rows returned", None, sql, params)
            }
            sqlx::Error::ColumnDecode { index, source } => DbError::statement(
                format!("Failed to decode column {}: {}", index, source),
                None,
                sql,
                params,
            ),
            other => DbError::from(other),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::PoolExhaustedOrTimeout { .. } => {
                Some("Raise DB_MAX_CONNECTIONS or DB_CONNECTION_TIMEOUT_MS, or shorten transactions")
            }
            Self::QueryTimeout { .. } => Some(
                "The statement may still have completed at the store; re-read before retrying writes",
            ),
            _ => None,
        }
    }

    /// SQLSTATE of a statement failure.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Statement { sql_state, .. } => sql_state.as_deref(),
            _ => None,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        self.sql_state() == Some(SQLSTATE_UNIQUE_VIOLATION)
    }

    /// A referenced row is missing, or a delete would orphan dependents.
    pub fn is_foreign_key_violation(&self) -> bool {
        self.sql_state() == Some(SQLSTATE_FOREIGN_KEY_VIOLATION)
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::PoolExhaustedOrTimeout { .. } | Self::QueryTimeout { .. }
        )
    }
}

/// Convert sqlx errors that carry no statement context.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check DB_HOST, DB_PORT, DB_NAME and the credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::statement(db_err.message(), code, "", Vec::new())
            }
            // The acquire deadline is not carried by the driver error; callers
            // that know it rewrite this via `ConnectionPool::acquire`.
            sqlx::Error::PoolTimedOut => DbError::PoolExhaustedOrTimeout { waited_ms: 0 },
            sqlx::Error::PoolClosed => DbError::PoolClosed,
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

//! Error types for the SQL query generator.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Setup failures (connection, embedding model, configuration) abort a session;
//! per-attempt failures (generation, execution) are absorbed by the retry loop.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Execution failed: {message}")]
    Execution {
        message: String,
        /// e.g., "42S02" for unknown table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Schema error: {message} (object: {object})")]
    Schema { message: String, object: String },

    #[error("Embedding error: {message}")]
    Embedding { message: String },

    #[error("Generation failed: {message}")]
    Generation {
        message: String,
        /// HTTP status from the model provider, when one was received
        status: Option<u16>,
    },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create an execution error with optional SQL state.
    pub fn execution(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Execution {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create a schema error.
    pub fn schema(message: impl Into<String>, object: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            object: object.into(),
        }
    }

    /// Create an embedding error.
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
        }
    }

    /// Create a generation error.
    pub fn generation(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Generation {
            message: message.into(),
            status,
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Execution { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Whether the retry loop absorbs this error as one failed attempt.
    ///
    /// Everything else (connection loss, embedding failures, configuration,
    /// internal faults) ends the question.
    pub fn is_attempt_failure(&self) -> bool {
        matches!(
            self,
            Self::Execution { .. }
                | Self::Generation { .. }
                | Self::Timeout { .. }
                | Self::InvalidInput { .. }
                | Self::Schema { .. }
        )
    }

    /// Human-readable message shown next to a failed attempt.
    pub fn attempt_message(&self) -> String {
        match self {
            Self::Execution {
                message,
                sql_state: Some(code),
                ..
            } => format!("{} (SQLSTATE: {})", message, code),
            Self::Execution { message, .. } => message.clone(),
            Self::Generation {
                message,
                status: Some(status),
            } => format!("{} (HTTP {})", message, status),
            _ => self.to_string(),
        }
    }
}

/// Convert sqlx errors to AppError.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => AppError::connection(
                msg.to_string(),
                "Check the connection parameters and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                AppError::execution(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => AppError::execution(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::PoolTimedOut => AppError::connection(
                "Timed out waiting for a database connection",
                "Check that the database server is reachable, or raise --connect-timeout",
            ),
            sqlx::Error::PoolClosed => {
                AppError::connection("Connection pool is closed", "Reconnect to the database")
            }
            sqlx::Error::Io(io_err) => AppError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => AppError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => AppError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::TypeNotFound { type_name } => AppError::schema(
                format!("Type not found: {}", type_name),
                type_name.to_string(),
            ),
            sqlx::Error::ColumnNotFound(col) => {
                AppError::schema(format!("Column not found: {}", col), col.to_string())
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => AppError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                AppError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => AppError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => AppError::internal("Database worker crashed"),
            _ => AppError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Convert HTTP client errors from model providers.
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        if err.is_timeout() {
            return AppError::generation(format!("Request timed out: {}", err), status);
        }
        AppError::generation(err.to_string(), status)
    }
}

/// Result type alias used across the crate.
pub type AppResult<T> = Result<T, AppError>;

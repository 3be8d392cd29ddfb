//! Error types for the PostgreSQL storage backend.

use sqlx_core::error::Error as SqlxError;
use wimo_storage::StorageError;

/// Errors specific to the PostgreSQL storage backend.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Error reported by the driver or the database.
    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The requested collection name cannot be used as a table name.
    #[error("Invalid collection name: {name}")]
    InvalidCollection { name: String },
}

impl PostgresError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_collection(name: impl Into<String>) -> Self {
        Self::InvalidCollection { name: name.into() }
    }

    /// Returns `true` if the database could not be reached.
    #[must_use]
    pub fn is_connection_failure(&self) -> bool {
        match self {
            Self::Database(e) => is_connection_failure(e),
            _ => false,
        }
    }
}

/// Returns `true` for driver errors caused by an unreachable database.
pub fn is_connection_failure(err: &SqlxError) -> bool {
    matches!(
        err,
        SqlxError::Io(_)
            | SqlxError::Tls(_)
            | SqlxError::PoolTimedOut
            | SqlxError::PoolClosed
            | SqlxError::WorkerCrashed
    )
}

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        if err.is_connection_failure() {
            return StorageError::unavailable(err.to_string());
        }
        match err {
            PostgresError::InvalidCollection { name } => {
                StorageError::invalid_arguments(format!("Invalid collection name: {name}"))
            }
            other => StorageError::internal(other.to_string()),
        }
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;

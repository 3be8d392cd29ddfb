//! Storage error types for the persistence layer.

use std::fmt;
use std::time::Duration;

/// Errors that can occur during persistence operations.
///
/// "Not found" is never an error here: reads return an empty list, updates
/// return `None` and deletes return `false`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    /// The caller passed an inconsistent combination of arguments.
    #[error("Invalid arguments: {message}")]
    InvalidArguments {
        /// What was wrong with the call.
        message: String,
    },

    /// The backend could not be reached.
    #[error("Storage unavailable: {message}")]
    Unavailable {
        /// Description of the connection failure.
        message: String,
    },

    /// A backend call did not complete within the configured timeout.
    #[error("Storage operation '{operation}' timed out after {timeout_ms}ms")]
    Timeout {
        /// The facade operation that timed out.
        operation: &'static str,
        /// The timeout that was exceeded.
        timeout_ms: u64,
    },

    /// A stored document could not be read back as a key/value mapping.
    #[error("Invalid stored document: {message}")]
    InvalidDocument {
        /// Description of the malformed document.
        message: String,
    },

    /// An internal backend error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `InvalidArguments` error.
    #[must_use]
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            message: message.into(),
        }
    }

    /// Creates a new `Unavailable` error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout(operation: &'static str, timeout: Duration) -> Self {
        Self::Timeout {
            operation,
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Creates a new `InvalidDocument` error.
    #[must_use]
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is an invalid arguments error.
    #[must_use]
    pub fn is_invalid_arguments(&self) -> bool {
        matches!(self, Self::InvalidArguments { .. })
    }

    /// Returns `true` if the backend was unreachable or too slow.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }

    /// Returns `true` if repeating the call may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.is_unavailable()
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidArguments { .. } => ErrorCategory::InvalidArguments,
            Self::Unavailable { .. } | Self::Timeout { .. } => ErrorCategory::Infrastructure,
            Self::InvalidDocument { .. } => ErrorCategory::InvalidDocument,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of storage errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Programming error on the caller side.
    InvalidArguments,
    /// Connection or timeout failure.
    Infrastructure,
    /// Stored data did not have the expected shape.
    InvalidDocument,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArguments => write!(f, "invalid_arguments"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::InvalidDocument => write!(f, "invalid_document"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

impl From<StorageError> for wimo_api::ApiError {
    fn from(err: StorageError) -> Self {
        match &err {
            StorageError::Unavailable { .. } | StorageError::Timeout { .. } => {
                wimo_api::ApiError::service_unavailable(err.to_string())
            }
            StorageError::InvalidArguments { .. } => wimo_api::ApiError::bad_request(err.to_string()),
            StorageError::InvalidDocument { .. } | StorageError::Internal { .. } => {
                wimo_api::ApiError::internal(err.to_string())
            }
        }
    }
}

//! Authentication and authorization error types.

use axum::response::{IntoResponse, Response};
use wimo_api::ApiError;
use wimo_core::ValidationErrors;
use wimo_storage::StorageError;

/// Message returned for a missing, malformed or unknown bearer token.
pub const UNAUTHORIZED_ACCESS: &str = "Unauthorized access";

/// Message returned when the token owner's role group lacks a permission.
pub const UNAUTHORIZED_USER_LEVEL: &str = "Unauthorized user level";

/// Errors that can occur during authentication, authorization and
/// repository operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request lacks valid authentication credentials.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Description of why the request is unauthorized.
        message: String,
    },

    /// The authenticated user does not have permission to perform the action.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Description of why access is forbidden.
        message: String,
    },

    /// Input data does not match the entity schema.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// The persistence layer failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The request is malformed.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// An internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this error should be reported as 401.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::Forbidden { .. })
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthorized { message } | AuthError::Forbidden { message } => {
                ApiError::unauthorized(message)
            }
            AuthError::Validation(errors) => ApiError::bad_request_with_details(
                format!("Validation failed: {errors}"),
                serde_json::to_value(&errors).unwrap_or_default(),
            ),
            AuthError::Storage(e) => e.into(),
            AuthError::InvalidRequest { message } => ApiError::bad_request(message),
            AuthError::Internal { message } => ApiError::internal(message),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

/// Result type alias for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;

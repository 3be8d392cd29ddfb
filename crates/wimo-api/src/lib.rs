//! Response envelope and error types shared by the WiMo HTTP handlers.
//!
//! Every response body, successful or not, is the same three-way envelope:
//!
//! ```json
//! {"status": "success" | "notice" | "error", "message": "...", "data": ...}
//! ```
//!
//! `notice` marks an expected negative outcome (unknown user, wrong
//! password) and is returned with a 2xx status; `error` is reserved for
//! failures.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// -------------------------
// Envelope
// -------------------------

/// Outcome kind carried in every response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Notice,
    Error,
}

/// The response envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    #[serde(skip)]
    http_status: StatusCode,
    pub status: Status,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ApiResponse {
    fn new(http_status: StatusCode, status: Status, message: impl Into<String>) -> Self {
        Self {
            http_status,
            status,
            message: message.into(),
            data: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, Status::Success, message)
    }

    pub fn notice(message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, Status::Notice, message)
    }

    pub fn error(http_status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(http_status, Status::Error, message)
    }

    #[must_use]
    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    #[must_use]
    pub fn with_status(mut self, http_status: StatusCode) -> Self {
        self.http_status = http_status;
        self
    }

    pub fn http_status(&self) -> StatusCode {
        self.http_status
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (self.http_status, Json(self)).into_response()
    }
}

// -------------------------
// Errors
// -------------------------

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Bad request: {message}")]
    BadRequest {
        message: String,
        details: Option<Value>,
    },
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest {
            message: msg.into(),
            details: None,
        }
    }
    pub fn bad_request_with_details(msg: impl Into<String>, details: impl Into<Value>) -> Self {
        Self::BadRequest {
            message: msg.into(),
            details: Some(details.into()),
        }
    }
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The envelope rendered for this error.
    pub fn to_response(&self) -> ApiResponse {
        let status = self.status_code();
        match self {
            ApiError::BadRequest { message, details } => {
                let response = ApiResponse::error(status, message.clone());
                match details {
                    Some(details) => response.with_data(details.clone()),
                    None => response,
                }
            }
            ApiError::Unauthorized(msg)
            | ApiError::NotFound(msg)
            | ApiError::ServiceUnavailable(msg)
            | ApiError::Internal(msg) => ApiResponse::error(status, msg.clone()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status_code().is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        self.to_response().into_response()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

//! Axum extractors for bearer tokens and HTTP Basic credentials.
//!
//! # Example
//!
//! ```ignore
//! use wimo_auth::{AuthState, BearerAuth};
//!
//! async fn protected(BearerAuth(token): BearerAuth) -> String {
//!     format!("token {}", wimo_core::log_prefix(&token))
//! }
//! ```

use axum::extract::{FromRef, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use base64::{Engine, engine::general_purpose::STANDARD};
use wimo_core::log_prefix;

use crate::authenticator::Authenticator;
use crate::error::{AuthError, UNAUTHORIZED_ACCESS};

/// State required by the extractors.
///
/// Include it in the application state and expose it through `FromRef`.
#[derive(Debug, Clone)]
pub struct AuthState {
    pub authenticator: Authenticator,
}

impl AuthState {
    #[must_use]
    pub fn new(authenticator: Authenticator) -> Self {
        Self { authenticator }
    }
}

/// A bearer token that passed [`Authenticator::verify`].
///
/// Rejects with 401 "Unauthorized access" when the header is missing,
/// malformed, or names an unknown token.
#[derive(Debug, Clone)]
pub struct BearerAuth(pub String);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(parse_bearer)
            .ok_or_else(|| AuthError::unauthorized(UNAUTHORIZED_ACCESS))?;

        if !auth_state.authenticator.verify(token).await? {
            tracing::info!(
                token = %log_prefix(token),
                endpoint = %parts.uri.path(),
                "Rejected unknown token"
            );
            return Err(AuthError::unauthorized(UNAUTHORIZED_ACCESS));
        }

        Ok(BearerAuth(token.to_string()))
    }
}

/// Username and password from an `Authorization: Basic` header.
///
/// Both are empty when the header is absent or uses another scheme, so the
/// handler can answer with a notice instead of a rejection. Use
/// [`has_basic_auth`] to tell the two apart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl<S> FromRequestParts<S> for BasicCredentials
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Self::default());
        };
        let header = header
            .to_str()
            .map_err(|_| AuthError::invalid_request("Invalid Authorization header"))?;
        if !header.starts_with(BASIC_PREFIX) {
            return Ok(Self::default());
        }
        let (username, password) = parse_basic_auth(header).map_err(AuthError::invalid_request)?;
        Ok(Self { username, password })
    }
}

const BASIC_PREFIX: &str = "Basic ";

/// Whether the request carries an `Authorization` header with the Basic
/// scheme.
#[must_use]
pub fn has_basic_auth(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .is_some_and(|h| h.as_bytes().starts_with(BASIC_PREFIX.as_bytes()))
}

fn parse_bearer(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Parse Basic Auth header.
///
/// Extracts credentials from "Basic <base64>" format.
fn parse_basic_auth(header: &str) -> Result<(String, String), String> {
    let credentials = header
        .strip_prefix(BASIC_PREFIX)
        .ok_or_else(|| "Authorization header must start with 'Basic '".to_string())?;

    let decoded = STANDARD
        .decode(credentials.trim())
        .map_err(|_| "Invalid base64 encoding in Authorization header".to_string())?;

    let credentials_str = String::from_utf8(decoded)
        .map_err(|_| "Invalid UTF-8 in decoded credentials".to_string())?;

    let (username, password) = credentials_str
        .split_once(':')
        .ok_or_else(|| "Credentials must be in format 'username:password'".to_string())?;

    Ok((username.to_string(), password.to_string()))
}

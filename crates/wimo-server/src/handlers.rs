//! Route handlers.
//!
//! Every response uses the [`ApiResponse`] envelope. Expected negative
//! outcomes (unknown user, unknown id, wrong password) are notices with a
//! 200 status; failures are errors.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};
use serde_json::{Value, json};
use wimo_api::{ApiError, ApiResponse, ApiResult};
use wimo_auth::{AuthError, BasicCredentials, BearerAuth, CredentialCheck, has_basic_auth};
use wimo_core::{Entity, ID_FIELD, Permission};

use crate::server::AppState;

const INVALID_USER_DATA: &str = "Not valid keys in dict, check API reference";

pub async fn healthz() -> ApiResponse {
    ApiResponse::success("ok")
}

/// Pings the backend through the persistence facade.
pub async fn readyz(State(state): State<AppState>) -> ApiResponse {
    let backend = state.persistence.backend_name();
    match state.persistence.ping().await {
        Ok(()) => ApiResponse::success("ready").with_data(json!({ "backend": backend })),
        Err(e) => {
            tracing::warn!(backend, error = %e, "Readiness check failed");
            ApiResponse::error(StatusCode::SERVICE_UNAVAILABLE, "Backend unavailable")
                .with_data(json!({ "backend": backend, "category": e.category().to_string() }))
        }
    }
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}

/// Token check; answers 202 for any known bearer token.
pub async fn index(BearerAuth(_token): BearerAuth) -> ApiResponse {
    ApiResponse::success("Validation accepted").with_status(StatusCode::ACCEPTED)
}

/// Exchanges HTTP Basic credentials for the user's token.
///
/// A missing header and any other scheme both get the "no basic
/// authentication" notice.
pub async fn user_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    credentials: BasicCredentials,
) -> ApiResult<ApiResponse> {
    if !has_basic_auth(&headers) {
        tracing::info!("No basic authentication received with request");
        return Ok(ApiResponse::notice(
            "No basic authentication received with request",
        ));
    }

    tracing::info!(username = %credentials.username, "Checking credentials");
    let outcome = state
        .authenticator
        .authenticate(&credentials.username, &credentials.password)
        .await?;

    Ok(match outcome {
        CredentialCheck::Authenticated(ref token) => {
            ApiResponse::success(outcome.message()).with_data(json!({ "token": token.token }))
        }
        _ => ApiResponse::notice(outcome.message()),
    })
}

/// Creates a user, or updates one when the body carries an `id`.
pub async fn user_save(
    State(state): State<AppState>,
    BearerAuth(token): BearerAuth,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<ApiResponse> {
    state
        .authenticator
        .authorize(&token, Permission::Save)
        .await?;

    let Json(body) = body.map_err(|rejection| match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::bad_request("Wrong content type sent, needs to be application/json")
        }
        other => {
            tracing::info!(error = %other, "Unparsable request body");
            ApiError::bad_request("Please send valid JSON data with POST request")
        }
    })?;

    let Value::Object(data) = body else {
        return Err(ApiError::bad_request("Request body must be a JSON object"));
    };

    let saved = match state.authenticator.users().add(&data).await {
        Ok(saved) => saved,
        Err(AuthError::Validation(errors)) => {
            tracing::info!(error = %errors, "Rejected user data");
            let details = serde_json::to_value(&errors).unwrap_or_default();
            return Err(ApiError::bad_request_with_details(INVALID_USER_DATA, details));
        }
        Err(e) => return Err(e.into()),
    };

    match saved {
        Some(id) => Ok(ApiResponse::success("user saved").with_data(id)),
        None => match data.get(ID_FIELD) {
            Some(id) if !id.is_null() => {
                Ok(ApiResponse::notice("User id not found").with_data(id.clone()))
            }
            _ => Err(ApiError::internal("User not saved")),
        },
    }
}

/// Returns a user record without its password.
pub async fn user_load(
    State(state): State<AppState>,
    BearerAuth(token): BearerAuth,
    Path(username): Path<String>,
) -> ApiResult<ApiResponse> {
    state
        .authenticator
        .authorize(&token, Permission::Load)
        .await?;

    tracing::info!(%username, "Querying user");
    let Some(user) = state.authenticator.users().get_by_username(&username).await? else {
        return Ok(ApiResponse::notice("User not found").with_data(username));
    };

    let mut document = user.to_document();
    document.remove("password");
    Ok(ApiResponse::success("User found, returning object").with_data(Value::Object(document)))
}

/// Lists the usernames of all users.
pub async fn user_list(
    State(state): State<AppState>,
    BearerAuth(token): BearerAuth,
) -> ApiResult<ApiResponse> {
    state
        .authenticator
        .authorize(&token, Permission::Load)
        .await?;

    let usernames: Vec<String> = state
        .authenticator
        .users()
        .list()
        .await?
        .into_iter()
        .map(|user| user.username)
        .collect();
    Ok(ApiResponse::success("Users found, returning list of users").with_data(usernames))
}

pub async fn user_delete(
    State(state): State<AppState>,
    BearerAuth(token): BearerAuth,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse> {
    state
        .authenticator
        .authorize(&token, Permission::Delete)
        .await?;

    tracing::info!(%id, "Deleting user");
    if state.authenticator.users().delete(&id).await? {
        Ok(ApiResponse::success("User found and deleted").with_data(true))
    } else {
        Ok(ApiResponse::notice("User id not found").with_data(id))
    }
}

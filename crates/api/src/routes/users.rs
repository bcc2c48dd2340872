//! Signup, login and user listing endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use domain::{Account, PasswordHasher};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

// -- Response types --

/// A user as sent to clients. `password` is always the empty string.
#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub password: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub created_at: String,
}

impl From<Account> for UserResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id.to_string(),
            username: account.username,
            password: "",
            token: account.token,
            created_at: account.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

// -- Handlers --

/// POST /api/users: register and receive a first session token.
#[tracing::instrument(skip_all)]
pub async fn signup<S: Store + 'static, H: PasswordHasher + 'static>(
    State(state): State<Arc<AppState<S, H>>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let Json(req) = payload?;
    let account = state.accounts.signup(&req.username, &req.password).await?;
    Ok((StatusCode::CREATED, Json(account.into())))
}

/// POST /api/users/login: exchange credentials for a fresh token.
#[tracing::instrument(skip_all)]
pub async fn login<S: Store + 'static, H: PasswordHasher + 'static>(
    State(state): State<Arc<AppState<S, H>>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(req) = payload?;
    let outcome = state.accounts.login(&req.username, &req.password).await?;

    Ok(Json(LoginResponse {
        token: outcome.token,
        user: outcome.account.into(),
    }))
}

/// GET /api/users: list users without credentials.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + 'static, H: PasswordHasher + 'static>(
    State(state): State<Arc<AppState<S, H>>>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.accounts.list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

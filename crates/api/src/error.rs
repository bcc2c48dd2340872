//! API error types with HTTP response mapping.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
}

const INTERNAL_MESSAGE: &str = "Internal server error";

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    match &err {
        DomainError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        DomainError::Auth(auth) => (StatusCode::UNAUTHORIZED, auth.to_string()),
        DomainError::UsernameTaken(_) | DomainError::CartChanged => {
            (StatusCode::CONFLICT, err.to_string())
        }
        DomainError::ProductNotFound(_)
        | DomainError::CartNotFound
        | DomainError::OrderNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        DomainError::EmptyCart(_) => (StatusCode::BAD_REQUEST, "Cart is empty".to_string()),
        DomainError::PasswordHash(_) | DomainError::Store(_) => {
            tracing::error!(error = %err, "request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

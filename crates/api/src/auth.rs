//! Session extractor for protected routes.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use domain::{AuthError, AuthenticatedUser, DomainError, PasswordHasher};
use store::Store;

use crate::error::ApiError;
use crate::state::AppState;

/// Extractor that resolves the `Authorization` header to a user.
///
/// Rejects with `401` when the header is missing or the token is unknown.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(CurrentUser(user): CurrentUser) -> String {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct CurrentUser(pub AuthenticatedUser);

impl<S, H> FromRequestParts<Arc<AppState<S, H>>> for CurrentUser
where
    S: Store + 'static,
    H: PasswordHasher + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S, H>>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .map(|value| value.to_str())
            .transpose()
            .map_err(|_| DomainError::from(AuthError::InvalidToken))?;

        let user = state.authenticator.authenticate(header).await?;
        Ok(Self(user))
    }
}

//! Bearer-token session authentication.
//!
//! Every user holds at most one live token. Signup issues the first one and
//! every successful login replaces it, so older tokens stop resolving the
//! moment a new one is written.

mod password;
mod token;

pub use password::{Argon2Hasher, PasswordHasher};
pub use token::{TOKEN_BYTES, generate_token};

use common::UserId;
use store::Store;

use crate::error::{AuthError, DomainError};

const BEARER_PREFIX: &str = "Bearer ";

/// The caller behind a successfully resolved token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub username: String,
}

/// Resolves `Authorization` header values to users.
pub struct SessionAuthenticator<S: Store> {
    store: S,
}

impl<S: Store> SessionAuthenticator<S> {
    /// Creates a new authenticator backed by the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Resolves the raw header value to the user currently holding the token.
    ///
    /// A leading `"Bearer "` is stripped if present (exact, case-sensitive);
    /// otherwise the whole value is taken as the token. Performs no writes.
    #[tracing::instrument(skip_all)]
    pub async fn authenticate(
        &self,
        header: Option<&str>,
    ) -> Result<AuthenticatedUser, DomainError> {
        let raw = match header {
            Some(value) if !value.is_empty() => value,
            _ => return Err(AuthError::Unauthenticated.into()),
        };

        let token = raw.strip_prefix(BEARER_PREFIX).unwrap_or(raw);
        if token.is_empty() {
            return Err(AuthError::InvalidToken.into());
        }

        let user = self
            .store
            .find_user_by_token(token)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        tracing::debug!(user_id = %user.id, "session resolved");
        Ok(AuthenticatedUser {
            user_id: user.id,
            username: user.username,
        })
    }
}

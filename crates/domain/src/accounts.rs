//! Signup, login and the user listing.

use common::UserId;
use store::{Store, StoreExt, User, constraints};

use crate::auth::{PasswordHasher, generate_token};
use crate::error::{AuthError, DomainError};

/// A user as it may be shown to clients: no password hash, optionally no token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: UserId,
    pub username: String,
    pub token: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Account {
    fn from_user(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            token: user.token,
            created_at: user.created_at,
        }
    }

    fn without_token(mut self) -> Self {
        self.token = None;
        self
    }
}

/// Outcome of a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub token: String,
    pub account: Account,
}

/// Service for creating accounts and issuing session tokens.
pub struct AccountService<S: Store, H: PasswordHasher> {
    store: S,
    hasher: H,
}

impl<S: Store, H: PasswordHasher> AccountService<S, H> {
    /// Creates a new account service.
    pub fn new(store: S, hasher: H) -> Self {
        Self { store, hasher }
    }

    /// Registers a user and issues their first session token.
    #[tracing::instrument(skip(self, password))]
    pub async fn signup(&self, username: &str, password: &str) -> Result<Account, DomainError> {
        validate_credentials(username, password)?;

        if self.store.username_exists(username).await? {
            return Err(DomainError::UsernameTaken(username.to_string()));
        }

        let user = User {
            id: UserId::new(),
            username: username.to_string(),
            password_hash: self.hasher.hash(password)?,
            token: Some(generate_token()),
            created_at: chrono::Utc::now(),
        };

        // A concurrent signup can still win the race between check and insert.
        self.store.insert_user(&user).await.map_err(|e| {
            if e.violates(constraints::USERNAME) {
                DomainError::UsernameTaken(username.to_string())
            } else {
                e.into()
            }
        })?;

        metrics::counter!("users_created_total").increment(1);
        tracing::info!(user_id = %user.id, "user created");
        Ok(Account::from_user(user))
    }

    /// Verifies the password and replaces the user's token with a fresh one.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, DomainError> {
        validate_credentials(username, password)?;

        let Some(mut user) = self.store.find_user_by_username(username).await? else {
            metrics::counter!("login_failures_total").increment(1);
            return Err(AuthError::InvalidCredentials.into());
        };

        if !self.hasher.verify(password, &user.password_hash)? {
            metrics::counter!("login_failures_total").increment(1);
            return Err(AuthError::InvalidCredentials.into());
        }

        let token = generate_token();
        self.store.set_user_token(user.id, &token).await?;
        user.token = Some(token.clone());

        metrics::counter!("logins_total").increment(1);
        tracing::info!(user_id = %user.id, "session token reissued");
        Ok(LoginOutcome {
            token,
            account: Account::from_user(user),
        })
    }

    /// Lists all users with credentials scrubbed.
    #[tracing::instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<Account>, DomainError> {
        let users = self.store.list_users().await?;
        Ok(users
            .into_iter()
            .map(|u| Account::from_user(u).without_token())
            .collect())
    }
}

fn validate_credentials(username: &str, password: &str) -> Result<(), DomainError> {
    if username.trim().is_empty() {
        return Err(DomainError::Validation("username is required".to_string()));
    }
    if password.is_empty() {
        return Err(DomainError::Validation("password is required".to_string()));
    }
    Ok(())
}

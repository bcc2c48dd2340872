//! Domain error types.

use common::{CartId, OrderId, ProductId};
use store::StoreError;
use thiserror::Error;

/// Reasons a caller could not be identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No credential was presented.
    #[error("Authorization header required")]
    Unauthenticated,

    /// A token was presented but no user holds it.
    #[error("Invalid token")]
    InvalidToken,

    /// Unknown username or wrong password. The two are never told apart.
    #[error("Invalid username/password")]
    InvalidCredentials,
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Required input was missing or malformed. Nothing was written.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The caller could not be authenticated.
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// The username is already registered.
    #[error("Username already exists: {0}")]
    UsernameTaken(String),

    /// The product does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The cart does not exist or belongs to someone else.
    #[error("Cart not found")]
    CartNotFound,

    /// The order does not exist or belongs to someone else.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The cart's lines changed while it was being converted. Nothing was
    /// written; the caller may retry.
    #[error("Cart changed during checkout")]
    CartChanged,

    /// The cart has no lines to convert.
    #[error("Cart is empty: {0}")]
    EmptyCart(CartId),

    /// The password could not be hashed or the stored hash is unreadable.
    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    /// An error occurred in the store.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            // Raised when the cart disappears mid-conversion; callers see the
            // same outcome as converting a cart that never existed.
            StoreError::CartNotFound(_) => DomainError::CartNotFound,
            StoreError::CartChanged(_) => DomainError::CartChanged,
            other => DomainError::Store(other),
        }
    }
}

use common::CartId;
use thiserror::Error;

/// Names of the unique constraints the store enforces.
///
/// Both backends report violations with these names so callers can tell a
/// duplicate username apart from any other conflict.
pub mod constraints {
    pub const USERNAME: &str = "users_username_key";
    pub const TOKEN: &str = "users_token_key";
    pub const CART_OWNER: &str = "carts_user_id_key";
    pub const CART_LINE: &str = "cart_lines_cart_product_key";
}

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write would have violated a unique constraint.
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// The cart being converted no longer exists. The conversion was rolled back.
    #[error("Cart not found: {0}")]
    CartNotFound(CartId),

    /// The cart's lines changed after they were read for conversion. The
    /// conversion was rolled back.
    #[error("Cart changed during conversion: {0}")]
    CartChanged(CartId),

    /// A stored row could not be mapped back into a record.
    #[error("Invalid row: {0}")]
    InvalidRow(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Returns true if this error is a violation of the named unique constraint.
    pub fn violates(&self, name: &str) -> bool {
        matches!(self, StoreError::UniqueViolation { constraint } if constraint == name)
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

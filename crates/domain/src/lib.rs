//! Domain layer for the storefront backend.
//!
//! This crate provides the services that sit between the HTTP surface and
//! the store:
//! - Session authentication and account management
//! - The product catalog
//! - Cart aggregation
//! - Order conversion, which turns a cart into an order atomically
//!
//! Every service is generic over [`store::Store`] and receives its handle at
//! construction.

pub mod accounts;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod orders;
pub mod views;

pub use accounts::{Account, AccountService, LoginOutcome};
pub use auth::{
    Argon2Hasher, AuthenticatedUser, PasswordHasher, SessionAuthenticator, TOKEN_BYTES,
    generate_token,
};
pub use cart::CartService;
pub use catalog::{CatalogService, MAX_PRICE, NewProduct};
pub use error::{AuthError, DomainError};
pub use orders::OrderService;
pub use views::{CartLineView, CartView, OrderLineView, OrderView};

//! Rows persisted by the store.

use chrono::{DateTime, Utc};
use common::{CartId, CartLineId, Money, OrderId, OrderLineId, ProductId, UserId};

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    /// The single live session token, if one has been issued.
    pub token: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

/// A user's active cart. At most one exists per user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// One product inside a cart. Unique per (cart, product).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub id: CartLineId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total: Money,
    pub created_at: DateTime<Utc>,
}

/// One line of a placed order with the price captured at conversion time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub price: Money,
}

//! Read models returned by the cart and order services.
//!
//! Lines are stored with bare product ids; these views join the current
//! catalog entry back in.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{CartId, CartLineId, Money, OrderId, OrderLineId, ProductId, UserId};
use store::{CartLine, Order, OrderLine, Product, Store, StoreExt};

use crate::error::DomainError;

/// A user's cart with product detail joined into each line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartView {
    /// `None` when the user has never added anything or just checked out.
    pub id: Option<CartId>,
    pub user_id: UserId,
    pub lines: Vec<CartLineView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLineView {
    pub id: CartLineId,
    pub product: Product,
    pub quantity: u32,
}

impl CartView {
    pub(crate) fn empty(user_id: UserId) -> Self {
        Self {
            id: None,
            user_id,
            lines: Vec::new(),
        }
    }

    /// Number of distinct products in the cart.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the line for a product, if present.
    pub fn line_for(&self, product_id: ProductId) -> Option<&CartLineView> {
        self.lines.iter().find(|l| l.product.id == product_id)
    }
}

/// A placed order with its lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderView {
    pub id: OrderId,
    pub user_id: UserId,
    pub total: Money,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLineView>,
}

/// One order line. `price` is the captured price; `product` is the current
/// catalog entry and may have been repriced since.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLineView {
    pub id: OrderLineId,
    pub product_id: ProductId,
    pub price: Money,
    pub product: Product,
}

fn lookup(products: &HashMap<ProductId, Product>, id: ProductId) -> Result<Product, DomainError> {
    products
        .get(&id)
        .cloned()
        .ok_or(DomainError::ProductNotFound(id))
}

pub(crate) async fn load_cart_lines<S: Store>(
    store: &S,
    lines: Vec<CartLine>,
) -> Result<Vec<CartLineView>, DomainError> {
    let ids: Vec<ProductId> = lines.iter().map(|l| l.product_id).collect();
    let products = store.products_by_id(&ids).await?;

    lines
        .into_iter()
        .map(|line| {
            Ok(CartLineView {
                id: line.id,
                product: lookup(&products, line.product_id)?,
                quantity: line.quantity,
            })
        })
        .collect()
}

pub(crate) async fn load_order<S: Store>(store: &S, order: Order) -> Result<OrderView, DomainError> {
    let lines = store.list_order_lines(order.id).await?;
    let ids: Vec<ProductId> = lines.iter().map(|l| l.product_id).collect();
    let products = store.products_by_id(&ids).await?;

    order_view(order, lines, &products)
}

pub(crate) fn order_view(
    order: Order,
    lines: Vec<OrderLine>,
    products: &HashMap<ProductId, Product>,
) -> Result<OrderView, DomainError> {
    let lines = lines
        .into_iter()
        .map(|line| {
            Ok(OrderLineView {
                id: line.id,
                product_id: line.product_id,
                price: line.price,
                product: lookup(products, line.product_id)?,
            })
        })
        .collect::<Result<Vec<_>, DomainError>>()?;

    Ok(OrderView {
        id: order.id,
        user_id: order.user_id,
        total: order.total,
        created_at: order.created_at,
        lines,
    })
}

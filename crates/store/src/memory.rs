use std::sync::Arc;

use async_trait::async_trait;
use common::{CartId, CartLineId, Money, OrderId, ProductId, UserId};
use tokio::sync::RwLock;

use crate::{
    Cart, CartLine, Order, OrderLine, Product, Result, StoreError, User, constraints,
    store::{Store, same_lines},
};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    products: Vec<Product>,
    carts: Vec<Cart>,
    cart_lines: Vec<CartLine>,
    orders: Vec<Order>,
    order_lines: Vec<OrderLine>,
}

/// In-memory store implementation for testing and local runs.
///
/// All tables sit behind a single lock, so every operation (including the
/// multi-row order commit) is atomic with respect to the others. Unique
/// constraints mirror the PostgreSQL schema.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of carts currently stored.
    pub async fn cart_count(&self) -> usize {
        self.tables.read().await.carts.len()
    }

    /// Returns the number of cart lines currently stored, across all carts.
    pub async fn cart_line_count(&self) -> usize {
        self.tables.read().await.cart_lines.len()
    }

    /// Returns the number of orders currently stored, across all users.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Changes a product's catalog price in place.
    ///
    /// The service layer never edits products; this exists so tests can
    /// observe how carts and orders react to catalog changes.
    pub async fn set_product_price(&self, product_id: ProductId, price: Money) -> bool {
        let mut tables = self.tables.write().await;
        match tables.products.iter_mut().find(|p| p.id == product_id) {
            Some(product) => {
                product.price = price;
                true
            }
            None => false,
        }
    }
}

fn unique_violation(constraint: &str) -> StoreError {
    StoreError::UniqueViolation {
        constraint: constraint.to_string(),
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut tables = self.tables.write().await;

        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(unique_violation(constraints::USERNAME));
        }
        if let Some(ref token) = user.token
            && tables
                .users
                .iter()
                .any(|u| u.token.as_deref() == Some(token.as_str()))
        {
            return Err(unique_violation(constraints::TOKEN));
        }

        tables.users.push(user.clone());
        Ok(())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_token(&self, token: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.token.as_deref() == Some(token))
            .cloned())
    }

    async fn set_user_token(&self, user_id: UserId, token: &str) -> Result<()> {
        let mut tables = self.tables.write().await;

        if tables
            .users
            .iter()
            .any(|u| u.id != user_id && u.token.as_deref() == Some(token))
        {
            return Err(unique_violation(constraints::TOKEN));
        }

        if let Some(user) = tables.users.iter_mut().find(|u| u.id == user_id) {
            user.token = Some(token.to_string());
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.tables.read().await.users.clone())
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        self.tables.write().await.products.push(product.clone());
        Ok(())
    }

    async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let tables = self.tables.read().await;
        Ok(tables.products.iter().find(|p| p.id == product_id).cloned())
    }

    async fn find_products(&self, product_ids: &[ProductId]) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .iter()
            .filter(|p| product_ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.tables.read().await.products.clone())
    }

    async fn get_or_create_cart(&self, user_id: UserId) -> Result<Cart> {
        let mut tables = self.tables.write().await;

        if let Some(cart) = tables.carts.iter().find(|c| c.user_id == user_id) {
            return Ok(cart.clone());
        }

        let cart = Cart {
            id: CartId::new(),
            user_id,
            created_at: chrono::Utc::now(),
        };
        tables.carts.push(cart.clone());
        Ok(cart)
    }

    async fn find_cart_for_user(&self, user_id: UserId) -> Result<Option<Cart>> {
        let tables = self.tables.read().await;
        Ok(tables.carts.iter().find(|c| c.user_id == user_id).cloned())
    }

    async fn find_cart(&self, cart_id: CartId, user_id: UserId) -> Result<Option<Cart>> {
        let tables = self.tables.read().await;
        Ok(tables
            .carts
            .iter()
            .find(|c| c.id == cart_id && c.user_id == user_id)
            .cloned())
    }

    async fn list_cart_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>> {
        let tables = self.tables.read().await;
        Ok(tables
            .cart_lines
            .iter()
            .filter(|l| l.cart_id == cart_id)
            .cloned()
            .collect())
    }

    async fn find_cart_line(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>> {
        let tables = self.tables.read().await;
        Ok(tables
            .cart_lines
            .iter()
            .find(|l| l.cart_id == cart_id && l.product_id == product_id)
            .cloned())
    }

    async fn insert_cart_line(&self, line: &CartLine) -> Result<()> {
        let mut tables = self.tables.write().await;

        if tables
            .cart_lines
            .iter()
            .any(|l| l.cart_id == line.cart_id && l.product_id == line.product_id)
        {
            return Err(unique_violation(constraints::CART_LINE));
        }

        tables.cart_lines.push(line.clone());
        Ok(())
    }

    async fn update_cart_line_quantity(&self, line_id: CartLineId, quantity: u32) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(line) = tables.cart_lines.iter_mut().find(|l| l.id == line_id) {
            line.quantity = quantity;
        }
        Ok(())
    }

    async fn delete_cart_line(&self, cart_id: CartId, product_id: ProductId) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.cart_lines.len();
        tables
            .cart_lines
            .retain(|l| !(l.cart_id == cart_id && l.product_id == product_id));
        Ok((before - tables.cart_lines.len()) as u64)
    }

    async fn commit_order(
        &self,
        order: &Order,
        lines: &[OrderLine],
        cart_id: CartId,
        consumed: &[CartLine],
    ) -> Result<()> {
        let mut tables = self.tables.write().await;

        // Nothing is written unless the cart is still there, unchanged.
        if !tables.carts.iter().any(|c| c.id == cart_id) {
            return Err(StoreError::CartNotFound(cart_id));
        }
        let current: Vec<CartLine> = tables
            .cart_lines
            .iter()
            .filter(|l| l.cart_id == cart_id)
            .cloned()
            .collect();
        if !same_lines(&current, consumed) {
            return Err(StoreError::CartChanged(cart_id));
        }

        tables.orders.push(order.clone());
        tables.order_lines.extend(lines.iter().cloned());
        tables.cart_lines.retain(|l| l.cart_id != cart_id);
        tables.carts.retain(|c| c.id != cart_id);

        Ok(())
    }

    async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_order(&self, order_id: OrderId, user_id: UserId) -> Result<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .iter()
            .find(|o| o.id == order_id && o.user_id == user_id)
            .cloned())
    }

    async fn list_order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        let tables = self.tables.read().await;
        Ok(tables
            .order_lines
            .iter()
            .filter(|l| l.order_id == order_id)
            .cloned()
            .collect())
    }
}

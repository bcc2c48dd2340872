use std::collections::HashMap;

use async_trait::async_trait;
use common::{CartId, CartLineId, OrderId, ProductId, UserId};

use crate::{Cart, CartLine, Order, OrderLine, Product, Result, User};

/// Core trait for storage backends.
///
/// Every operation is a single read or write except [`Store::commit_order`],
/// which applies its writes atomically. All implementations must be
/// thread-safe (Send + Sync).
#[async_trait]
pub trait Store: Send + Sync {
    /// Inserts a new user.
    ///
    /// Fails with `UniqueViolation` if the username or token is already taken.
    async fn insert_user(&self, user: &User) -> Result<()>;

    /// Looks up a user by username.
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Looks up the user currently holding the given session token.
    async fn find_user_by_token(&self, token: &str) -> Result<Option<User>>;

    /// Replaces the user's session token, invalidating the previous one.
    async fn set_user_token(&self, user_id: UserId, token: &str) -> Result<()>;

    /// Returns all users in creation order.
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Inserts a new product.
    async fn insert_product(&self, product: &Product) -> Result<()>;

    /// Looks up a product by id.
    async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>>;

    /// Looks up several products at once. Unknown ids are skipped.
    async fn find_products(&self, product_ids: &[ProductId]) -> Result<Vec<Product>>;

    /// Returns the whole catalog in creation order.
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Returns the user's cart, creating an empty one if none exists.
    ///
    /// Backed by the one-cart-per-user unique constraint, so concurrent
    /// callers always observe the same cart.
    async fn get_or_create_cart(&self, user_id: UserId) -> Result<Cart>;

    /// Returns the user's cart, if any.
    async fn find_cart_for_user(&self, user_id: UserId) -> Result<Option<Cart>>;

    /// Returns the cart with this id only if it belongs to `user_id`.
    async fn find_cart(&self, cart_id: CartId, user_id: UserId) -> Result<Option<Cart>>;

    /// Returns the lines of a cart in the order they were added.
    async fn list_cart_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>>;

    /// Looks up the line for a product inside a cart.
    async fn find_cart_line(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>>;

    /// Inserts a new cart line.
    ///
    /// Fails with `UniqueViolation` if the cart already has a line for the product.
    async fn insert_cart_line(&self, line: &CartLine) -> Result<()>;

    /// Overwrites the quantity of a cart line.
    async fn update_cart_line_quantity(&self, line_id: CartLineId, quantity: u32) -> Result<()>;

    /// Deletes the line for a product inside a cart.
    ///
    /// Returns the number of lines removed; zero is not an error.
    async fn delete_cart_line(&self, cart_id: CartId, product_id: ProductId) -> Result<u64>;

    /// Writes an order with its lines and tears down the originating cart.
    ///
    /// `consumed` is the snapshot of cart lines the order was priced from.
    /// The cart is locked and its lines re-read inside the transaction; the
    /// order row, the order lines, the cart lines and the cart row are then
    /// written together. If the cart is already gone the call fails with
    /// `CartNotFound`, and if its lines no longer match `consumed` it fails
    /// with `CartChanged`. Either way nothing is written.
    async fn commit_order(
        &self,
        order: &Order,
        lines: &[OrderLine],
        cart_id: CartId,
        consumed: &[CartLine],
    ) -> Result<()>;

    /// Returns the user's orders, oldest first.
    async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>>;

    /// Returns the order with this id only if it belongs to `user_id`.
    async fn find_order(&self, order_id: OrderId, user_id: UserId) -> Result<Option<Order>>;

    /// Returns the lines of an order.
    async fn list_order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>>;
}

/// Extension trait providing convenience methods for stores.
#[async_trait]
pub trait StoreExt: Store {
    /// Checks if a username is already registered.
    async fn username_exists(&self, username: &str) -> Result<bool> {
        Ok(self.find_user_by_username(username).await?.is_some())
    }

    /// Loads products keyed by id, for joining into cart and order lines.
    async fn products_by_id(&self, product_ids: &[ProductId]) -> Result<HashMap<ProductId, Product>> {
        let products = self.find_products(product_ids).await?;
        Ok(products.into_iter().map(|p| (p.id, p)).collect())
    }
}

/// Returns whether two sets of cart lines are identical, ignoring order.
pub(crate) fn same_lines(current: &[CartLine], expected: &[CartLine]) -> bool {
    if current.len() != expected.len() {
        return false;
    }
    let mut current = current.to_vec();
    let mut expected = expected.to_vec();
    current.sort_by_key(|l| l.id);
    expected.sort_by_key(|l| l.id);
    current == expected
}

// Blanket implementation for all Store implementations
impl<T: Store + ?Sized> StoreExt for T {}

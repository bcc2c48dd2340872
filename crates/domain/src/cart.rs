//! Cart aggregation: one active cart per user, one line per product.

use common::{CartLineId, ProductId, UserId};
use store::{CartLine, Store};

use crate::error::DomainError;
use crate::views::{CartView, load_cart_lines};

/// Service for building up a user's cart.
pub struct CartService<S: Store> {
    store: S,
}

impl<S: Store> CartService<S> {
    /// Creates a new cart service with the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Adds one unit of a product to the user's cart.
    ///
    /// Creates the cart on first use. An existing line for the product has its
    /// quantity bumped; otherwise a new line with quantity 1 is inserted.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<CartView, DomainError> {
        if self.store.find_product(product_id).await?.is_none() {
            return Err(DomainError::ProductNotFound(product_id));
        }

        let cart = self.store.get_or_create_cart(user_id).await?;

        // Read then write with no lock held: two concurrent adds of the same
        // product can both read quantity n and both write n + 1.
        match self.store.find_cart_line(cart.id, product_id).await? {
            Some(line) => {
                let quantity = line.quantity.saturating_add(1);
                self.store.update_cart_line_quantity(line.id, quantity).await?;
                tracing::debug!(cart_id = %cart.id, quantity, "cart line incremented");
            }
            None => {
                let line = CartLine {
                    id: CartLineId::new(),
                    cart_id: cart.id,
                    product_id,
                    quantity: 1,
                };
                self.store.insert_cart_line(&line).await?;
                tracing::debug!(cart_id = %cart.id, "cart line created");
            }
        }

        metrics::counter!("cart_items_added_total").increment(1);

        let lines = self.store.list_cart_lines(cart.id).await?;
        Ok(CartView {
            id: Some(cart.id),
            user_id,
            lines: load_cart_lines(&self.store, lines).await?,
        })
    }

    /// Returns the user's cart with current product detail.
    ///
    /// A user without a cart gets an empty view rather than an error.
    #[tracing::instrument(skip(self))]
    pub async fn list_cart(&self, user_id: UserId) -> Result<CartView, DomainError> {
        let Some(cart) = self.store.find_cart_for_user(user_id).await? else {
            return Ok(CartView::empty(user_id));
        };

        let lines = self.store.list_cart_lines(cart.id).await?;
        Ok(CartView {
            id: Some(cart.id),
            user_id,
            lines: load_cart_lines(&self.store, lines).await?,
        })
    }

    /// Drops a product's line from the user's cart.
    ///
    /// Removing a product that isn't in the cart succeeds. The cart itself is
    /// kept even when its last line goes.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<(), DomainError> {
        let cart = self
            .store
            .find_cart_for_user(user_id)
            .await?
            .ok_or(DomainError::CartNotFound)?;

        let removed = self.store.delete_cart_line(cart.id, product_id).await?;
        tracing::debug!(cart_id = %cart.id, removed, "cart line removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use common::Money;
    use store::{InMemoryStore, Product};

    use super::*;

    async fn seed_product(store: &InMemoryStore, name: &str, cents: i64) -> ProductId {
        let product = Product {
            id: ProductId::new(),
            name: name.to_string(),
            description: String::new(),
            price: Money::from_cents(cents),
            category: String::new(),
            created_at: chrono::Utc::now(),
        };
        store.insert_product(&product).await.unwrap();
        product.id
    }

    #[tokio::test]
    async fn repeated_adds_collapse_into_one_line() {
        let store = InMemoryStore::new();
        let widget = seed_product(&store, "Widget", 999).await;
        let service = CartService::new(store.clone());
        let user = UserId::new();

        for _ in 0..3 {
            service.add_item(user, widget).await.unwrap();
        }

        let cart = service.list_cart(user).await.unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.line_for(widget).unwrap().quantity, 3);
        assert_eq!(store.cart_count().await, 1);
    }

    #[tokio::test]
    async fn lines_keep_insertion_order() {
        let store = InMemoryStore::new();
        let widget = seed_product(&store, "Widget", 999).await;
        let gadget = seed_product(&store, "Gadget", 1500).await;
        let service = CartService::new(store);
        let user = UserId::new();

        service.add_item(user, gadget).await.unwrap();
        let cart = service.add_item(user, widget).await.unwrap();

        let names: Vec<_> = cart.lines.iter().map(|l| l.product.name.as_str()).collect();
        assert_eq!(names, ["Gadget", "Widget"]);
    }

    #[tokio::test]
    async fn unknown_product_creates_no_cart() {
        let store = InMemoryStore::new();
        let service = CartService::new(store.clone());
        let missing = ProductId::new();

        let err = service.add_item(UserId::new(), missing).await.unwrap_err();
        assert!(matches!(err, DomainError::ProductNotFound(id) if id == missing));
        assert_eq!(store.cart_count().await, 0);
    }

    #[tokio::test]
    async fn list_without_cart_is_empty() {
        let service = CartService::new(InMemoryStore::new());
        let user = UserId::new();

        let cart = service.list_cart(user).await.unwrap();
        assert_eq!(cart.id, None);
        assert_eq!(cart.user_id, user);
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn remove_is_idempotent_and_keeps_cart() {
        let store = InMemoryStore::new();
        let widget = seed_product(&store, "Widget", 999).await;
        let service = CartService::new(store.clone());
        let user = UserId::new();

        let added = service.add_item(user, widget).await.unwrap();
        service.remove_item(user, widget).await.unwrap();
        service.remove_item(user, widget).await.unwrap();

        let cart = service.list_cart(user).await.unwrap();
        assert_eq!(cart.id, added.id);
        assert!(cart.is_empty());
        assert_eq!(store.cart_line_count().await, 0);
    }

    #[tokio::test]
    async fn remove_without_cart_is_not_found() {
        let store = InMemoryStore::new();
        let widget = seed_product(&store, "Widget", 999).await;
        let service = CartService::new(store);

        let err = service.remove_item(UserId::new(), widget).await.unwrap_err();
        assert!(matches!(err, DomainError::CartNotFound));
    }

    #[tokio::test]
    async fn carts_are_private_to_their_owner() {
        let store = InMemoryStore::new();
        let widget = seed_product(&store, "Widget", 999).await;
        let service = CartService::new(store);
        let alice = UserId::new();
        let bob = UserId::new();

        service.add_item(alice, widget).await.unwrap();

        assert!(service.list_cart(bob).await.unwrap().is_empty());
        assert!(matches!(
            service.remove_item(bob, widget).await,
            Err(DomainError::CartNotFound)
        ));
        assert_eq!(service.list_cart(alice).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn listing_reflects_current_prices() {
        let store = InMemoryStore::new();
        let widget = seed_product(&store, "Widget", 999).await;
        let service = CartService::new(store.clone());
        let user = UserId::new();

        service.add_item(user, widget).await.unwrap();
        assert!(store.set_product_price(widget, Money::from_cents(1299)).await);

        let cart = service.list_cart(user).await.unwrap();
        assert_eq!(cart.lines[0].product.price, Money::from_cents(1299));
    }
}

//! Order conversion: turns a user's cart into an immutable order.

use common::{CartId, Money, OrderId, OrderLineId, ProductId, UserId};
use store::{Order, OrderLine, Store, StoreExt};

use crate::error::DomainError;
use crate::views::{OrderView, load_order, order_view};

/// Service for placing and reading orders.
pub struct OrderService<S: Store> {
    store: S,
}

impl<S: Store> OrderService<S> {
    /// Creates a new order service with the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Converts the caller's cart into an order.
    ///
    /// Each line captures the product's current price. The total is the sum
    /// of those prices, one per line regardless of quantity. The order, its
    /// lines and the removal of the cart are committed together, so a failure
    /// leaves the cart untouched and no order behind. If the cart's lines
    /// change between being read here and the commit, the conversion fails
    /// with [`DomainError::CartChanged`].
    #[tracing::instrument(skip(self))]
    pub async fn create_order(
        &self,
        user_id: UserId,
        cart_id: CartId,
    ) -> Result<OrderView, DomainError> {
        let cart = self
            .store
            .find_cart(cart_id, user_id)
            .await?
            .ok_or(DomainError::CartNotFound)?;

        let cart_lines = self.store.list_cart_lines(cart.id).await?;
        if cart_lines.is_empty() {
            return Err(DomainError::EmptyCart(cart.id));
        }

        let ids: Vec<ProductId> = cart_lines.iter().map(|l| l.product_id).collect();
        let products = self.store.products_by_id(&ids).await?;

        let order_id = OrderId::new();
        let lines = cart_lines
            .iter()
            .map(|line| {
                let product = products
                    .get(&line.product_id)
                    .ok_or(DomainError::ProductNotFound(line.product_id))?;
                Ok(OrderLine {
                    id: OrderLineId::new(),
                    order_id,
                    product_id: line.product_id,
                    price: product.price,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        let total = lines
            .iter()
            .try_fold(Money::zero(), |acc, l| acc.checked_add(l.price))
            .ok_or_else(|| {
                DomainError::Validation("order total exceeds the supported range".to_string())
            })?;
        let order = Order {
            id: order_id,
            user_id,
            total,
            created_at: chrono::Utc::now(),
        };

        self.store
            .commit_order(&order, &lines, cart.id, &cart_lines)
            .await?;

        metrics::counter!("orders_created_total").increment(1);
        metrics::histogram!("order_total_cents").record(total.cents() as f64);
        tracing::info!(order_id = %order.id, %total, lines = lines.len(), "order created");

        order_view(order, lines, &products)
    }

    /// Returns the caller's orders, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, user_id: UserId) -> Result<Vec<OrderView>, DomainError> {
        let orders = self.store.list_orders(user_id).await?;

        let mut views = Vec::with_capacity(orders.len());
        for order in orders {
            views.push(load_order(&self.store, order).await?);
        }
        Ok(views)
    }

    /// Returns one of the caller's orders.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<OrderView, DomainError> {
        let order = self
            .store
            .find_order(order_id, user_id)
            .await?
            .ok_or(DomainError::OrderNotFound(order_id))?;

        load_order(&self.store, order).await
    }
}

//! Product catalog.

use common::{Money, ProductId};
use store::{Product, Store};

use crate::error::DomainError;

/// Highest accepted product price: $100,000,000.00.
pub const MAX_PRICE: Money = Money::from_cents(10_000_000_000);

/// Input for [`CatalogService::create_product`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Money,
    pub category: String,
}

impl NewProduct {
    fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::Validation("name is required".to_string()));
        }
        if self.price.is_negative() {
            return Err(DomainError::Validation(
                "price must not be negative".to_string(),
            ));
        }
        if self.price > MAX_PRICE {
            return Err(DomainError::Validation(format!(
                "price must not exceed {MAX_PRICE}"
            )));
        }
        Ok(())
    }
}

pub struct CatalogService<S: Store> {
    store: S,
}

impl<S: Store> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Adds a product to the catalog.
    #[tracing::instrument(skip(self), fields(name = %input.name))]
    pub async fn create_product(&self, input: NewProduct) -> Result<Product, DomainError> {
        input.validate()?;

        let product = Product {
            id: ProductId::new(),
            name: input.name,
            description: input.description,
            price: input.price,
            category: input.category,
            created_at: chrono::Utc::now(),
        };
        self.store.insert_product(&product).await?;

        tracing::info!(product_id = %product.id, price = %product.price, "product created");
        Ok(product)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, DomainError> {
        Ok(self.store.list_products().await?)
    }
}

//! Catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use common::Money;
use domain::{NewProduct, PasswordHasher};
use serde::{Deserialize, Serialize};
use store::{Product, Store};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: i64,
    #[serde(default)]
    pub category: String,
}

#[derive(Serialize)]
pub struct ItemResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub category: String,
    pub created_at: String,
}

impl From<Product> for ItemResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name,
            description: product.description,
            price_cents: product.price.cents(),
            category: product.category,
            created_at: product.created_at.to_rfc3339(),
        }
    }
}

/// POST /api/items: add a product to the catalog.
#[tracing::instrument(skip_all)]
pub async fn create<S: Store + 'static, H: PasswordHasher + 'static>(
    State(state): State<Arc<AppState<S, H>>>,
    payload: Result<Json<CreateItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    let Json(req) = payload?;
    let product = state
        .catalog
        .create_product(NewProduct {
            name: req.name,
            description: req.description,
            price: Money::from_cents(req.price_cents),
            category: req.category,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(product.into())))
}

/// GET /api/items: list the catalog.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + 'static, H: PasswordHasher + 'static>(
    State(state): State<Arc<AppState<S, H>>>,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    let products = state.catalog.list_products().await?;
    Ok(Json(products.into_iter().map(ItemResponse::from).collect()))
}

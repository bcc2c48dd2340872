//! Cart endpoints. All of them require a session.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::ProductId;
use domain::{CartView, PasswordHasher};
use serde::{Deserialize, Serialize};
use store::Store;

use super::items::ItemResponse;
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct AddToCartRequest {
    pub item_id: ProductId,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartResponse {
    pub id: Option<String>,
    pub user_id: String,
    pub items: Vec<CartItemResponse>,
}

#[derive(Serialize)]
pub struct CartItemResponse {
    pub id: String,
    pub quantity: u32,
    pub item: ItemResponse,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl From<CartView> for CartResponse {
    fn from(cart: CartView) -> Self {
        Self {
            id: cart.id.map(|id| id.to_string()),
            user_id: cart.user_id.to_string(),
            items: cart
                .lines
                .into_iter()
                .map(|line| CartItemResponse {
                    id: line.id.to_string(),
                    quantity: line.quantity,
                    item: line.product.into(),
                })
                .collect(),
        }
    }
}

// -- Handlers --

/// POST /api/carts: add one unit of a product to the caller's cart.
#[tracing::instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn add<S: Store + 'static, H: PasswordHasher + 'static>(
    State(state): State<Arc<AppState<S, H>>>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<AddToCartRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CartResponse>), ApiError> {
    let Json(req) = payload?;
    let cart = state.carts.add_item(user.user_id, req.item_id).await?;
    Ok((StatusCode::CREATED, Json(cart.into())))
}

/// GET /api/carts: the caller's cart with product detail.
#[tracing::instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn get<S: Store + 'static, H: PasswordHasher + 'static>(
    State(state): State<Arc<AppState<S, H>>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state.carts.list_cart(user.user_id).await?;
    Ok(Json(cart.into()))
}

/// DELETE /api/carts/items/{item_id}: drop a product from the caller's cart.
#[tracing::instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn remove_item<S: Store + 'static, H: PasswordHasher + 'static>(
    State(state): State<Arc<AppState<S, H>>>,
    CurrentUser(user): CurrentUser,
    path: Result<Path<ProductId>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path(item_id) = path?;
    state.carts.remove_item(user.user_id, item_id).await?;
    Ok(Json(MessageResponse {
        message: "Item removed from cart",
    }))
}

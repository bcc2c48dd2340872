//! Order conversion and order history endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{CartId, OrderId};
use domain::{OrderView, PasswordHasher};
use serde::{Deserialize, Serialize};
use store::Store;

use super::items::ItemResponse;
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub cart_id: CartId,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub total_cents: i64,
    pub created_at: String,
    pub items: Vec<OrderItemResponse>,
}

/// `price_cents` is what was charged; `item` shows the current catalog entry.
#[derive(Serialize)]
pub struct OrderItemResponse {
    pub id: String,
    pub item_id: String,
    pub price_cents: i64,
    pub item: ItemResponse,
}

impl From<OrderView> for OrderResponse {
    fn from(order: OrderView) -> Self {
        Self {
            id: order.id.to_string(),
            user_id: order.user_id.to_string(),
            total_cents: order.total.cents(),
            created_at: order.created_at.to_rfc3339(),
            items: order
                .lines
                .into_iter()
                .map(|line| OrderItemResponse {
                    id: line.id.to_string(),
                    item_id: line.product_id.to_string(),
                    price_cents: line.price.cents(),
                    item: line.product.into(),
                })
                .collect(),
        }
    }
}

// -- Handlers --

/// POST /api/orders: convert the caller's cart into an order.
#[tracing::instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn create<S: Store + 'static, H: PasswordHasher + 'static>(
    State(state): State<Arc<AppState<S, H>>>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let Json(req) = payload?;
    let order = state.orders.create_order(user.user_id, req.cart_id).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /api/orders: the caller's orders, oldest first.
#[tracing::instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn list<S: Store + 'static, H: PasswordHasher + 'static>(
    State(state): State<Arc<AppState<S, H>>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.orders.list_orders(user.user_id).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// GET /api/orders/{id}: one of the caller's orders.
#[tracing::instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn get<S: Store + 'static, H: PasswordHasher + 'static>(
    State(state): State<Arc<AppState<S, H>>>,
    CurrentUser(user): CurrentUser,
    path: Result<Path<OrderId>, PathRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let Path(id) = path?;
    let order = state.orders.get_order(user.user_id, id).await?;
    Ok(Json(order.into()))
}

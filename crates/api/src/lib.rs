//! HTTP API server with observability for the storefront backend.
//!
//! Provides REST endpoints for accounts, the catalog, carts and orders,
//! with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use domain::{Argon2Hasher, PasswordHasher};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use auth::CurrentUser;
pub use config::Config;
pub use error::ApiError;
pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, H>(state: Arc<AppState<S, H>>, metrics_handle: PrometheusHandle) -> Router
where
    S: Store + 'static,
    H: PasswordHasher + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let api = Router::new()
        .route(
            "/users",
            post(routes::users::signup::<S, H>).get(routes::users::list::<S, H>),
        )
        .route("/users/login", post(routes::users::login::<S, H>))
        .route(
            "/items",
            post(routes::items::create::<S, H>).get(routes::items::list::<S, H>),
        )
        .route(
            "/carts",
            post(routes::carts::add::<S, H>).get(routes::carts::get::<S, H>),
        )
        .route(
            "/carts/items/{item_id}",
            delete(routes::carts::remove_item::<S, H>),
        )
        .route(
            "/orders",
            post(routes::orders::create::<S, H>).get(routes::orders::list::<S, H>),
        )
        .route("/orders/{id}", get(routes::orders::get::<S, H>));

    Router::new()
        .route("/health", get(routes::health::check))
        .nest("/api", api)
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state: every service over `store`,
/// passwords hashed with argon2.
pub fn create_default_state<S: Store + Clone + 'static>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store, Argon2Hasher))
}

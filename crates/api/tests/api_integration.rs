//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use domain::{DomainError, PasswordHasher};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use store::InMemoryStore;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

/// Cheap hasher so each signup doesn't pay for argon2.
struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, password: &str) -> Result<String, DomainError> {
        Ok(format!("plain:{password}"))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, DomainError> {
        Ok(hash == format!("plain:{password}"))
    }
}

fn setup() -> axum::Router {
    setup_with_store().0
}

fn setup_with_store() -> (axum::Router, InMemoryStore) {
    let store = InMemoryStore::new();
    let state = Arc::new(api::AppState::new(store.clone(), PlainHasher));
    (api::create_app(state, get_metrics_handle()), store)
}

/// Sends one request and returns the status with the decoded JSON body.
async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn signup(app: &axum::Router, username: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/users",
        None,
        Some(json!({ "username": username, "password": "secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["token"].as_str().unwrap().to_string()
}

async fn create_item(app: &axum::Router, name: &str, price_cents: i64) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/items",
        None,
        Some(json!({ "name": name, "price_cents": price_cents })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

async fn add_to_cart(app: &axum::Router, token: &str, item_id: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/api/carts",
        Some(token),
        Some(json!({ "item_id": item_id })),
    )
    .await
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();

    let (status, body) = send(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

mod users {
    use super::*;

    #[tokio::test]
    async fn signup_returns_user_with_blank_password() {
        let app = setup();

        let (status, body) = send(
            &app,
            "POST",
            "/api/users",
            None,
            Some(json!({ "username": "alice", "password": "secret" })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["username"], "alice");
        assert_eq!(body["password"], "");
        assert_eq!(body["token"].as_str().unwrap().len(), 64);
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let app = setup();
        signup(&app, "alice").await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/users",
            None,
            Some(json!({ "username": "alice", "password": "other" })),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn missing_fields_are_bad_requests() {
        let app = setup();

        let (status, _) = send(
            &app,
            "POST",
            "/api/users",
            None,
            Some(json!({ "username": "alice" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            "POST",
            "/api/users",
            None,
            Some(json!({ "username": "", "password": "secret" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_rotates_token() {
        let app = setup();
        let first = signup(&app, "alice").await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/users/login",
            None,
            Some(json!({ "username": "alice", "password": "secret" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let second = body["token"].as_str().unwrap().to_string();
        assert_ne!(first, second);
        assert_eq!(body["user"]["username"], "alice");
        assert_eq!(body["user"]["password"], "");

        let (status, _) = send(&app, "GET", "/api/carts", Some(&first), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, "GET", "/api/carts", Some(&second), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn bad_credentials_are_unauthorized() {
        let app = setup();
        signup(&app, "alice").await;

        for (username, password) in [("alice", "wrong"), ("nobody", "secret")] {
            let (status, body) = send(
                &app,
                "POST",
                "/api/users/login",
                None,
                Some(json!({ "username": username, "password": password })),
            )
            .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["error"], "Invalid username/password");
        }
    }

    #[tokio::test]
    async fn listing_omits_tokens() {
        let app = setup();
        signup(&app, "alice").await;
        signup(&app, "bob").await;

        let (status, body) = send(&app, "GET", "/api/users", None, None).await;

        assert_eq!(status, StatusCode::OK);
        let users = body.as_array().unwrap();
        assert_eq!(users.len(), 2);
        assert!(users.iter().all(|u| u.get("token").is_none()));
        assert!(users.iter().all(|u| u["password"] == ""));
    }
}

mod items {
    use super::*;

    #[tokio::test]
    async fn create_and_list() {
        let app = setup();

        let (status, body) = send(
            &app,
            "POST",
            "/api/items",
            None,
            Some(json!({
                "name": "Widget",
                "description": "A widget",
                "price_cents": 999,
                "category": "tools"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["price_cents"], 999);

        let (status, body) = send(&app, "GET", "/api/items", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["name"], "Widget");
        assert_eq!(items[0]["category"], "tools");
    }

    #[tokio::test]
    async fn negative_price_is_rejected() {
        let app = setup();

        let (status, _) = send(
            &app,
            "POST",
            "/api/items",
            None,
            Some(json!({ "name": "Widget", "price_cents": -5 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn price_above_cap_is_rejected() {
        let app = setup();

        let (status, body) = send(
            &app,
            "POST",
            "/api/items",
            None,
            Some(json!({ "name": "Widget", "price_cents": i64::MAX })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (_, list) = send(&app, "GET", "/api/items", None, None).await;
        assert!(list.as_array().unwrap().is_empty());
    }
}

mod carts {
    use super::*;

    #[tokio::test]
    async fn requires_a_session() {
        let app = setup();

        let (status, body) = send(&app, "GET", "/api/carts", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Authorization header required");

        let (status, body) = send(&app, "GET", "/api/carts", Some("bogus"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid token");
    }

    #[tokio::test]
    async fn accepts_token_without_bearer_prefix() {
        let app = setup();
        let token = signup(&app, "alice").await;

        let request = Request::builder()
            .uri("/api/carts")
            .header("authorization", token)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn adding_twice_bumps_quantity() {
        let app = setup();
        let token = signup(&app, "alice").await;
        let widget = create_item(&app, "Widget", 999).await;

        let (status, _) = add_to_cart(&app, &token, &widget).await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, cart) = add_to_cart(&app, &token, &widget).await;

        let items = cart["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["quantity"], 2);
        assert_eq!(items[0]["item"]["id"], widget.as_str());
        assert_eq!(items[0]["item"]["price_cents"], 999);
    }

    #[tokio::test]
    async fn unknown_item_is_not_found() {
        let (app, store) = setup_with_store();
        let token = signup(&app, "alice").await;

        let missing = uuid::Uuid::new_v4().to_string();
        let (status, _) = add_to_cart(&app, &token, &missing).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(store.cart_count().await, 0);
    }

    #[tokio::test]
    async fn empty_cart_has_no_id() {
        let app = setup();
        let token = signup(&app, "alice").await;

        let (status, body) = send(&app, "GET", "/api/carts", Some(&token), None).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["id"].is_null());
        assert!(body["items"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let app = setup();
        let token = signup(&app, "alice").await;
        let widget = create_item(&app, "Widget", 999).await;
        add_to_cart(&app, &token, &widget).await;

        let uri = format!("/api/carts/items/{widget}");
        for _ in 0..2 {
            let (status, body) = send(&app, "DELETE", &uri, Some(&token), None).await;
            assert_eq!(status, StatusCode::OK);
            assert!(body["message"].as_str().is_some());
        }

        let (_, cart) = send(&app, "GET", "/api/carts", Some(&token), None).await;
        assert!(cart["id"].is_string());
        assert!(cart["items"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_without_cart_is_not_found() {
        let app = setup();
        let token = signup(&app, "alice").await;
        let widget = create_item(&app, "Widget", 999).await;

        let uri = format!("/api/carts/items/{widget}");
        let (status, _) = send(&app, "DELETE", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_item_id_is_a_json_bad_request() {
        let app = setup();
        let token = signup(&app, "alice").await;

        let (status, body) = send(
            &app,
            "DELETE",
            "/api/carts/items/not-a-uuid",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }
}

mod orders {
    use super::*;

    async fn cart_id(app: &axum::Router, token: &str) -> String {
        let (_, cart) = send(app, "GET", "/api/carts", Some(token), None).await;
        cart["id"].as_str().unwrap().to_string()
    }

    async fn create_order(app: &axum::Router, token: &str, cart_id: &str) -> (StatusCode, Value) {
        send(
            app,
            "POST",
            "/api/orders",
            Some(token),
            Some(json!({ "cart_id": cart_id })),
        )
        .await
    }

    #[tokio::test]
    async fn checkout_flow() {
        let (app, store) = setup_with_store();
        let token = signup(&app, "alice").await;
        let widget = create_item(&app, "Widget", 999).await;
        add_to_cart(&app, &token, &widget).await;
        add_to_cart(&app, &token, &widget).await;
        let cart = cart_id(&app, &token).await;

        let (status, order) = create_order(&app, &token, &cart).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(order["total_cents"], 999);
        let items = order["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["price_cents"], 999);
        assert_eq!(items[0]["item_id"], widget.as_str());
        assert_eq!(store.cart_count().await, 0);

        let (status, cart) = send(&app, "GET", "/api/carts", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(cart["id"].is_null());

        let order_id = order["id"].as_str().unwrap();
        let (status, fetched) =
            send(&app, "GET", &format!("/api/orders/{order_id}"), Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["id"], order_id);

        let (status, list) = send(&app, "GET", "/api/orders", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_cart_is_a_bad_request() {
        let (app, store) = setup_with_store();
        let token = signup(&app, "alice").await;
        let widget = create_item(&app, "Widget", 999).await;
        add_to_cart(&app, &token, &widget).await;
        send(
            &app,
            "DELETE",
            &format!("/api/carts/items/{widget}"),
            Some(&token),
            None,
        )
        .await;
        let cart = cart_id(&app, &token).await;

        let (status, body) = create_order(&app, &token, &cart).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Cart is empty");
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn other_users_cart_and_orders_are_not_found() {
        let app = setup();
        let alice = signup(&app, "alice").await;
        let bob = signup(&app, "bob").await;
        let widget = create_item(&app, "Widget", 999).await;
        add_to_cart(&app, &alice, &widget).await;
        let cart = cart_id(&app, &alice).await;

        let (status, _) = create_order(&app, &bob, &cart).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, order) = create_order(&app, &alice, &cart).await;
        let order_id = order["id"].as_str().unwrap();

        let (status, _) =
            send(&app, "GET", &format!("/api/orders/{order_id}"), Some(&bob), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, list) = send(&app, "GET", "/api/orders", Some(&bob), None).await;
        assert!(list.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_cart_id_is_rejected() {
        let (app, store) = setup_with_store();
        let token = signup(&app, "alice").await;

        let (status, _) = create_order(&app, &token, "not-a-uuid").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn malformed_order_id_is_a_json_bad_request() {
        let app = setup();
        let token = signup(&app, "alice").await;

        let (status, body) =
            send(&app, "GET", "/api/orders/not-a-uuid", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_metrics_endpoint_reports_orders() {
    let app = setup();
    let token = signup(&app, "alice").await;
    let widget = create_item(&app, "Widget", 250).await;
    let (_, cart) = add_to_cart(&app, &token, &widget).await;
    let cart_id = cart["id"].as_str().unwrap();
    send(
        &app,
        "POST",
        "/api/orders",
        Some(&token),
        Some(json!({ "cart_id": cart_id })),
    )
    .await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("orders_created_total"));
    assert!(text.contains("users_created_total"));
}

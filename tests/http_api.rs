use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use storefront::api::{self, AppState};
use storefront::auth::password::hash_password;
use storefront::auth::JwtService;
use storefront::bus::EventBus;
use storefront::domain::aggregates::{User, UserRole};
use storefront::store::{Accounts, MemoryStore, Store, UnitOfWork};

const SECRET: &str = "0123456789abcdef0123456789abcdef";
const PASSWORD: &str = "correct horse";

struct TestApp {
    router: Router,
    store: MemoryStore,
}

impl TestApp {
    fn new() -> Self {
        let store = MemoryStore::new();
        let state = AppState::new(store.clone(), JwtService::new(SECRET).unwrap(), EventBus::disabled());
        Self { router: api::router(state), store }
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = self.router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
        (status, value)
    }

    async fn register_and_login(&self, email: &str) -> String {
        let (status, _) = self
            .call(Method::POST, "/api/v1/register", None, Some(json!({"email": email, "password": PASSWORD})))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        self.login(email).await
    }

    async fn login(&self, email: &str) -> String {
        let (status, body) =
            self.call(Method::POST, "/api/v1/login", None, Some(json!({"email": email, "password": PASSWORD}))).await;
        assert_eq!(status, StatusCode::OK);
        body["access_token"].as_str().unwrap().to_string()
    }

    async fn admin_token(&self) -> String {
        let mut admin = User::customer("admin@example.com", hash_password(PASSWORD).unwrap());
        admin.role = UserRole::Admin;
        let mut tx = self.store.begin().await.unwrap();
        tx.insert_user(&admin).await.unwrap();
        tx.commit().await.unwrap();
        self.login("admin@example.com").await
    }

    async fn create_product(&self, admin: &str, price: &str, stock: i32) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/v1/products",
                Some(admin),
                Some(json!({"name": "Lamp", "description": "Desk lamp", "price": price, "stock_quantity": stock})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn health_and_ping_are_public() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let response = app.router.clone().oneshot(Request::get("/api/v1/ping").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::GET, "/api/v1/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "MISSING_AUTH_HEADER");

    let (status, body) = app.call(Method::GET, "/api/v1/orders", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn registration_rejects_duplicates_and_bad_input() {
    let app = TestApp::new();
    app.register_and_login("ada@example.com").await;

    let (status, body) = app
        .call(Method::POST, "/api/v1/register", None, Some(json!({"email": "ada@example.com", "password": PASSWORD})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "EMAIL_TAKEN");

    let (status, body) =
        app.call(Method::POST, "/api/v1/register", None, Some(json!({"email": "nope", "password": "x"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");

    let (status, body) = app
        .call(Method::POST, "/api/v1/login", None, Some(json!({"email": "ada@example.com", "password": "wrong pass"})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn catalog_mutations_are_admin_only() {
    let app = TestApp::new();
    let customer = app.register_and_login("cy@example.com").await;
    let admin = app.admin_token().await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/products",
            Some(&customer),
            Some(json!({"name": "Lamp", "price": "10.00", "stock_quantity": 1})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, body) = app
        .call(Method::POST, "/api/v1/products", Some(&admin), Some(json!({"name": "Lamp", "price": "0", "stock_quantity": 1})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");

    for price in ["0.001", "10.005"] {
        let (status, body) = app
            .call(Method::POST, "/api/v1/products", Some(&admin), Some(json!({"name": "Lamp", "price": price, "stock_quantity": 1})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_INPUT");
    }

    let id = app.create_product(&admin, "10.00", 5).await;
    let (status, products) = app.call(Method::GET, "/api/v1/products", Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(products.as_array().unwrap().len(), 1);

    let (status, _) = app.call(Method::DELETE, &format!("/api/v1/products/{id}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = app.call(Method::GET, &format!("/api/v1/products/{id}"), Some(&customer), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn order_lifecycle_over_http() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let customer = app.register_and_login("cy@example.com").await;
    let stranger = app.register_and_login("eve@example.com").await;
    let product = app.create_product(&admin, "10.00", 5).await;
    let product_uri = format!("/api/v1/products/{product}");

    let order_body = json!({"items": [{"product_id": product, "quantity": 3}]});
    let (status, order) = app.call(Method::POST, "/api/v1/orders", Some(&customer), Some(order_body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total_amount"], "30.00");
    let order_id = order["id"].as_str().unwrap().to_string();

    let (_, stocked) = app.call(Method::GET, &product_uri, Some(&customer), None).await;
    assert_eq!(stocked["stock_quantity"], 2);

    let (status, body) = app.call(Method::POST, "/api/v1/orders", Some(&customer), Some(order_body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");

    let (status, body) = app.call(Method::POST, "/api/v1/orders", Some(&customer), Some(json!({"items": []}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");

    let (status, _) = app.call(Method::GET, &format!("/api/v1/orders/{order_id}"), Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app.call(Method::POST, &format!("/api/v1/orders/{order_id}/cancel"), Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, cancelled) =
        app.call(Method::POST, &format!("/api/v1/orders/{order_id}/cancel"), Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");
    let (_, restocked) = app.call(Method::GET, &product_uri, Some(&customer), None).await;
    assert_eq!(restocked["stock_quantity"], 5);

    let (status, body) =
        app.call(Method::POST, &format!("/api/v1/orders/{order_id}/cancel"), Some(&customer), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_ORDER_STATUS");

    let (status, orders) = app.call(Method::GET, "/api/v1/orders", Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn status_updates_are_admin_only_and_stop_at_terminal_states() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let customer = app.register_and_login("cy@example.com").await;
    let product = app.create_product(&admin, "4.50", 10).await;

    let (_, order) = app
        .call(Method::POST, "/api/v1/orders", Some(&customer), Some(json!({"items": [{"product_id": product, "quantity": 1}]})))
        .await;
    let status_uri = format!("/api/v1/orders/{}/status", order["id"].as_str().unwrap());

    let (status, _) = app.call(Method::PUT, &status_uri, Some(&customer), Some(json!({"status": "shipped"}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.call(Method::PUT, &status_uri, Some(&admin), Some(json!({"status": "teleported"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for next in ["confirmed", "shipped", "delivered"] {
        let (status, _) = app.call(Method::PUT, &status_uri, Some(&admin), Some(json!({"status": next}))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = app.call(Method::PUT, &status_uri, Some(&admin), Some(json!({"status": "pending"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_ORDER_STATUS");
}

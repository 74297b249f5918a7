//! HTTP surface.

pub mod auth;
pub mod orders;
pub mod products;

use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRef, FromRequest, Request};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use validator::Validate;

use crate::auth::JwtService;
use crate::bus::EventBus;
use crate::error::Error;
use crate::service::{AccountService, CatalogService, OrderEngine};
use crate::store::Store;

#[derive(Clone)]
pub struct AppState<S> {
    pub orders: OrderEngine<S>,
    pub catalog: CatalogService<S>,
    pub accounts: AccountService<S>,
    pub jwt: Arc<JwtService>,
}

impl<S: Store> AppState<S> {
    pub fn new(store: S, jwt: JwtService, events: EventBus) -> Self {
        let jwt = Arc::new(jwt);
        Self {
            orders: OrderEngine::new(store.clone(), events.clone()),
            catalog: CatalogService::new(store.clone(), events),
            accounts: AccountService::new(store, jwt.clone()),
            jwt,
        }
    }
}

impl<S> FromRef<AppState<S>> for Arc<JwtService> {
    fn from_ref(state: &AppState<S>) -> Self { state.jwt.clone() }
}

/// JSON body that is deserialized and then checked with [`Validate`].
/// Both failures surface as `INVALID_INPUT`.
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| Error::Validation(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy", "service": "storefront"}))
}

pub fn router<S: Store>(state: AppState<S>) -> Router {
    let api = Router::new()
        .route("/ping", get(|| async { "pong" }))
        .route("/health", get(health))
        .route("/register", post(auth::register::<S>))
        .route("/login", post(auth::login::<S>))
        .route("/logout", post(auth::logout::<S>))
        .route("/products", get(products::list_products::<S>).post(products::create_product::<S>))
        .route(
            "/products/:id",
            get(products::get_product::<S>).put(products::update_product::<S>).delete(products::delete_product::<S>),
        )
        .route("/orders", get(orders::list_orders::<S>).post(orders::create_order::<S>))
        .route("/orders/:id", get(orders::get_order::<S>))
        .route("/orders/:id/cancel", post(orders::cancel_order::<S>))
        .route("/orders/:id/status", put(orders::update_order_status::<S>));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

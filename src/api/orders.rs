use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{AppState, ValidJson};
use crate::auth::{AdminUser, CurrentUser};
use crate::domain::aggregates::{Order, OrderStatus};
use crate::domain::value_objects::OrderLine;
use crate::error::{Error, Result};
use crate::store::Store;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1))]
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

pub async fn create_order<S: Store>(
    State(s): State<AppState<S>>,
    user: CurrentUser,
    ValidJson(r): ValidJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let order = s.orders.create_order(user.id, &r.items).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_orders<S: Store>(State(s): State<AppState<S>>, user: CurrentUser) -> Result<Json<Vec<Order>>> {
    Ok(Json(s.orders.orders_for_user(user.id).await?))
}

/// Visible to its owner and to admins.
pub async fn get_order<S: Store>(State(s): State<AppState<S>>, user: CurrentUser, Path(id): Path<Uuid>) -> Result<Json<Order>> {
    let order = s.orders.get_order(id).await?;
    if !order.is_owned_by(user.id) && !user.is_admin() {
        return Err(Error::Unauthorized);
    }
    Ok(Json(order))
}

pub async fn cancel_order<S: Store>(State(s): State<AppState<S>>, user: CurrentUser, Path(id): Path<Uuid>) -> Result<Json<Order>> {
    Ok(Json(s.orders.cancel_order(id, user.id).await?))
}

pub async fn update_order_status<S: Store>(
    State(s): State<AppState<S>>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    ValidJson(r): ValidJson<UpdateStatusRequest>,
) -> Result<StatusCode> {
    s.orders.update_status(id, r.status).await?;
    Ok(StatusCode::OK)
}

//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::OrderStatus;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderPlaced { order_id: Uuid, user_id: Uuid, total: Decimal, items: Vec<StockMovement> },
    OrderCancelled { order_id: Uuid, user_id: Uuid, restocked: Vec<StockMovement> },
    OrderStatusChanged { order_id: Uuid, from: OrderStatus, to: OrderStatus },
    ProductCreated { product_id: Uuid, name: String },
    ProductDeleted { product_id: Uuid },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StockMovement { pub product_id: Uuid, pub quantity: i32 }

impl DomainEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            Self::OrderPlaced { .. } => "orders.placed",
            Self::OrderCancelled { .. } => "orders.cancelled",
            Self::OrderStatusChanged { .. } => "orders.status_changed",
            Self::ProductCreated { .. } => "products.created",
            Self::ProductDeleted { .. } => "products.deleted",
        }
    }
}

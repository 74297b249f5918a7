//! Order Aggregate

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [Self::Pending, Self::Confirmed, Self::Shipped, Self::Delivered, Self::Cancelled];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(&self) -> bool { matches!(self, Self::Delivered | Self::Cancelled) }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("unknown order status '{s}'")))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<OrderItem>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool { self.user_id == user_id }

    /// Sum of the stored line subtotals.
    pub fn items_total(&self) -> Decimal { self.items.iter().map(|i| i.subtotal).sum() }

    /// Only the owner may cancel, and only while the order is pending.
    pub fn ensure_cancellable_by(&self, user_id: Uuid) -> Result<()> {
        if !self.is_owned_by(user_id) { return Err(Error::Unauthorized); }
        if self.status != OrderStatus::Pending { return Err(Error::OrderNotPending(self.status)); }
        Ok(())
    }

    pub fn ensure_not_terminal(&self) -> Result<()> {
        if self.status.is_terminal() { return Err(Error::TerminalState(self.status)); }
        Ok(())
    }
}

/// A priced line captured while placing an order. The unit price is a snapshot
/// of the catalog price at that moment.
#[derive(Clone, Debug, PartialEq)]
pub struct NewOrderItem { pub id: Uuid, pub product_id: Uuid, pub quantity: i32, pub unit_price: Decimal }

impl NewOrderItem {
    pub fn new(product_id: Uuid, quantity: i32, unit_price: Decimal) -> Self {
        Self { id: Uuid::now_v7(), product_id, quantity, unit_price }
    }

    pub fn subtotal(&self) -> Decimal { self.unit_price * Decimal::from(self.quantity) }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewOrder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    /// Pending order whose total is the sum of its line subtotals.
    pub fn pending(user_id: Uuid, items: Vec<NewOrderItem>) -> Self {
        let total_amount = items.iter().map(NewOrderItem::subtotal).sum();
        Self { id: Uuid::now_v7(), user_id, status: OrderStatus::Pending, total_amount, items }
    }
}

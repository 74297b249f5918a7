//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Prices are stored as NUMERIC(12, 2).
pub const PRICE_SCALE: u32 = 2;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable catalog fields of a product.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ProductDetails {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub stock_quantity: i32,
}

impl ProductDetails {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() { return Err(Error::Validation("product name is required".into())); }
        if self.price <= Decimal::ZERO { return Err(Error::Validation("price must be greater than zero".into())); }
        if self.price.scale() > PRICE_SCALE {
            return Err(Error::Validation(format!("price {} has more than {PRICE_SCALE} decimal places", self.price)));
        }
        if self.stock_quantity < 0 { return Err(Error::Validation("stock quantity cannot be negative".into())); }
        Ok(())
    }
}

impl Product {
    /// Builds a not-yet-persisted product; the store assigns the final timestamps.
    pub fn draft(details: ProductDetails) -> Result<Self> {
        details.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(),
            name: details.name.trim().to_string(),
            description: details.description,
            price: details.price,
            stock_quantity: details.stock_quantity,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, details: ProductDetails) -> Result<()> {
        details.validate()?;
        self.name = details.name.trim().to_string();
        self.description = details.description;
        self.price = details.price;
        self.stock_quantity = details.stock_quantity;
        Ok(())
    }

    /// Takes `quantity` units out of stock. Stock never drops below zero.
    pub fn withdraw(&mut self, quantity: i32) -> Result<()> {
        if quantity <= 0 { return Err(Error::Validation(format!("quantity must be positive, got {quantity}"))); }
        if self.stock_quantity < quantity {
            return Err(Error::InsufficientStock { product_id: self.id, requested: quantity, available: self.stock_quantity });
        }
        self.stock_quantity -= quantity;
        Ok(())
    }

    pub fn restock(&mut self, quantity: i32) -> Result<()> {
        if quantity <= 0 { return Err(Error::Validation(format!("quantity must be positive, got {quantity}"))); }
        self.stock_quantity = self
            .stock_quantity
            .checked_add(quantity)
            .ok_or_else(|| Error::Validation(format!("stock of product {} would overflow", self.id)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn widget(stock: i32) -> Product {
        Product::draft(ProductDetails { name: "Widget".into(), description: String::new(), price: Decimal::new(1000, 2), stock_quantity: stock }).unwrap()
    }

    #[test]
    fn test_draft_rejects_bad_details() {
        let details = ProductDetails { name: "  ".into(), description: String::new(), price: Decimal::ONE, stock_quantity: 1 };
        assert_eq!(Product::draft(details).unwrap_err().kind(), ErrorKind::Validation);
        let details = ProductDetails { name: "P".into(), description: String::new(), price: Decimal::ZERO, stock_quantity: 1 };
        assert_eq!(Product::draft(details).unwrap_err().kind(), ErrorKind::Validation);
        let details = ProductDetails { name: "P".into(), description: String::new(), price: Decimal::ONE, stock_quantity: -1 };
        assert_eq!(Product::draft(details).unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_price_limited_to_cents() {
        let priced = |price| ProductDetails { name: "P".into(), description: String::new(), price, stock_quantity: 1 };
        assert_eq!(priced(Decimal::new(1, 3)).validate().unwrap_err().kind(), ErrorKind::Validation);
        assert_eq!(priced(Decimal::new(10005, 3)).validate().unwrap_err().kind(), ErrorKind::Validation);
        assert!(priced(Decimal::new(1001, 2)).validate().is_ok());
        assert!(priced(Decimal::new(7, 0)).validate().is_ok());
    }

    #[test]
    fn test_inventory() {
        let mut p = widget(5);
        p.withdraw(3).unwrap();
        assert_eq!(p.stock_quantity, 2);
        let err = p.withdraw(3).unwrap_err();
        assert!(matches!(err, Error::InsufficientStock { requested: 3, available: 2, .. }));
        assert_eq!(p.stock_quantity, 2);
        p.restock(3).unwrap();
        assert_eq!(p.stock_quantity, 5);
    }

    #[test]
    fn test_withdraw_everything() {
        let mut p = widget(4);
        p.withdraw(4).unwrap();
        assert_eq!(p.stock_quantity, 0);
    }

    #[test]
    fn test_restock_overflow() {
        let mut p = widget(i32::MAX);
        assert_eq!(p.restock(1).unwrap_err().kind(), ErrorKind::Validation);
        assert_eq!(p.stock_quantity, i32::MAX);
    }
}

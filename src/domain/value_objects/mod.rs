//! Value Objects for orders and accounts

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::validate_email;

use crate::error::{Error, Result};

/// One requested (product, quantity) pair of an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

impl OrderLine {
    pub fn new(product_id: Uuid, quantity: i32) -> Self { Self { product_id, quantity } }
}

/// Rejects empty requests, non-positive quantities and repeated products.
pub fn validate_lines(lines: &[OrderLine]) -> Result<()> {
    if lines.is_empty() {
        return Err(Error::Validation("order must contain at least one item".into()));
    }
    let mut seen = HashSet::with_capacity(lines.len());
    for line in lines {
        if line.quantity <= 0 {
            return Err(Error::Validation(format!("quantity for product {} must be positive", line.product_id)));
        }
        if !seen.insert(line.product_id) {
            return Err(Error::Validation(format!("product {} appears more than once", line.product_id)));
        }
    }
    Ok(())
}

/// Normalized (trimmed, lowercase) email address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim().to_lowercase();
        if !validate_email(value.as_str()) {
            return Err(Error::Validation(format!("'{value}' is not a valid email")));
        }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

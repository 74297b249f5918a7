use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{AppState, ValidJson};
use crate::auth::{AdminUser, CurrentUser};
use crate::domain::aggregates::product::PRICE_SCALE;
use crate::domain::aggregates::{Product, ProductDetails};
use crate::error::Result;
use crate::store::Store;

#[derive(Debug, Deserialize, Validate)]
pub struct ProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(custom = "positive_price")]
    pub price: Decimal,
    #[validate(range(min = 0))]
    pub stock_quantity: i32,
}

fn positive_price(price: &Decimal) -> std::result::Result<(), ValidationError> {
    if *price <= Decimal::ZERO {
        return Err(ValidationError::new("price_not_positive"));
    }
    if price.scale() > PRICE_SCALE {
        return Err(ValidationError::new("price_too_precise"));
    }
    Ok(())
}

impl From<ProductRequest> for ProductDetails {
    fn from(r: ProductRequest) -> Self {
        Self { name: r.name, description: r.description, price: r.price, stock_quantity: r.stock_quantity }
    }
}

pub async fn list_products<S: Store>(State(s): State<AppState<S>>, _user: CurrentUser) -> Result<Json<Vec<Product>>> {
    Ok(Json(s.catalog.list_products().await?))
}

pub async fn get_product<S: Store>(State(s): State<AppState<S>>, _user: CurrentUser, Path(id): Path<Uuid>) -> Result<Json<Product>> {
    Ok(Json(s.catalog.get_product(id).await?))
}

pub async fn create_product<S: Store>(
    State(s): State<AppState<S>>,
    _admin: AdminUser,
    ValidJson(r): ValidJson<ProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = s.catalog.create_product(r.into()).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product<S: Store>(
    State(s): State<AppState<S>>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    ValidJson(r): ValidJson<ProductRequest>,
) -> Result<Json<Product>> {
    Ok(Json(s.catalog.update_product(id, r.into()).await?))
}

pub async fn delete_product<S: Store>(State(s): State<AppState<S>>, _admin: AdminUser, Path(id): Path<Uuid>) -> Result<StatusCode> {
    s.catalog.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(price: &str) -> ProductRequest {
        ProductRequest { name: "Lamp".into(), description: String::new(), price: price.parse().unwrap(), stock_quantity: 1 }
    }

    #[test]
    fn test_price_must_be_positive_whole_cents() {
        assert!(request("10.01").validate().is_ok());
        assert!(request("10.005").validate().is_err());
        assert!(request("0.001").validate().is_err());
        assert!(request("0").validate().is_err());
    }
}

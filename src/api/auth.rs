use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use validator::Validate;

use super::{AppState, ValidJson};
use crate::auth::CurrentUser;
use crate::domain::aggregates::User;
use crate::error::Result;
use crate::service::TokenPair;
use crate::store::Store;

#[derive(Debug, Deserialize, Validate)]
pub struct AuthRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}

pub async fn register<S: Store>(State(s): State<AppState<S>>, ValidJson(r): ValidJson<AuthRequest>) -> Result<(StatusCode, Json<User>)> {
    let user = s.accounts.register(&r.email, &r.password).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login<S: Store>(State(s): State<AppState<S>>, ValidJson(r): ValidJson<AuthRequest>) -> Result<Json<TokenPair>> {
    Ok(Json(s.accounts.login(&r.email, &r.password).await?))
}

pub async fn logout<S: Store>(State(s): State<AppState<S>>, user: CurrentUser) -> Result<StatusCode> {
    s.accounts.logout(user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

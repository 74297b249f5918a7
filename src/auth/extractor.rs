//! Request extractors for authenticated callers.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header::AUTHORIZATION, request::Parts};
use serde::Serialize;
use uuid::Uuid;

use super::jwt::{JwtService, TokenType};
use crate::domain::aggregates::UserRole;
use crate::error::Error;

/// Caller identified by a valid access token.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool { self.role == UserRole::Admin }
}

/// A [`CurrentUser`] holding the admin role.
#[derive(Clone, Debug)]
pub struct AdminUser(pub CurrentUser);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    Arc<JwtService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(Error::Unauthenticated)?;
        let token = JwtService::extract_bearer(header).ok_or(Error::InvalidToken)?;

        let jwt = Arc::<JwtService>::from_ref(state);
        let claims = jwt.verify(token).map_err(|e| {
            tracing::warn!(error = %e, uri = %parts.uri, "Token rejected");
            Error::from(e)
        })?;
        if claims.token_type != TokenType::Access {
            return Err(Error::InvalidToken);
        }

        let user = CurrentUser { id: claims.sub, email: claims.email, role: claims.role };
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    Arc<JwtService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(Error::Unauthorized);
        }
        Ok(AdminUser(user))
    }
}

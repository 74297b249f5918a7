//! Registration, login and logout.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::jwt::{ACCESS_TOKEN_MINUTES, REFRESH_TOKEN_MINUTES};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::{JwtService, TokenType};
use crate::domain::aggregates::{Session, User};
use crate::domain::value_objects::Email;
use crate::error::{Error, ErrorKind, Result, StoreResultExt};
use crate::store::{settle, Accounts, Store};

#[derive(Clone, Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct AccountService<S> {
    store: S,
    jwt: Arc<JwtService>,
}

impl<S: Store> AccountService<S> {
    pub fn new(store: S, jwt: Arc<JwtService>) -> Self { Self { store, jwt } }

    pub async fn register(&self, email: &str, password: &str) -> Result<User> {
        const OP: &str = "register";
        let email = Email::parse(email)?;
        let user = User::customer(email.as_str(), hash_password(password)?);

        let mut tx = self.store.begin().await.during(OP)?;
        let result = async {
            if tx.find_user_by_email(email.as_str()).await.during(OP)?.is_some() {
                return Err(Error::EmailTaken);
            }
            tx.insert_user(&user).await.during(OP)
        }
        .await;
        // a concurrent registration can still win the unique index
        let user = settle(tx, OP, result).await.map_err(|e| match e.kind() {
            ErrorKind::Conflict => Error::EmailTaken,
            _ => e,
        })?;

        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Unknown emails and wrong passwords fail identically.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair> {
        const OP: &str = "login";
        let email = Email::parse(email).map_err(|_| Error::InvalidCredentials)?;

        let user = {
            let mut tx = self.store.begin().await.during(OP)?;
            tx.find_user_by_email(email.as_str()).await.during(OP)?.ok_or(Error::InvalidCredentials)?
        };
        check_password(&user, password).await?;

        let access_token = self.jwt.issue(&user, TokenType::Access, Duration::minutes(ACCESS_TOKEN_MINUTES))?;
        let refresh_ttl = Duration::minutes(REFRESH_TOKEN_MINUTES);
        let refresh_token = self.jwt.issue(&user, TokenType::Refresh, refresh_ttl)?;

        let mut tx = self.store.begin().await.during(OP)?;
        let session = Session::new(user.id, refresh_token.clone(), Utc::now() + refresh_ttl);
        let result = tx.insert_session(&session).await.during(OP);
        settle(tx, OP, result).await?;

        info!(user_id = %user.id, "User logged in");
        Ok(TokenPair { access_token, refresh_token })
    }

    pub async fn logout(&self, user_id: Uuid) -> Result<()> {
        const OP: &str = "logout";
        let mut tx = self.store.begin().await.during(OP)?;
        let result = tx.delete_sessions_for_user(user_id).await.during(OP);
        let removed = settle(tx, OP, result).await?;
        info!(user_id = %user_id, sessions = removed, "User logged out");
        Ok(())
    }
}

/// Runs the argon2 check on the blocking pool.
async fn check_password(user: &User, password: &str) -> Result<()> {
    let hash = user.password_hash.clone();
    let password = password.to_owned();
    let matches = tokio::task::spawn_blocking(move || verify_password(&hash, &password))
        .await
        .map_err(|e| Error::Internal(format!("password check failed to run: {e}")))?;
    if matches { Ok(()) } else { Err(Error::InvalidCredentials) }
}

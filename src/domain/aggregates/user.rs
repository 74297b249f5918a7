//! User Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Customer,
    Admin,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn customer(email: impl Into<String>, password_hash: String) -> Self {
        let now = Utc::now();
        Self { id: Uuid::now_v7(), email: email.into(), password_hash, role: UserRole::Customer, created_at: now, updated_at: now }
    }
}

/// Stored refresh token of a logged-in user.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub refresh_token: String,
    pub is_blocked: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: Uuid, refresh_token: String, expires_at: DateTime<Utc>) -> Self {
        Self { id: Uuid::now_v7(), user_id, refresh_token, is_blocked: false, expires_at, created_at: Utc::now() }
    }
}

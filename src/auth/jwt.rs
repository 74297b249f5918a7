//! JWT issuance and verification.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::{User, UserRole};
use crate::error::Error;

pub const ISSUER: &str = "commerce";
pub const MIN_SECRET_LEN: usize = 32;
pub const ACCESS_TOKEN_MINUTES: i64 = 30;
pub const REFRESH_TOKEN_MINUTES: i64 = 6 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: UserRole,
    pub token_type: TokenType,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub iss: String,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum JwtError {
    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("secret must be at least 32 bytes")]
    WeakSecret,

    #[error("token signing failed: {0}")]
    Signing(String),
}

impl From<JwtError> for Error {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::Expired => Error::TokenExpired,
            JwtError::Invalid(_) => Error::InvalidToken,
            JwtError::WeakSecret | JwtError::Signing(_) => Error::Internal(e.to_string()),
        }
    }
}

pub struct JwtService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtService {
    pub fn new(secret: &str) -> Result<Self, JwtError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(JwtError::WeakSecret);
        }
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.validate_nbf = true;
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    pub fn issue(&self, user: &User, token_type: TokenType, ttl: Duration) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            token_type,
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + ttl).timestamp(),
            iss: ISSUER.to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| JwtError::Signing(e.to_string()))
    }

    /// Classifies failures by the library's error kind.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid(e.to_string()),
            })
    }

    /// Token part of an `Authorization: Bearer <token>` header value.
    pub fn extract_bearer(header: &str) -> Option<&str> {
        let mut fields = header.split_whitespace();
        let scheme = fields.next()?;
        let token = fields.next()?;
        scheme.eq_ignore_ascii_case("bearer").then_some(token)
    }
}

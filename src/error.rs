//! Error taxonomy shared by the order engine, the catalog and the HTTP layer.
//!
//! Every failure carries an [`ErrorKind`]; callers branch on the kind, never on
//! the rendered message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::OrderStatus;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock { product_id: Uuid, requested: i32, available: i32 },

    #[error("order belongs to another user")]
    Unauthorized,

    #[error("order is {0}, only pending orders can be cancelled")]
    OrderNotPending(OrderStatus),

    #[error("order is {0} and can no longer change status")]
    TerminalState(OrderStatus),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid input: {0}")]
    InvalidInput(#[from] validator::ValidationErrors),

    #[error("email already taken")]
    EmailTaken,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("authentication required")]
    Unauthenticated,

    #[error("token expired")]
    TokenExpired,

    #[error("invalid token")]
    InvalidToken,

    #[error("{operation}: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

/// Closed classification of [`Error`], stable across wrapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InsufficientStock,
    Unauthorized,
    OrderNotPending,
    TerminalState,
    Validation,
    Conflict,
    Unauthenticated,
    Internal,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::OrderNotPending(_) => ErrorKind::OrderNotPending,
            Self::TerminalState(_) => ErrorKind::TerminalState,
            Self::Validation(_) | Self::InvalidInput(_) => ErrorKind::Validation,
            Self::EmailTaken => ErrorKind::Conflict,
            Self::InvalidCredentials | Self::Unauthenticated | Self::TokenExpired | Self::InvalidToken => {
                ErrorKind::Unauthenticated
            }
            Self::Store { source, .. } => match source {
                StoreError::NotFound { .. } => ErrorKind::NotFound,
                StoreError::Conflict(_) => ErrorKind::Conflict,
                StoreError::Database(_) => ErrorKind::Internal,
            },
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::EmailTaken => (StatusCode::CONFLICT, "EMAIL_TAKEN"),
            Self::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            Self::Unauthenticated => (StatusCode::UNAUTHORIZED, "MISSING_AUTH_HEADER"),
            Self::TokenExpired => (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED"),
            Self::InvalidToken => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            _ => match self.kind() {
                ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                ErrorKind::InsufficientStock => (StatusCode::BAD_REQUEST, "INSUFFICIENT_STOCK"),
                ErrorKind::Unauthorized => (StatusCode::FORBIDDEN, "UNAUTHORIZED"),
                ErrorKind::OrderNotPending | ErrorKind::TerminalState => {
                    (StatusCode::BAD_REQUEST, "INVALID_ORDER_STATUS")
                }
                ErrorKind::Validation => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
                ErrorKind::Conflict => (StatusCode::CONFLICT, "CONFLICT"),
                ErrorKind::Unauthenticated => (StatusCode::UNAUTHORIZED, "AUTH_FAILED"),
                ErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
        }
    }
}

/// Attaches the failing operation to collaborator errors without changing their kind.
pub trait StoreResultExt<T> {
    fn during(self, operation: &'static str) -> Result<T>;
}

impl<T> StoreResultExt<T> for std::result::Result<T, StoreError> {
    fn during(self, operation: &'static str) -> Result<T> {
        self.map_err(|source| Error::Store { operation, source })
    }
}

/// Error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!(code, status = status.as_u16(), error = %self, "Internal server error");
        } else {
            tracing::info!(code, status = status.as_u16(), error = %self, "Client error");
        }

        let message = if status.is_server_error() {
            "An unexpected error occurred".to_string()
        } else {
            self.to_string()
        };
        let details = match &self {
            Self::InvalidInput(errors) => serde_json::to_value(errors).ok(),
            _ => None,
        };

        let body = Json(ErrorResponse { code: code.to_string(), message, details });
        (status, body).into_response()
    }
}

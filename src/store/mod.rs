//! Persistence boundary.
//!
//! Everything the services read or write goes through a [`UnitOfWork`] obtained
//! from [`Store::begin`]. A unit of work either commits as a whole or leaves no
//! trace: dropping it without calling [`UnitOfWork::commit`] rolls it back,
//! including when the surrounding future is cancelled mid-operation.
//!
//! Two implementations ship with the crate: [`PgStore`] for PostgreSQL and
//! [`MemoryStore`] for tests and embedding.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{NewOrder, Order, OrderStatus, Product, Session, User};
use crate::error::{Result, StoreResultExt};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Catalog store: product rows, including their stock.
#[async_trait]
pub trait Catalog: Send {
    async fn insert_product(&mut self, product: &Product) -> StoreResult<Product>;
    /// Newest first.
    async fn list_products(&mut self) -> StoreResult<Vec<Product>>;
    async fn get_product(&mut self, id: Uuid) -> StoreResult<Product>;
    /// Reads a product and holds it against concurrent writers until the unit of work ends.
    async fn lock_product(&mut self, id: Uuid) -> StoreResult<Product>;
    /// Full-row update, stock included. Returns the row with its new `updated_at`.
    async fn update_product(&mut self, product: &Product) -> StoreResult<Product>;
    /// Fails with [`StoreError::Conflict`] while any order item references the product.
    async fn delete_product(&mut self, id: Uuid) -> StoreResult<()>;
}

/// Order ledger: orders and their items. Append-only apart from the status.
#[async_trait]
pub trait Ledger: Send {
    /// Inserts the order row and all of its item rows.
    async fn create_order(&mut self, order: &NewOrder) -> StoreResult<Order>;
    /// Order with items.
    async fn get_order(&mut self, id: Uuid) -> StoreResult<Order>;
    /// Order with items, its row held until the unit of work ends.
    async fn lock_order(&mut self, id: Uuid) -> StoreResult<Order>;
    /// Orders without items, newest first.
    async fn orders_for_user(&mut self, user_id: Uuid) -> StoreResult<Vec<Order>>;
    async fn update_order_status(&mut self, id: Uuid, status: OrderStatus) -> StoreResult<()>;
}

#[async_trait]
pub trait Accounts: Send {
    /// Fails with [`StoreError::Conflict`] when the email is already registered.
    async fn insert_user(&mut self, user: &User) -> StoreResult<User>;
    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>>;
    async fn insert_session(&mut self, session: &Session) -> StoreResult<Session>;
    /// Returns the number of sessions removed.
    async fn delete_sessions_for_user(&mut self, user_id: Uuid) -> StoreResult<u64>;
}

#[async_trait]
pub trait UnitOfWork: Catalog + Ledger + Accounts + Sized {
    async fn commit(self) -> StoreResult<()>;
    async fn rollback(self) -> StoreResult<()>;
}

#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    type Tx: UnitOfWork + 'static;

    async fn begin(&self) -> StoreResult<Self::Tx>;
}

/// Commits `tx` when `result` is `Ok`, rolls it back otherwise. The operation
/// error wins over a failed rollback, which is only logged.
pub async fn settle<T, U: UnitOfWork>(tx: U, operation: &'static str, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            tx.commit().await.during(operation)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(operation, error = %err, rollback_error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

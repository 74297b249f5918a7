//! PostgreSQL store.
//!
//! Each unit of work is one database transaction at the default READ COMMITTED
//! level. Rows that are read and then written back (product stock, order
//! status) are fetched with `SELECT ... FOR UPDATE`, so concurrent orders over
//! the same product queue on the row lock and the second one sees the stock
//! left by the first.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::{Accounts, Catalog, Ledger, Store, StoreError, StoreResult, UnitOfWork};
use crate::domain::aggregates::{NewOrder, Order, OrderItem, OrderStatus, Product, Session, User};

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(url).await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl Store for PgStore {
    type Tx = PgUnitOfWork;

    async fn begin(&self) -> StoreResult<PgUnitOfWork> {
        Ok(PgUnitOfWork { tx: self.pool.begin().await? })
    }
}

/// An open transaction. sqlx rolls it back when dropped uncommitted.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

fn classify(err: sqlx::Error) -> StoreError {
    if let Some(db) = err.as_database_error() {
        if db.is_unique_violation() || db.is_foreign_key_violation() || db.is_check_violation() {
            return StoreError::Conflict(db.message().to_string());
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl Catalog for PgUnitOfWork {
    async fn insert_product(&mut self, product: &Product) -> StoreResult<Product> {
        sqlx::query_as::<_, Product>(
            "INSERT INTO products (id, name, description, price, stock_quantity) VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, name, description, price, stock_quantity, created_at, updated_at",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock_quantity)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(classify)
    }

    async fn list_products(&mut self) -> StoreResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT id, name, description, price, stock_quantity, created_at, updated_at FROM products ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(products)
    }

    async fn get_product(&mut self, id: Uuid) -> StoreResult<Product> {
        sqlx::query_as::<_, Product>(
            "SELECT id, name, description, price, stock_quantity, created_at, updated_at FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| StoreError::not_found("product", id))
    }

    async fn lock_product(&mut self, id: Uuid) -> StoreResult<Product> {
        sqlx::query_as::<_, Product>(
            "SELECT id, name, description, price, stock_quantity, created_at, updated_at FROM products WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| StoreError::not_found("product", id))
    }

    async fn update_product(&mut self, product: &Product) -> StoreResult<Product> {
        sqlx::query_as::<_, Product>(
            "UPDATE products SET name = $2, description = $3, price = $4, stock_quantity = $5, updated_at = NOW() WHERE id = $1 \
             RETURNING id, name, description, price, stock_quantity, created_at, updated_at",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock_quantity)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(classify)?
        .ok_or_else(|| StoreError::not_found("product", product.id))
    }

    async fn delete_product(&mut self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(classify)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("product", id));
        }
        Ok(())
    }
}

impl PgUnitOfWork {
    async fn items_of(&mut self, order_id: Uuid) -> StoreResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT id, order_id, product_id, quantity, unit_price, subtotal, created_at, updated_at \
             FROM order_items WHERE order_id = $1 ORDER BY created_at, id",
        )
        .bind(order_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(items)
    }

    async fn order_row(&mut self, id: Uuid, for_update: bool) -> StoreResult<Order> {
        let query = if for_update {
            "SELECT id, user_id, status, total_amount, created_at, updated_at FROM orders WHERE id = $1 FOR UPDATE"
        } else {
            "SELECT id, user_id, status, total_amount, created_at, updated_at FROM orders WHERE id = $1"
        };
        let mut order = sqlx::query_as::<_, Order>(query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| StoreError::not_found("order", id))?;
        order.items = self.items_of(id).await?;
        Ok(order)
    }
}

#[async_trait]
impl Ledger for PgUnitOfWork {
    async fn create_order(&mut self, order: &NewOrder) -> StoreResult<Order> {
        let mut created = sqlx::query_as::<_, Order>(
            "INSERT INTO orders (id, user_id, status, total_amount) VALUES ($1, $2, $3, $4) \
             RETURNING id, user_id, status, total_amount, created_at, updated_at",
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(order.status)
        .bind(order.total_amount)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(classify)?;

        for item in &order.items {
            let row = sqlx::query_as::<_, OrderItem>(
                "INSERT INTO order_items (id, order_id, product_id, quantity, unit_price) VALUES ($1, $2, $3, $4, $5) \
                 RETURNING id, order_id, product_id, quantity, unit_price, subtotal, created_at, updated_at",
            )
            .bind(item.id)
            .bind(order.id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(classify)?;
            created.items.push(row);
        }
        Ok(created)
    }

    async fn get_order(&mut self, id: Uuid) -> StoreResult<Order> {
        self.order_row(id, false).await
    }

    async fn lock_order(&mut self, id: Uuid) -> StoreResult<Order> {
        self.order_row(id, true).await
    }

    async fn orders_for_user(&mut self, user_id: Uuid) -> StoreResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT id, user_id, status, total_amount, created_at, updated_at FROM orders \
             WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(orders)
    }

    async fn update_order_status(&mut self, id: Uuid, status: OrderStatus) -> StoreResult<()> {
        let result = sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("order", id));
        }
        Ok(())
    }
}

#[async_trait]
impl Accounts for PgUnitOfWork {
    async fn insert_user(&mut self, user: &User) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, email, password_hash, role) VALUES ($1, $2, $3, $4) \
             RETURNING id, email, password_hash, role, created_at, updated_at",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(classify)
    }

    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, role, created_at, updated_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(user)
    }

    async fn insert_session(&mut self, session: &Session) -> StoreResult<Session> {
        sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (id, user_id, refresh_token, is_blocked, expires_at) VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, user_id, refresh_token, is_blocked, expires_at, created_at",
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.refresh_token)
        .bind(session.is_blocked)
        .bind(session.expires_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(classify)
    }

    async fn delete_sessions_for_user(&mut self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

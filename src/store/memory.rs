//! In-process store.
//!
//! A unit of work takes the store's single lock for its whole lifetime and
//! mutates a staged copy of the state; `commit` swaps the copy in. Units of
//! work are therefore fully serialized, and an abandoned one leaves nothing
//! behind.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{Accounts, Catalog, Ledger, Store, StoreError, StoreResult, UnitOfWork};
use crate::domain::aggregates::{NewOrder, Order, OrderItem, OrderStatus, Product, Session, User};

#[derive(Clone, Debug, Default)]
struct State {
    products: HashMap<Uuid, Product>,
    /// Insertion order of `products`.
    product_log: Vec<Uuid>,
    orders: HashMap<Uuid, Order>,
    /// Insertion order of `orders`.
    order_log: Vec<Uuid>,
    users: HashMap<Uuid, User>,
    sessions: Vec<Session>,
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryUnitOfWork;

    async fn begin(&self) -> StoreResult<MemoryUnitOfWork> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryUnitOfWork { guard, staged })
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<State>,
    staged: State,
}

#[async_trait]
impl Catalog for MemoryUnitOfWork {
    async fn insert_product(&mut self, product: &Product) -> StoreResult<Product> {
        if self.staged.products.contains_key(&product.id) {
            return Err(StoreError::Conflict(format!("product {} already exists", product.id)));
        }
        let now = Utc::now();
        let stored = Product { created_at: now, updated_at: now, ..product.clone() };
        self.staged.products.insert(stored.id, stored.clone());
        self.staged.product_log.push(stored.id);
        Ok(stored)
    }

    async fn list_products(&mut self) -> StoreResult<Vec<Product>> {
        let state = &self.staged;
        Ok(state.product_log.iter().rev().filter_map(|id| state.products.get(id).cloned()).collect())
    }

    async fn get_product(&mut self, id: Uuid) -> StoreResult<Product> {
        self.staged.products.get(&id).cloned().ok_or_else(|| StoreError::not_found("product", id))
    }

    async fn lock_product(&mut self, id: Uuid) -> StoreResult<Product> {
        self.get_product(id).await
    }

    async fn update_product(&mut self, product: &Product) -> StoreResult<Product> {
        let stored = self.staged.products.get_mut(&product.id).ok_or_else(|| StoreError::not_found("product", product.id))?;
        *stored = Product { created_at: stored.created_at, updated_at: Utc::now(), ..product.clone() };
        Ok(stored.clone())
    }

    async fn delete_product(&mut self, id: Uuid) -> StoreResult<()> {
        if !self.staged.products.contains_key(&id) {
            return Err(StoreError::not_found("product", id));
        }
        let referenced = self.staged.orders.values().flat_map(|o| &o.items).any(|i| i.product_id == id);
        if referenced {
            return Err(StoreError::Conflict(format!("product {id} is referenced by existing orders")));
        }
        self.staged.products.remove(&id);
        self.staged.product_log.retain(|p| *p != id);
        Ok(())
    }
}

#[async_trait]
impl Ledger for MemoryUnitOfWork {
    async fn create_order(&mut self, order: &NewOrder) -> StoreResult<Order> {
        if self.staged.orders.contains_key(&order.id) {
            return Err(StoreError::Conflict(format!("order {} already exists", order.id)));
        }
        let now = Utc::now();
        let mut items = Vec::with_capacity(order.items.len());
        for item in &order.items {
            if items.iter().any(|i: &OrderItem| i.product_id == item.product_id) {
                return Err(StoreError::Conflict(format!("product {} listed twice in order {}", item.product_id, order.id)));
            }
            if !self.staged.products.contains_key(&item.product_id) {
                return Err(StoreError::Conflict(format!("order item references unknown product {}", item.product_id)));
            }
            items.push(OrderItem {
                id: item.id,
                order_id: order.id,
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
                subtotal: item.subtotal(),
                created_at: now,
                updated_at: now,
            });
        }
        let created = Order {
            id: order.id,
            user_id: order.user_id,
            status: order.status,
            total_amount: order.total_amount,
            created_at: now,
            updated_at: now,
            items,
        };
        self.staged.orders.insert(created.id, created.clone());
        self.staged.order_log.push(created.id);
        Ok(created)
    }

    async fn get_order(&mut self, id: Uuid) -> StoreResult<Order> {
        self.staged.orders.get(&id).cloned().ok_or_else(|| StoreError::not_found("order", id))
    }

    async fn lock_order(&mut self, id: Uuid) -> StoreResult<Order> {
        self.get_order(id).await
    }

    async fn orders_for_user(&mut self, user_id: Uuid) -> StoreResult<Vec<Order>> {
        let state = &self.staged;
        Ok(state
            .order_log
            .iter()
            .rev()
            .filter_map(|id| state.orders.get(id))
            .filter(|o| o.user_id == user_id)
            .map(|o| Order { items: Vec::new(), ..o.clone() })
            .collect())
    }

    async fn update_order_status(&mut self, id: Uuid, status: OrderStatus) -> StoreResult<()> {
        let order = self.staged.orders.get_mut(&id).ok_or_else(|| StoreError::not_found("order", id))?;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl Accounts for MemoryUnitOfWork {
    async fn insert_user(&mut self, user: &User) -> StoreResult<User> {
        if self.staged.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!("email {} already registered", user.email)));
        }
        self.staged.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.staged.users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_session(&mut self, session: &Session) -> StoreResult<Session> {
        self.staged.sessions.push(session.clone());
        Ok(session.clone())
    }

    async fn delete_sessions_for_user(&mut self, user_id: Uuid) -> StoreResult<u64> {
        let before = self.staged.sessions.len();
        self.staged.sessions.retain(|s| s.user_id != user_id);
        Ok((before - self.staged.sessions.len()) as u64)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(self) -> StoreResult<()> {
        let Self { mut guard, staged } = self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        Ok(())
    }
}

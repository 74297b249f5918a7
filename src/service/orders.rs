//! Order engine: placement, cancellation and status changes.
//!
//! Placement and cancellation each run as one unit of work spanning the
//! catalog and the ledger. Products are read through
//! [`lock_product`](crate::store::Catalog::lock_product) and the order through
//! [`lock_order`](crate::store::Ledger::lock_order), so the checks are made on rows
//! no concurrent unit of work can change before commit.

use tracing::info;
use uuid::Uuid;

use crate::bus::EventBus;
use crate::domain::aggregates::{NewOrder, NewOrderItem, Order, OrderStatus};
use crate::domain::events::{DomainEvent, StockMovement};
use crate::domain::value_objects::{validate_lines, OrderLine};
use crate::error::{Error, Result, StoreResultExt};
use crate::store::{settle, Ledger, Store, UnitOfWork};

#[derive(Clone)]
pub struct OrderEngine<S> {
    store: S,
    events: EventBus,
}

impl<S: Store> OrderEngine<S> {
    pub fn new(store: S, events: EventBus) -> Self { Self { store, events } }

    /// Deducts stock for every line and records a pending order priced at the
    /// current catalog prices. All or nothing.
    pub async fn create_order(&self, user_id: Uuid, lines: &[OrderLine]) -> Result<Order> {
        const OP: &str = "create_order";
        validate_lines(lines)?;

        let mut tx = self.store.begin().await.during(OP)?;
        let result = place(&mut tx, user_id, lines).await;
        let order = settle(tx, OP, result).await?;

        info!(order_id = %order.id, user_id = %user_id, total = %order.total_amount, items = order.items.len(), "Order placed");
        self.events
            .publish(DomainEvent::OrderPlaced {
                order_id: order.id,
                user_id,
                total: order.total_amount,
                items: movements(&order),
            })
            .await;
        Ok(order)
    }

    /// Cancels a pending order owned by `user_id` and puts its stock back.
    pub async fn cancel_order(&self, order_id: Uuid, user_id: Uuid) -> Result<Order> {
        const OP: &str = "cancel_order";

        let mut tx = self.store.begin().await.during(OP)?;
        let result = revoke(&mut tx, order_id, user_id).await;
        let order = settle(tx, OP, result).await?;

        info!(order_id = %order_id, user_id = %user_id, "Order cancelled");
        self.events
            .publish(DomainEvent::OrderCancelled { order_id, user_id, restocked: movements(&order) })
            .await;
        Ok(order)
    }

    /// Administrative status change. Any non-terminal status may move to any
    /// status; stock is not touched.
    pub async fn update_status(&self, order_id: Uuid, status: OrderStatus) -> Result<()> {
        const OP: &str = "update_status";

        let mut tx = self.store.begin().await.during(OP)?;
        let result = async {
            let order = tx.lock_order(order_id).await.during(OP)?;
            order.ensure_not_terminal()?;
            tx.update_order_status(order_id, status).await.during(OP)?;
            Ok::<_, Error>(order.status)
        }
        .await;
        let previous = settle(tx, OP, result).await?;

        info!(order_id = %order_id, from = %previous, to = %status, "Order status updated");
        self.events
            .publish(DomainEvent::OrderStatusChanged { order_id, from: previous, to: status })
            .await;
        Ok(())
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<Order> {
        let mut tx = self.store.begin().await.during("get_order")?;
        tx.get_order(order_id).await.during("get_order")
    }

    pub async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let mut tx = self.store.begin().await.during("orders_for_user")?;
        tx.orders_for_user(user_id).await.during("orders_for_user")
    }
}

async fn place<U: UnitOfWork>(tx: &mut U, user_id: Uuid, lines: &[OrderLine]) -> Result<Order> {
    const OP: &str = "create_order";
    let mut items = Vec::with_capacity(lines.len());

    for line in lines {
        let mut product = tx.lock_product(line.product_id).await.during(OP)?;
        product.withdraw(line.quantity)?;
        tx.update_product(&product).await.during(OP)?;
        items.push(NewOrderItem::new(product.id, line.quantity, product.price));
    }

    tx.create_order(&NewOrder::pending(user_id, items)).await.during(OP)
}

async fn revoke<U: UnitOfWork>(tx: &mut U, order_id: Uuid, user_id: Uuid) -> Result<Order> {
    const OP: &str = "cancel_order";
    let mut order = tx.lock_order(order_id).await.during(OP)?;
    order.ensure_cancellable_by(user_id)?;

    tx.update_order_status(order_id, OrderStatus::Cancelled).await.during(OP)?;
    for item in &order.items {
        let mut product = tx.lock_product(item.product_id).await.during(OP)?;
        product.restock(item.quantity)?;
        tx.update_product(&product).await.during(OP)?;
    }

    order.status = OrderStatus::Cancelled;
    Ok(order)
}

fn movements(order: &Order) -> Vec<StockMovement> {
    order.items.iter().map(|i| StockMovement { product_id: i.product_id, quantity: i.quantity }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use crate::domain::aggregates::{Product, ProductDetails};
    use crate::error::ErrorKind;
    use crate::store::{Catalog, MemoryStore};

    async fn seed(store: &MemoryStore, price: Decimal, stock: i32) -> Product {
        let mut tx = store.begin().await.unwrap();
        let details = ProductDetails { name: "Mug".into(), description: String::new(), price, stock_quantity: stock };
        let product = tx.insert_product(&Product::draft(details).unwrap()).await.unwrap();
        tx.commit().await.unwrap();
        product
    }

    async fn stock(store: &MemoryStore, id: Uuid) -> i32 {
        store.begin().await.unwrap().get_product(id).await.unwrap().stock_quantity
    }

    #[tokio::test]
    async fn test_unit_price_is_snapshotted() {
        let store = MemoryStore::new();
        let engine = OrderEngine::new(store.clone(), EventBus::disabled());
        let mug = seed(&store, Decimal::new(450, 2), 10).await;

        let order = engine.create_order(Uuid::now_v7(), &[OrderLine::new(mug.id, 2)]).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let mut repriced = tx.lock_product(mug.id).await.unwrap();
        repriced.price = Decimal::new(999, 2);
        tx.update_product(&repriced).await.unwrap();
        tx.commit().await.unwrap();

        let stored = engine.get_order(order.id).await.unwrap();
        assert_eq!(stored.items[0].unit_price, Decimal::new(450, 2));
        assert_eq!(stored.total_amount, Decimal::new(900, 2));
    }

    #[tokio::test]
    async fn test_validation_happens_before_any_write() {
        let store = MemoryStore::new();
        let engine = OrderEngine::new(store.clone(), EventBus::disabled());
        let mug = seed(&store, Decimal::ONE, 3).await;

        let err = engine.create_order(Uuid::now_v7(), &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = engine.create_order(Uuid::now_v7(), &[OrderLine::new(mug.id, 0)]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(stock(&store, mug.id).await, 3);
    }

    #[tokio::test]
    async fn test_update_status_refuses_terminal_orders() {
        let store = MemoryStore::new();
        let engine = OrderEngine::new(store.clone(), EventBus::disabled());
        let mug = seed(&store, Decimal::ONE, 3).await;
        let order = engine.create_order(Uuid::now_v7(), &[OrderLine::new(mug.id, 1)]).await.unwrap();

        engine.update_status(order.id, OrderStatus::Shipped).await.unwrap();
        // backward moves among non-terminal states are allowed
        engine.update_status(order.id, OrderStatus::Pending).await.unwrap();
        engine.update_status(order.id, OrderStatus::Delivered).await.unwrap();

        for target in OrderStatus::ALL {
            let err = engine.update_status(order.id, target).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::TerminalState);
        }
        assert_eq!(engine.get_order(order.id).await.unwrap().status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn test_cancelled_orders_are_final() {
        let store = MemoryStore::new();
        let engine = OrderEngine::new(store.clone(), EventBus::disabled());
        let mug = seed(&store, Decimal::ONE, 3).await;
        let owner = Uuid::now_v7();
        let order = engine.create_order(owner, &[OrderLine::new(mug.id, 2)]).await.unwrap();
        engine.cancel_order(order.id, owner).await.unwrap();

        for target in OrderStatus::ALL {
            let err = engine.update_status(order.id, target).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::TerminalState);
        }
        assert_eq!(engine.get_order(order.id).await.unwrap().status, OrderStatus::Cancelled);
        assert_eq!(stock(&store, mug.id).await, 3);
    }

    #[tokio::test]
    async fn test_update_status_unknown_order() {
        let engine = OrderEngine::new(MemoryStore::new(), EventBus::disabled());
        let err = engine.update_status(Uuid::now_v7(), OrderStatus::Confirmed).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

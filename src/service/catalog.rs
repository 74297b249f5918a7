//! Catalog administration.

use tracing::info;
use uuid::Uuid;

use crate::bus::EventBus;
use crate::domain::aggregates::{Product, ProductDetails};
use crate::domain::events::DomainEvent;
use crate::error::{Result, StoreResultExt};
use crate::store::{settle, Catalog, Store};

#[derive(Clone)]
pub struct CatalogService<S> {
    store: S,
    events: EventBus,
}

impl<S: Store> CatalogService<S> {
    pub fn new(store: S, events: EventBus) -> Self { Self { store, events } }

    pub async fn create_product(&self, details: ProductDetails) -> Result<Product> {
        const OP: &str = "create_product";
        let draft = Product::draft(details)?;

        let mut tx = self.store.begin().await.during(OP)?;
        let result = tx.insert_product(&draft).await.during(OP);
        let product = settle(tx, OP, result).await?;

        info!(product_id = %product.id, name = %product.name, "Product created");
        self.events
            .publish(DomainEvent::ProductCreated { product_id: product.id, name: product.name.clone() })
            .await;
        Ok(product)
    }

    pub async fn get_product(&self, id: Uuid) -> Result<Product> {
        let mut tx = self.store.begin().await.during("get_product")?;
        tx.get_product(id).await.during("get_product")
    }

    pub async fn list_products(&self) -> Result<Vec<Product>> {
        let mut tx = self.store.begin().await.during("list_products")?;
        tx.list_products().await.during("list_products")
    }

    /// Replaces every editable field, stock included.
    pub async fn update_product(&self, id: Uuid, details: ProductDetails) -> Result<Product> {
        const OP: &str = "update_product";
        details.validate()?;

        let mut tx = self.store.begin().await.during(OP)?;
        let result = async {
            let mut product = tx.lock_product(id).await.during(OP)?;
            product.apply(details)?;
            tx.update_product(&product).await.during(OP)
        }
        .await;
        let product = settle(tx, OP, result).await?;

        info!(product_id = %id, stock = product.stock_quantity, "Product updated");
        Ok(product)
    }

    /// Products referenced by any order cannot be deleted.
    pub async fn delete_product(&self, id: Uuid) -> Result<()> {
        const OP: &str = "delete_product";

        let mut tx = self.store.begin().await.during(OP)?;
        let result = tx.delete_product(id).await.during(OP);
        settle(tx, OP, result).await?;

        info!(product_id = %id, "Product deleted");
        self.events.publish(DomainEvent::ProductDeleted { product_id: id }).await;
        Ok(())
    }
}

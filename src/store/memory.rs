use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::domain::catalog::ProductCatalog;
use crate::domain::inventory::{InventoryError, InventoryLedger, Product, StockDelta};
use crate::domain::order::{Order, OrderEvent};
use crate::event_sourcing::EventEnvelope;
use super::order_store::{OrderStore, StoreError};

// ============================================================================
// In-Memory Order Store
// ============================================================================

struct StoredOrder {
    order: Order,
    history: Vec<EventEnvelope<OrderEvent>>,
}

#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<Uuid, StoredOrder>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: &Order, placed: EventEnvelope<OrderEvent>) -> Result<(), StoreError> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(StoreError::AlreadyExists(order.id));
        }

        orders.insert(order.id, StoredOrder { order: order.clone(), history: vec![placed] });
        Ok(())
    }

    async fn find_by_id(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.read().await.get(&order_id).map(|stored| stored.order.clone()))
    }

    async fn find_by_owner(&self, owner: Uuid) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().await;
        let mut owned: Vec<Order> = orders
            .values()
            .filter(|stored| stored.order.owner == owner)
            .map(|stored| stored.order.clone())
            .collect();
        owned.sort_by_key(|order| order.created_at);
        Ok(owned)
    }

    async fn find_all(&self) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().await;
        let mut all: Vec<Order> = orders.values().map(|stored| stored.order.clone()).collect();
        all.sort_by_key(|order| order.created_at);
        Ok(all)
    }

    async fn update(
        &self,
        order: &Order,
        expected_version: i64,
        events: Vec<EventEnvelope<OrderEvent>>,
    ) -> Result<(), StoreError> {
        let mut orders = self.orders.write().await;
        let stored = orders.get_mut(&order.id).ok_or(StoreError::NotFound(order.id))?;

        if stored.order.version != expected_version {
            return Err(StoreError::VersionConflict {
                id: order.id,
                expected: expected_version,
                actual: stored.order.version,
            });
        }

        stored.order = order.clone();
        stored.history.extend(events);
        Ok(())
    }

    async fn delete(&self, order_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.orders.write().await.remove(&order_id).is_some())
    }

    async fn history(&self, order_id: Uuid) -> Result<Vec<EventEnvelope<OrderEvent>>, StoreError> {
        let orders = self.orders.read().await;
        let stored = orders.get(&order_id).ok_or(StoreError::NotFound(order_id))?;
        Ok(stored.history.clone())
    }
}

// ============================================================================
// In-Memory Inventory
// ============================================================================
//
// One lock guards every product, so a whole batch is checked and applied
// as a single step.
//
// ============================================================================

#[derive(Default)]
pub struct InMemoryInventory {
    products: Mutex<HashMap<Uuid, Product>>,
}

impl InMemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert_product(&self, product: Product) {
        self.products.lock().await.insert(product.id, product);
    }

    pub async fn remove_product(&self, product_id: Uuid) -> Option<Product> {
        self.products.lock().await.remove(&product_id)
    }
}

fn apply_in_place(products: &mut HashMap<Uuid, Product>, delta: &StockDelta) -> Result<u32, InventoryError> {
    let product = products
        .get_mut(&delta.product_id)
        .ok_or(InventoryError::ProductNotFound(delta.product_id))?;

    product.stock = delta.apply_to(product.stock)?;
    Ok(product.stock)
}

#[async_trait]
impl InventoryLedger for InMemoryInventory {
    async fn stock(&self, product_id: Uuid) -> Result<u32, InventoryError> {
        self.products
            .lock()
            .await
            .get(&product_id)
            .map(|product| product.stock)
            .ok_or(InventoryError::ProductNotFound(product_id))
    }

    async fn decrement(&self, product_id: Uuid, quantity: u32) -> Result<u32, InventoryError> {
        apply_in_place(&mut *self.products.lock().await, &StockDelta::decrement(product_id, quantity))
    }

    async fn increment(&self, product_id: Uuid, quantity: u32) -> Result<u32, InventoryError> {
        apply_in_place(&mut *self.products.lock().await, &StockDelta::increment(product_id, quantity))
    }

    async fn apply_batch(&self, deltas: &[StockDelta]) -> Result<(), InventoryError> {
        let mut products = self.products.lock().await;

        // Validate the whole batch against the current counts before touching any
        let mut staged: HashMap<Uuid, u32> = HashMap::with_capacity(deltas.len());
        for delta in deltas {
            let current = match staged.get(&delta.product_id) {
                Some(stock) => *stock,
                None => products
                    .get(&delta.product_id)
                    .map(|product| product.stock)
                    .ok_or(InventoryError::ProductNotFound(delta.product_id))?,
            };
            staged.insert(delta.product_id, delta.apply_to(current)?);
        }

        for (product_id, stock) in staged {
            if let Some(product) = products.get_mut(&product_id) {
                product.stock = stock;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ProductCatalog for InMemoryInventory {
    async fn all_products(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.products.lock().await.values().cloned().collect())
    }
}

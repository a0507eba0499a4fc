use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use rust_decimal::Decimal;
use scylla::client::session::Session;
use scylla::response::query_result::QueryResult;
use scylla::serialize::row::SerializeRow;
use scylla::statement::batch::Batch;
use scylla::value::{CqlValue, Row};
use uuid::Uuid;

use crate::domain::catalog::ProductCatalog;
use crate::domain::inventory::{InventoryError, InventoryLedger, Product, StockDelta};
use crate::domain::order::{Order, OrderEvent};
use crate::event_sourcing::{deserialize_event, serialize_event, EventEnvelope};
use super::order_store::{OrderStore, StoreError};

// ============================================================================
// ScyllaDB Order Store
// ============================================================================
//
// Snapshot writes are lightweight transactions conditioned on the stored
// version, batched with the event rows of the same partition, so either the
// snapshot and its events land together or neither does.
//
// ============================================================================

/// Compare-and-set retries before a contended stock row is reported unavailable
const MAX_CAS_ATTEMPTS: u32 = 16;

const INSERT_EVENT: &str = "INSERT INTO orders (
        order_id, sequence_number, event_id, event_type, event_version,
        event_data, user_id, correlation_id, causation_id, recorded_at, metadata
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

type EventRow = (
    Uuid,
    i64,
    Uuid,
    String,
    i32,
    String,
    Option<Uuid>,
    Uuid,
    Option<Uuid>,
    DateTime<Utc>,
    HashMap<String, String>,
);

type HistoryRow = (
    i64,
    Uuid,
    String,
    i32,
    String,
    Option<Uuid>,
    Uuid,
    Option<Uuid>,
    DateTime<Utc>,
    // An empty map reads back as null
    Option<HashMap<String, String>>,
);

fn unavailable(err: impl Display) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn event_row(
    order_id: Uuid,
    envelope: &EventEnvelope<OrderEvent>,
) -> Result<EventRow, StoreError> {
    let event_json = serialize_event(&envelope.event_data).map_err(|e| StoreError::Corrupt {
        id: order_id,
        reason: e.to_string(),
    })?;

    Ok((
        order_id,
        envelope.sequence_number,
        envelope.event_id,
        envelope.event_type.clone(),
        envelope.event_version,
        event_json,
        envelope.user_id,
        envelope.correlation_id,
        envelope.causation_id,
        envelope.timestamp,
        envelope.metadata.clone(),
    ))
}

/// Outcome of a lightweight transaction: `[applied]` plus the current value
/// of `column` when the write was not applied.
fn lwt_outcome(result: QueryResult, column: &str) -> Result<(bool, Option<CqlValue>), StoreError> {
    let rows = result.into_rows_result().map_err(unavailable)?;
    let position = rows.column_specs().iter().position(|spec| spec.name() == column);
    let row: Row = rows.first_row::<Row>().map_err(unavailable)?;

    let applied = match row.columns.first() {
        Some(Some(CqlValue::Boolean(applied))) => *applied,
        _ => {
            return Err(StoreError::Unavailable(
                "conditional write returned no [applied] column".to_string(),
            ))
        }
    };

    let current = position.and_then(|index| row.columns.into_iter().nth(index).flatten());
    Ok((applied, current))
}

fn parse_document(order_id: Uuid, document: &str) -> Result<Order, StoreError> {
    serde_json::from_str(document).map_err(|e| StoreError::Corrupt {
        id: order_id,
        reason: e.to_string(),
    })
}

pub struct ScyllaOrderStore {
    session: Arc<Session>,
}

impl ScyllaOrderStore {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    fn document(order: &Order) -> Result<String, StoreError> {
        serde_json::to_string(order).map_err(|e| StoreError::Corrupt {
            id: order.id,
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl OrderStore for ScyllaOrderStore {
    async fn insert(&self, order: &Order, placed: EventEnvelope<OrderEvent>) -> Result<(), StoreError> {
        let document = Self::document(order)?;
        let (_, sequence_number, event_id, event_type, event_version, event_json, user_id, correlation_id, causation_id, recorded_at, metadata) =
            event_row(order.id, &placed)?;

        // Index before the order row; find_by_owner skips entries with no order behind them
        self.session
            .query_unpaged(
                "INSERT INTO orders_by_owner (owner_id, order_id, created_at) VALUES (?, ?, ?)",
                (order.owner, order.id, order.created_at),
            )
            .await
            .map_err(unavailable)?;

        let result = self
            .session
            .query_unpaged(
                "INSERT INTO orders (
                    order_id, sequence_number, owner_id, status, version, document,
                    event_id, event_type, event_version, event_data,
                    user_id, correlation_id, causation_id, recorded_at, metadata
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) IF NOT EXISTS",
                (
                    order.id,
                    sequence_number,
                    order.owner,
                    order.status.as_str(),
                    order.version,
                    document,
                    event_id,
                    event_type,
                    event_version,
                    event_json,
                    user_id,
                    correlation_id,
                    causation_id,
                    recorded_at,
                    metadata,
                ),
            )
            .await
            .map_err(|err| {
                tracing::error!(
                    order_id = %order.id,
                    owner = %order.owner,
                    error = %err,
                    "Order write failed after its owner index entry was written"
                );
                unavailable(err)
            })?;

        let (applied, _) = lwt_outcome(result, "version")?;
        if !applied {
            return Err(StoreError::AlreadyExists(order.id));
        }

        tracing::info!(
            order_id = %order.id,
            owner = %order.owner,
            version = order.version,
            "✅ Persisted new order"
        );

        Ok(())
    }

    async fn find_by_id(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
        let result = self
            .session
            .query_unpaged("SELECT document FROM orders WHERE order_id = ? LIMIT 1", (order_id,))
            .await
            .map_err(unavailable)?;

        let rows = result.into_rows_result().map_err(unavailable)?;
        match rows.maybe_first_row::<(Option<String>,)>().map_err(unavailable)? {
            Some((Some(document),)) => parse_document(order_id, &document).map(Some),
            _ => Ok(None),
        }
    }

    async fn find_by_owner(&self, owner: Uuid) -> Result<Vec<Order>, StoreError> {
        let result = self
            .session
            .query_unpaged("SELECT order_id FROM orders_by_owner WHERE owner_id = ?", (owner,))
            .await
            .map_err(unavailable)?;

        let rows = result.into_rows_result().map_err(unavailable)?;
        let mut orders = Vec::new();
        for row in rows.rows::<(Uuid,)>().map_err(unavailable)? {
            let (order_id,) = row.map_err(unavailable)?;
            // Index entries can briefly outlive a deleted order
            if let Some(order) = self.find_by_id(order_id).await? {
                orders.push(order);
            }
        }

        orders.sort_by_key(|order| order.created_at);
        Ok(orders)
    }

    async fn find_all(&self) -> Result<Vec<Order>, StoreError> {
        let pager = self
            .session
            .query_iter("SELECT DISTINCT order_id, document FROM orders", &[])
            .await
            .map_err(unavailable)?;

        let rows: Vec<(Uuid, Option<String>)> = pager
            .rows_stream::<(Uuid, Option<String>)>()
            .map_err(unavailable)?
            .try_collect()
            .await
            .map_err(unavailable)?;

        let mut orders = rows
            .into_iter()
            .filter_map(|(order_id, document)| document.map(|doc| parse_document(order_id, &doc)))
            .collect::<Result<Vec<_>, _>>()?;

        orders.sort_by_key(|order| order.created_at);
        Ok(orders)
    }

    async fn update(
        &self,
        order: &Order,
        expected_version: i64,
        events: Vec<EventEnvelope<OrderEvent>>,
    ) -> Result<(), StoreError> {
        let document = Self::document(order)?;

        let mut batch = Batch::default();
        let mut values: Vec<Box<dyn SerializeRow + Send + Sync>> = Vec::with_capacity(events.len() + 1);

        batch.append_statement(
            "UPDATE orders SET status = ?, version = ?, document = ? WHERE order_id = ? IF version = ?",
        );
        values.push(Box::new((
            order.status.as_str().to_string(),
            order.version,
            document,
            order.id,
            expected_version,
        )));

        for envelope in &events {
            batch.append_statement(INSERT_EVENT);
            values.push(Box::new(event_row(order.id, envelope)?));
        }

        let result = self.session.batch(&batch, values).await.map_err(unavailable)?;

        match lwt_outcome(result, "version")? {
            (true, _) => {}
            (false, Some(CqlValue::BigInt(actual))) => {
                return Err(StoreError::VersionConflict {
                    id: order.id,
                    expected: expected_version,
                    actual,
                });
            }
            (false, _) => return Err(StoreError::NotFound(order.id)),
        }

        tracing::info!(
            order_id = %order.id,
            status = %order.status,
            new_version = order.version,
            event_count = events.len(),
            "✅ Updated order snapshot and history"
        );

        Ok(())
    }

    async fn delete(&self, order_id: Uuid) -> Result<bool, StoreError> {
        let Some(order) = self.find_by_id(order_id).await? else {
            return Ok(false);
        };

        let mut batch = Batch::default();
        batch.append_statement("DELETE FROM orders WHERE order_id = ?");
        batch.append_statement("DELETE FROM orders_by_owner WHERE owner_id = ? AND order_id = ?");

        self.session
            .batch(&batch, ((order_id,), (order.owner, order_id)))
            .await
            .map_err(unavailable)?;

        Ok(true)
    }

    async fn history(&self, order_id: Uuid) -> Result<Vec<EventEnvelope<OrderEvent>>, StoreError> {
        let result = self
            .session
            .query_unpaged(
                "SELECT sequence_number, event_id, event_type, event_version, event_data,
                        user_id, correlation_id, causation_id, recorded_at, metadata
                 FROM orders WHERE order_id = ?",
                (order_id,),
            )
            .await
            .map_err(unavailable)?;

        let rows = result.into_rows_result().map_err(unavailable)?;
        let mut events = Vec::new();

        for row in rows.rows::<HistoryRow>().map_err(unavailable)? {
            let (sequence_number, event_id, event_type, event_version, event_json, user_id, correlation_id, causation_id, timestamp, metadata) =
                row.map_err(unavailable)?;

            let event_data: OrderEvent = deserialize_event(&event_json).map_err(|e| StoreError::Corrupt {
                id: order_id,
                reason: e.to_string(),
            })?;

            events.push(EventEnvelope {
                event_id,
                aggregate_id: order_id,
                sequence_number,
                event_type,
                event_version,
                event_data,
                causation_id,
                correlation_id,
                user_id,
                timestamp,
                metadata: metadata.unwrap_or_default(),
            });
        }

        if events.is_empty() {
            return Err(StoreError::NotFound(order_id));
        }

        tracing::debug!("Loaded {} events for order {}", events.len(), order_id);
        Ok(events)
    }
}

// ============================================================================
// ScyllaDB Inventory
// ============================================================================
//
// Each adjustment is a compare-and-set on the product row
// (UPDATE ... IF stock = ?), retried while other writers win the race.
//
// ============================================================================

pub struct ScyllaInventory {
    session: Arc<Session>,
}

impl ScyllaInventory {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub async fn upsert_product(&self, product: &Product) -> Result<(), StoreError> {
        self.session
            .query_unpaged(
                "INSERT INTO products (product_id, name, category, price, stock) VALUES (?, ?, ?, ?, ?)",
                (
                    product.id,
                    product.name.as_str(),
                    product.category.as_str(),
                    product.price.to_string(),
                    i64::from(product.stock),
                ),
            )
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn compare_and_set(&self, product_id: Uuid, expected: u32, next: u32) -> Result<bool, InventoryError> {
        let result = self
            .session
            .query_unpaged(
                "UPDATE products SET stock = ? WHERE product_id = ? IF stock = ?",
                (i64::from(next), product_id, i64::from(expected)),
            )
            .await
            .map_err(unavailable)?;

        let (applied, _) = lwt_outcome(result, "stock")?;
        Ok(applied)
    }

    async fn adjust(&self, delta: StockDelta) -> Result<u32, InventoryError> {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let current = self.stock(delta.product_id).await?;
            let next = delta.apply_to(current)?;

            if self.compare_and_set(delta.product_id, current, next).await? {
                return Ok(next);
            }

            tracing::debug!(
                product_id = %delta.product_id,
                attempt,
                "Stock changed concurrently, retrying compare-and-set"
            );
        }

        Err(InventoryError::Storage(StoreError::Unavailable(format!(
            "stock for product {} is too contended",
            delta.product_id
        ))))
    }
}

fn stock_from_column(product_id: Uuid, stock: i64) -> Result<u32, StoreError> {
    u32::try_from(stock).map_err(|_| StoreError::Corrupt {
        id: product_id,
        reason: format!("stock {stock} out of range"),
    })
}

#[async_trait]
impl InventoryLedger for ScyllaInventory {
    async fn stock(&self, product_id: Uuid) -> Result<u32, InventoryError> {
        let result = self
            .session
            .query_unpaged("SELECT stock FROM products WHERE product_id = ?", (product_id,))
            .await
            .map_err(unavailable)?;

        let rows = result.into_rows_result().map_err(unavailable)?;
        match rows.maybe_first_row::<(Option<i64>,)>().map_err(unavailable)? {
            Some((Some(stock),)) => Ok(stock_from_column(product_id, stock)?),
            _ => Err(InventoryError::ProductNotFound(product_id)),
        }
    }

    async fn decrement(&self, product_id: Uuid, quantity: u32) -> Result<u32, InventoryError> {
        self.adjust(StockDelta::decrement(product_id, quantity)).await
    }

    async fn increment(&self, product_id: Uuid, quantity: u32) -> Result<u32, InventoryError> {
        self.adjust(StockDelta::increment(product_id, quantity)).await
    }
}

#[async_trait]
impl ProductCatalog for ScyllaInventory {
    async fn all_products(&self) -> Result<Vec<Product>, StoreError> {
        let pager = self
            .session
            .query_iter("SELECT product_id, name, category, price, stock FROM products", &[])
            .await
            .map_err(unavailable)?;

        let rows: Vec<(Uuid, Option<String>, Option<String>, Option<String>, Option<i64>)> = pager
            .rows_stream()
            .map_err(unavailable)?
            .try_collect()
            .await
            .map_err(unavailable)?;

        rows.into_iter()
            .map(|(id, name, category, price, stock)| {
                let price = Decimal::from_str(price.as_deref().unwrap_or("0")).map_err(|e| StoreError::Corrupt {
                    id,
                    reason: e.to_string(),
                })?;
                Ok(Product {
                    id,
                    name: name.unwrap_or_default(),
                    category: category.unwrap_or_default(),
                    price,
                    stock: stock_from_column(id, stock.unwrap_or(0))?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::aggregate::tests::new_order;
    use crate::event_sourcing::Aggregate;
    use rust_decimal_macros::dec;
    use scylla::client::session_builder::SessionBuilder;

    fn placed(owner: Uuid) -> (Order, EventEnvelope<OrderEvent>) {
        let event = Order::place(owner, new_order(&[(Uuid::new_v4(), 2)], dec!(20))).unwrap();
        let order = Order::apply_first_event(Uuid::now_v7(), &event).unwrap();
        let envelope = EventEnvelope::new(order.id, 1, event.event_type().to_string(), event, Uuid::new_v4())
            .with_user(owner)
            .with_metadata("role", "customer");
        (order, envelope)
    }

    #[test]
    fn test_event_row_carries_metadata() {
        let (order, envelope) = placed(Uuid::new_v4());

        let row = event_row(order.id, &envelope).unwrap();

        assert_eq!(row.0, order.id);
        assert_eq!(row.1, 1);
        assert_eq!(row.3, "OrderPlaced");
        assert_eq!(row.10.get("role").map(String::as_str), Some("customer"));
    }

    #[tokio::test]
    #[ignore = "requires a ScyllaDB node at STOREFRONT_SCYLLA_NODES or 127.0.0.1:9042"]
    async fn test_placed_order_is_listed_and_keeps_metadata() {
        let nodes = std::env::var("STOREFRONT_SCYLLA_NODES").unwrap_or_else(|_| "127.0.0.1:9042".to_string());
        let session = SessionBuilder::new().known_node(nodes).build().await.unwrap();
        crate::store::schema::ensure_schema(&session, "storefront_test").await.unwrap();
        let store = ScyllaOrderStore::new(Arc::new(session));

        let owner = Uuid::new_v4();
        let (order, envelope) = placed(owner);
        store.insert(&order, envelope.clone()).await.unwrap();

        assert!(matches!(store.insert(&order, envelope).await, Err(StoreError::AlreadyExists(id)) if id == order.id));

        let owned = store.find_by_owner(owner).await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].id, order.id);

        let history = store.history(order.id).await.unwrap();
        assert_eq!(history[0].metadata.get("role").map(String::as_str), Some("customer"));
        assert_eq!(history[0].user_id, Some(owner));
    }
}

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::order::{Order, OrderEvent};
use crate::event_sourcing::EventEnvelope;
use crate::utils::IsTransient;

// ============================================================================
// Order Store - Repository for order snapshots and their history
// ============================================================================
//
// Responsibilities:
// 1. Persist the order snapshot together with the events that produced it
// 2. Optimistic concurrency: an update names the version it was derived from
// 3. Lookups by id, by owner, and over every order
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(Uuid),

    #[error("Record already exists: {0}")]
    AlreadyExists(Uuid),

    #[error("Concurrency conflict on {id}: expected version {expected}, but current is {actual}")]
    VersionConflict { id: Uuid, expected: i64, actual: i64 },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt record {id}: {reason}")]
    Corrupt { id: Uuid, reason: String },
}

impl IsTransient for StoreError {
    fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a brand new order with its first event
    async fn insert(&self, order: &Order, placed: EventEnvelope<OrderEvent>) -> Result<(), StoreError>;

    async fn find_by_id(&self, order_id: Uuid) -> Result<Option<Order>, StoreError>;

    async fn find_by_owner(&self, owner: Uuid) -> Result<Vec<Order>, StoreError>;

    async fn find_all(&self) -> Result<Vec<Order>, StoreError>;

    /// Replace the snapshot if its stored version still equals `expected_version`,
    /// appending `events` atomically with it.
    async fn update(
        &self,
        order: &Order,
        expected_version: i64,
        events: Vec<EventEnvelope<OrderEvent>>,
    ) -> Result<(), StoreError>;

    /// Remove the order and its history. Returns false if it did not exist.
    async fn delete(&self, order_id: Uuid) -> Result<bool, StoreError>;

    /// Events recorded for an order, oldest first
    async fn history(&self, order_id: Uuid) -> Result<Vec<EventEnvelope<OrderEvent>>, StoreError>;
}

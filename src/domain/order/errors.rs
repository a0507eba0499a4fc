use uuid::Uuid;

use crate::domain::inventory::InventoryError;
use crate::store::StoreError;
use super::value_objects::OrderStatus;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Invalid order: {0}")]
    Validation(String),

    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),

    #[error("Forbidden: {0}")]
    Forbidden(&'static str),

    #[error("Cannot move order from {from} to {to}: {reason}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
        reason: &'static str,
    },

    #[error("Order is already {status}")]
    AlreadyInState { status: OrderStatus },

    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        requested: u32,
        available: u32,
    },

    #[error("Order {0} was modified concurrently, reload and retry")]
    Conflict(Uuid),

    #[error("Order {0} has already been placed")]
    AlreadyPlaced(Uuid),

    #[error("Aggregate not initialized")]
    NotInitialized,

    #[error("Sum of order totals does not fit in a decimal")]
    AmountOverflow,

    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl OrderError {
    /// Machine-readable code, stable across releases
    pub fn code(&self) -> &'static str {
        match self {
            OrderError::Validation(_) => "VALIDATION_ERROR",
            OrderError::NotFound(_) => "NOT_FOUND",
            OrderError::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            OrderError::Forbidden(_) => "FORBIDDEN",
            OrderError::InvalidTransition { .. } => "INVALID_TRANSITION",
            OrderError::AlreadyInState { .. } => "ALREADY_IN_STATE",
            OrderError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            OrderError::Conflict(_) => "CONFLICT",
            OrderError::AlreadyPlaced(_) | OrderError::NotInitialized => "INTERNAL_ERROR",
            OrderError::AmountOverflow => "AMOUNT_OVERFLOW",
            OrderError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

impl From<StoreError> for OrderError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VersionConflict { id, .. } => OrderError::Conflict(id),
            StoreError::NotFound(id) => OrderError::NotFound(id),
            other => OrderError::Storage(other),
        }
    }
}

impl From<InventoryError> for OrderError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::InsufficientStock { product_id, requested, available } => {
                OrderError::InsufficientStock { product_id, requested, available }
            }
            InventoryError::ProductNotFound(id) => OrderError::ProductNotFound(id),
            InventoryError::StockOverflow(id) => {
                OrderError::Validation(format!("stock for product {id} would overflow"))
            }
            InventoryError::QuantityOverflow(id) => {
                OrderError::Validation(format!("combined quantity for product {id} is too large"))
            }
            InventoryError::Storage(store) => OrderError::Storage(store),
        }
    }
}

use uuid::Uuid;

use crate::store::StoreError;

// ============================================================================
// Inventory Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        requested: u32,
        available: u32,
    },

    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),

    #[error("Stock for product {0} would overflow")]
    StockOverflow(Uuid),

    #[error("Combined quantity for product {0} would overflow")]
    QuantityOverflow(Uuid),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

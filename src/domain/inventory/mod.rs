// ============================================================================
// Inventory Domain - Stock Ledger
// ============================================================================
//
// - Value objects (Product, StockDelta)
// - Errors (InventoryError)
// - Ledger contract (InventoryLedger) consumed by the order lifecycle
//
// ============================================================================

pub mod value_objects;
pub mod errors;
pub mod ledger;

pub use value_objects::*;
pub use errors::*;
pub use ledger::*;

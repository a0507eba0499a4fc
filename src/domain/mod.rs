// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// - order: the order aggregate and its lifecycle engine
// - inventory: products and the stock ledger orders draw from
// - catalog: product search over the inventory
//
// Persistence lives in crate::store; nothing here knows about ScyllaDB.
//
// ============================================================================

pub mod order;
pub mod inventory;
pub mod catalog;

// ============================================================================
// Catalog Domain - product search over the inventory's products
// ============================================================================

pub mod query;

pub use query::*;

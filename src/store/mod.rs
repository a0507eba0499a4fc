// ============================================================================
// Store Layer - Order snapshots, order history, product stock
// ============================================================================
//
// - order_store: OrderStore contract + StoreError
// - memory:      in-process implementations (tests, local runs)
// - scylla_store: ScyllaDB implementations
// - schema:      ScyllaDB keyspace/table bootstrap
//
// ============================================================================

mod order_store;
pub mod memory;
pub mod scylla_store;
pub mod schema;

pub use order_store::{OrderStore, StoreError};
pub use memory::{InMemoryInventory, InMemoryOrderStore};
pub use scylla_store::{ScyllaInventory, ScyllaOrderStore};

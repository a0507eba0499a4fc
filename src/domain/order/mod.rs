// ============================================================================
// Order Domain - Business Logic for the Order Aggregate
// ============================================================================
//
// - Value objects (OrderItem, Pricing, OrderStatus)
// - Events (OrderPlaced, OrderStatusAdvanced, OrderCancelled)
// - Commands (NewOrder, AdvanceStatus, CancelOrder)
// - Errors (OrderError enum)
// - Aggregate (Order with the transition rules)
// - Authorization (AuthorizationPolicy, OwnerOrAdmin)
// - Command Handler (OrderCommandHandler, the lifecycle engine)
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod commands;
pub mod errors;
pub mod aggregate;
pub mod authorization;
pub mod command_handler;

pub use value_objects::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
pub use authorization::*;
pub use command_handler::*;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::event_sourcing::DomainEvent;
use super::value_objects::{OrderItem, OrderStatus, PaymentInfo, Pricing, ShippingInfo};

// ============================================================================
// Order Events - Domain Events for Order Aggregate
// ============================================================================

/// Order Event - Union type for all order events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    Placed(OrderPlaced),
    StatusAdvanced(OrderStatusAdvanced),
    Cancelled(OrderCancelled),
}

impl OrderEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::Placed(_) => OrderPlaced::event_type(),
            OrderEvent::StatusAdvanced(_) => OrderStatusAdvanced::event_type(),
            OrderEvent::Cancelled(_) => OrderCancelled::event_type(),
        }
    }
}

impl DomainEvent for OrderEvent {
    fn event_type() -> &'static str { "OrderEvent" }
}

// ============================================================================
// Individual Event Types
// ============================================================================

/// Order Placed - Initial event in order lifecycle
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OrderPlaced {
    pub owner: Uuid,
    pub items: Vec<OrderItem>,
    pub shipping_info: ShippingInfo,
    pub payment_info: PaymentInfo,
    pub pricing: Pricing,
    pub status: OrderStatus,
    pub placed_at: DateTime<Utc>,
}

impl DomainEvent for OrderPlaced {
    fn event_type() -> &'static str { "OrderPlaced" }
    fn event_version() -> i32 { 1 }
}

/// Order Status Advanced - moved forward on the fulfillment path.
/// `commits_inventory` is set on the one transition that decrements stock.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OrderStatusAdvanced {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub commits_inventory: bool,
    pub advanced_at: DateTime<Utc>,
}

impl DomainEvent for OrderStatusAdvanced {
    fn event_type() -> &'static str { "OrderStatusAdvanced" }
    fn event_version() -> i32 { 1 }
}

/// Order Cancelled - lifecycle ended before delivery.
/// `restores_inventory` is set when committed stock is credited back.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OrderCancelled {
    pub from: OrderStatus,
    pub cancelled_by: Uuid,
    pub restores_inventory: bool,
    pub cancelled_at: DateTime<Utc>,
}

impl DomainEvent for OrderCancelled {
    fn event_type() -> &'static str { "OrderCancelled" }
    fn event_version() -> i32 { 1 }
}

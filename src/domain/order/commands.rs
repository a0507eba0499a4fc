use serde::Deserialize;
use uuid::Uuid;

use super::value_objects::{OrderItem, OrderStatus, PaymentInfo, Pricing, ShippingInfo};

// ============================================================================
// Order Commands - Represent user intent
// ============================================================================

/// Checkout payload. The owner comes from the verified caller, never the body.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub items: Vec<OrderItem>,
    pub shipping_info: ShippingInfo,
    #[serde(default)]
    pub payment_info: PaymentInfo,
    pub pricing: Pricing,
}

/// Commands against an order that already exists
#[derive(Debug, Clone)]
pub enum OrderCommand {
    AdvanceStatus {
        target: OrderStatus,
    },
    CancelOrder {
        cancelled_by: Uuid,
    },
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::inventory::{deltas_for_items, StockDirection};
use crate::event_sourcing::Aggregate;
use super::value_objects::{OrderItem, OrderStatus, PaymentInfo, Pricing, ShippingInfo};
use super::events::*;
use super::commands::{NewOrder, OrderCommand};
use super::errors::OrderError;

// ============================================================================
// Order Aggregate - Domain Logic
// ============================================================================

/// Status every checkout starts in
pub const INITIAL_STATUS: OrderStatus = OrderStatus::Processing;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    // Identity
    pub id: Uuid,
    pub version: i64,
    pub owner: Uuid,

    // Immutable checkout snapshot
    pub items: Vec<OrderItem>,
    pub shipping_info: ShippingInfo,
    pub payment_info: PaymentInfo,
    pub pricing: Pricing,

    // Lifecycle
    pub status: OrderStatus,
    /// Stock has been decremented for this order and not credited back
    pub inventory_committed: bool,

    // Audit Trail
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Validate a checkout and produce the event that creates the order.
    /// Stock is untouched here; it is committed on the first fulfillment stage.
    pub fn place(owner: Uuid, new_order: NewOrder) -> Result<OrderEvent, OrderError> {
        Self::validate_items(&new_order.items)?;
        Self::validate_pricing(&new_order.pricing)?;

        Ok(OrderEvent::Placed(OrderPlaced {
            owner,
            items: new_order.items,
            shipping_info: new_order.shipping_info,
            payment_info: new_order.payment_info,
            pricing: new_order.pricing,
            status: INITIAL_STATUS,
            placed_at: Utc::now(),
        }))
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner == user_id
    }

    fn validate_items(items: &[OrderItem]) -> Result<(), OrderError> {
        if items.is_empty() {
            return Err(OrderError::Validation("order must contain at least one item".to_string()));
        }

        for item in items {
            if item.quantity == 0 {
                return Err(OrderError::Validation(format!(
                    "quantity for product {} must be positive",
                    item.product_id
                )));
            }
            if item.unit_price < Decimal::ZERO {
                return Err(OrderError::Validation(format!(
                    "unit price for product {} cannot be negative",
                    item.product_id
                )));
            }
        }

        // Duplicate lines for one product must still sum to a representable quantity
        deltas_for_items(items, StockDirection::Decrement)?;

        Ok(())
    }

    fn validate_pricing(pricing: &Pricing) -> Result<(), OrderError> {
        if pricing.has_negative_component() {
            return Err(OrderError::Validation("prices cannot be negative".to_string()));
        }

        let Some(components_total) = pricing.components_total() else {
            return Err(OrderError::Validation("price components overflow".to_string()));
        };

        if components_total != pricing.total_price {
            return Err(OrderError::Validation(format!(
                "total price {} does not equal items {} + tax {} + shipping {}",
                pricing.total_price, pricing.items_price, pricing.tax_price, pricing.shipping_price
            )));
        }

        Ok(())
    }

    fn advance(&self, target: OrderStatus) -> Result<OrderEvent, OrderError> {
        let from = self.status;

        if from.is_terminal() {
            return Err(OrderError::InvalidTransition {
                from,
                to: target,
                reason: "order has reached a terminal status",
            });
        }
        if from == target {
            return Err(OrderError::AlreadyInState { status: from });
        }
        if target == OrderStatus::Cancelled {
            return Err(OrderError::InvalidTransition {
                from,
                to: target,
                reason: "orders are cancelled through cancellation, not a status update",
            });
        }
        if !target.is_forward_of(from) {
            return Err(OrderError::InvalidTransition {
                from,
                to: target,
                reason: "status can only move forward",
            });
        }

        // Idempotent by transition: only the first fulfillment stage commits stock
        let commits_inventory = target.is_fulfillment_stage() && !self.inventory_committed;

        Ok(OrderEvent::StatusAdvanced(OrderStatusAdvanced {
            from,
            to: target,
            commits_inventory,
            advanced_at: Utc::now(),
        }))
    }

    fn cancel(&self, cancelled_by: Uuid) -> Result<OrderEvent, OrderError> {
        match self.status {
            OrderStatus::Cancelled => Err(OrderError::AlreadyInState { status: OrderStatus::Cancelled }),
            OrderStatus::Delivered => Err(OrderError::InvalidTransition {
                from: OrderStatus::Delivered,
                to: OrderStatus::Cancelled,
                reason: "delivered orders cannot be cancelled",
            }),
            from => Ok(OrderEvent::Cancelled(OrderCancelled {
                from,
                cancelled_by,
                restores_inventory: self.inventory_committed,
                cancelled_at: Utc::now(),
            })),
        }
    }
}

// ============================================================================
// Aggregate Trait Implementation
// ============================================================================

impl Aggregate for Order {
    type Event = OrderEvent;
    type Command = OrderCommand;
    type Error = OrderError;

    fn apply_first_event(aggregate_id: Uuid, event: &Self::Event) -> Result<Self, Self::Error> {
        match event {
            OrderEvent::Placed(e) => Ok(Self {
                id: aggregate_id,
                version: 1,
                owner: e.owner,
                items: e.items.clone(),
                shipping_info: e.shipping_info.clone(),
                payment_info: e.payment_info.clone(),
                pricing: e.pricing,
                status: e.status,
                inventory_committed: false,
                created_at: e.placed_at,
                updated_at: e.placed_at,
                shipped_at: None,
                delivered_at: None,
                cancelled_at: None,
            }),
            _ => Err(OrderError::NotInitialized),
        }
    }

    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            OrderEvent::Placed(_) => return Err(OrderError::AlreadyPlaced(self.id)),
            OrderEvent::StatusAdvanced(e) => {
                self.status = e.to;
                if e.commits_inventory {
                    self.inventory_committed = true;
                }
                match e.to {
                    OrderStatus::Shipped => self.shipped_at = Some(e.advanced_at),
                    OrderStatus::Delivered => self.delivered_at = Some(e.advanced_at),
                    _ => {}
                }
                self.updated_at = e.advanced_at;
            }
            OrderEvent::Cancelled(e) => {
                self.status = OrderStatus::Cancelled;
                if e.restores_inventory {
                    self.inventory_committed = false;
                }
                self.cancelled_at = Some(e.cancelled_at);
                self.updated_at = e.cancelled_at;
            }
        }

        self.version += 1;
        Ok(())
    }

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let event = match command {
            OrderCommand::AdvanceStatus { target } => self.advance(*target)?,
            OrderCommand::CancelOrder { cancelled_by } => self.cancel(*cancelled_by)?,
        };

        Ok(vec![event])
    }

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

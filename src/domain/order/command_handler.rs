use std::sync::Arc;
use std::time::Instant;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::inventory::{deltas_for_items, revert, InventoryError, InventoryLedger, StockDelta, StockDirection};
use crate::event_sourcing::{Aggregate, EventEnvelope};
use crate::metrics::Metrics;
use crate::store::OrderStore;
use crate::utils::{retry_on_transient, KeyedMutex, RetryConfig};

use super::aggregate::Order;
use super::authorization::{AuthorizationPolicy, Caller, Decision, OrderAction, OwnerOrAdmin};
use super::commands::{NewOrder, OrderCommand};
use super::errors::OrderError;
use super::events::OrderEvent;
use super::value_objects::OrderStatus;

// ============================================================================
// Order Command Handler
// ============================================================================
//
// Orchestrates: Authorize → Aggregate → Events → Stock Batch → Order Store
//
// Mutations of one order hold that order's lock from load to write. Stock is
// moved before the write and moved back if the write is rejected.
//
// ============================================================================

/// Every order in the system plus the sum of their totals
#[derive(Debug, Clone, Serialize)]
pub struct OrderListing {
    pub orders: Vec<Order>,
    pub total_amount: Decimal,
}

pub struct OrderCommandHandler {
    orders: Arc<dyn OrderStore>,
    inventory: Arc<dyn InventoryLedger>,
    policy: Arc<dyn AuthorizationPolicy>,
    locks: KeyedMutex<Uuid>,
    metrics: Arc<Metrics>,
    read_retry: RetryConfig,
}

impl OrderCommandHandler {
    pub fn new(orders: Arc<dyn OrderStore>, inventory: Arc<dyn InventoryLedger>, metrics: Arc<Metrics>) -> Self {
        Self {
            orders,
            inventory,
            policy: Arc::new(OwnerOrAdmin),
            locks: KeyedMutex::new(),
            metrics,
            read_retry: RetryConfig::default(),
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn AuthorizationPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_read_retry(mut self, read_retry: RetryConfig) -> Self {
        self.read_retry = read_retry;
        self
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub async fn create_order(&self, owner: Uuid, new_order: NewOrder) -> Result<Order, OrderError> {
        let started = Instant::now();
        let result = self.place(owner, new_order).await;
        self.finish("create_order", started, result)
    }

    /// Admin only. Entering the first fulfillment stage commits stock.
    pub async fn advance_status(
        &self,
        order_id: Uuid,
        target: OrderStatus,
        caller: &Caller,
    ) -> Result<Order, OrderError> {
        let started = Instant::now();
        let result = self
            .transition(order_id, caller, OrderAction::AdvanceStatus, OrderCommand::AdvanceStatus { target })
            .await;
        self.finish("advance_status", started, result)
    }

    /// Owner or admin. Committed stock is credited back.
    pub async fn cancel_order(&self, order_id: Uuid, caller: &Caller) -> Result<Order, OrderError> {
        let started = Instant::now();
        let command = OrderCommand::CancelOrder { cancelled_by: caller.user_id };
        let result = self.transition(order_id, caller, OrderAction::Cancel, command).await;
        self.finish("cancel_order", started, result)
    }

    /// Admin only. Removes the order with no stock side effect.
    pub async fn delete_order(&self, order_id: Uuid, caller: &Caller) -> Result<(), OrderError> {
        let started = Instant::now();
        let result = self.remove(order_id, caller).await;
        self.finish("delete_order", started, result)
    }

    pub async fn get_order(&self, order_id: Uuid, caller: &Caller) -> Result<Order, OrderError> {
        let order = self.load(order_id).await?;
        self.authorize(caller, OrderAction::View, Some(&order))?;
        Ok(order)
    }

    pub async fn list_own_orders(&self, caller_id: Uuid) -> Result<Vec<Order>, OrderError> {
        let orders = &self.orders;
        let owned = retry_on_transient(&self.read_retry, move |_| orders.find_by_owner(caller_id))
            .await
            .into_result()?;
        Ok(owned)
    }

    pub async fn list_all_orders(&self, caller: &Caller) -> Result<OrderListing, OrderError> {
        self.authorize(caller, OrderAction::ListAll, None)?;

        let orders = &self.orders;
        let all = retry_on_transient(&self.read_retry, move |_| orders.find_all())
            .await
            .into_result()?;

        let total_amount = all
            .iter()
            .try_fold(Decimal::ZERO, |sum, order| sum.checked_add(order.pricing.total_price))
            .ok_or(OrderError::AmountOverflow)?;
        Ok(OrderListing { orders: all, total_amount })
    }

    pub async fn order_history(
        &self,
        order_id: Uuid,
        caller: &Caller,
    ) -> Result<Vec<EventEnvelope<OrderEvent>>, OrderError> {
        let order = self.load(order_id).await?;
        self.authorize(caller, OrderAction::View, Some(&order))?;

        let orders = &self.orders;
        let history = retry_on_transient(&self.read_retry, move |_| orders.history(order_id))
            .await
            .into_result()?;
        Ok(history)
    }

    async fn place(&self, owner: Uuid, new_order: NewOrder) -> Result<Order, OrderError> {
        let event = Order::place(owner, new_order)?;
        let order_id = Uuid::now_v7();
        let order = Order::apply_first_event(order_id, &event)?;

        let envelope = EventEnvelope::new(
            order_id,
            order.version,
            event.event_type().to_string(),
            event,
            Uuid::new_v4(),
        )
        .with_user(owner);

        self.orders.insert(&order, envelope).await?;
        self.metrics.orders_placed.inc();

        tracing::info!(
            order_id = %order.id,
            owner = %owner,
            items = order.items.len(),
            total = %order.pricing.total_price,
            "✅ Order placed"
        );

        Ok(order)
    }

    async fn transition(
        &self,
        order_id: Uuid,
        caller: &Caller,
        action: OrderAction,
        command: OrderCommand,
    ) -> Result<Order, OrderError> {
        if action.requires_privilege() {
            self.authorize(caller, action, None)?;
        }

        let _guard = self.locks.lock(&order_id).await;

        let current = self.load(order_id).await?;
        self.authorize(caller, action, Some(&current))?;

        let events = current.handle_command(&command)?;
        let mut next = current.clone();
        for event in &events {
            next.apply_event(event)?;
        }

        let deltas = stock_deltas(&current, &events)?;
        self.inventory.apply_batch(&deltas).await?;

        let correlation_id = Uuid::new_v4();
        let envelopes = events
            .into_iter()
            .zip(current.version + 1..)
            .map(|(event, sequence)| {
                EventEnvelope::new(order_id, sequence, event.event_type().to_string(), event, correlation_id)
                    .with_user(caller.user_id)
                    .with_metadata("role", caller.role.to_string())
            })
            .collect();

        if let Err(err) = self.orders.update(&next, current.version, envelopes).await {
            if !deltas.is_empty() {
                tracing::warn!(
                    order_id = %order_id,
                    error = %err,
                    deltas = deltas.len(),
                    "Order write failed after stock moved, reverting stock"
                );
                revert(self.inventory.as_ref(), &deltas).await;
                self.metrics.stock_rollbacks.inc();
            }
            return Err(err.into());
        }

        for delta in &deltas {
            self.metrics.record_stock_adjustment(delta.direction.as_str(), delta.quantity);
        }
        self.metrics.record_transition(current.status.as_str(), next.status.as_str());

        tracing::info!(
            order_id = %order_id,
            from = ?current.status,
            to = ?next.status,
            by = %caller.user_id,
            stock_deltas = deltas.len(),
            version = next.version,
            "✅ Order status changed"
        );

        Ok(next)
    }

    async fn remove(&self, order_id: Uuid, caller: &Caller) -> Result<(), OrderError> {
        self.authorize(caller, OrderAction::Delete, None)?;

        let _guard = self.locks.lock(&order_id).await;
        let order = self.load(order_id).await?;

        if order.inventory_committed && !order.status.is_terminal() {
            tracing::warn!(
                order_id = %order_id,
                status = %order.status,
                "Deleting an open order whose stock is committed"
            );
        }

        if !self.orders.delete(order_id).await? {
            return Err(OrderError::NotFound(order_id));
        }

        self.metrics.orders_deleted.inc();
        tracing::info!(order_id = %order_id, by = %caller.user_id, "🗑️ Order deleted");
        Ok(())
    }

    async fn load(&self, order_id: Uuid) -> Result<Order, OrderError> {
        let orders = &self.orders;
        retry_on_transient(&self.read_retry, move |_| orders.find_by_id(order_id))
            .await
            .into_result()?
            .ok_or(OrderError::NotFound(order_id))
    }

    fn authorize(&self, caller: &Caller, action: OrderAction, order: Option<&Order>) -> Result<(), OrderError> {
        match self.policy.decide(caller, action, order) {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => {
                tracing::warn!(
                    user_id = %caller.user_id,
                    role = %caller.role,
                    action = ?action,
                    order_id = ?order.map(|o| o.id),
                    reason,
                    "Authorization denied"
                );
                Err(OrderError::Forbidden(reason))
            }
        }
    }

    fn finish<T>(&self, operation: &str, started: Instant, result: Result<T, OrderError>) -> Result<T, OrderError> {
        self.metrics.observe_duration(operation, started.elapsed().as_secs_f64());
        if let Err(err) = &result {
            self.metrics.record_rejection(operation, err.code());
            tracing::debug!(operation, code = err.code(), error = %err, "Order operation rejected");
        }
        result
    }
}

/// Stock movements implied by a set of events applied to `order`
fn stock_deltas(order: &Order, events: &[OrderEvent]) -> Result<Vec<StockDelta>, InventoryError> {
    let mut deltas = Vec::new();

    for event in events {
        let direction = match event {
            OrderEvent::StatusAdvanced(e) if e.commits_inventory => StockDirection::Decrement,
            OrderEvent::Cancelled(e) if e.restores_inventory => StockDirection::Increment,
            _ => continue,
        };
        deltas.extend(deltas_for_items(&order.items, direction)?);
    }

    Ok(deltas)
}

// ============================================================================
// Unit Tests
// ============================================================================

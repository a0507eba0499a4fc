mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for the order lifecycle
// ============================================================================
//
// Covers:
// - Orders placed and deleted
// - Status transitions by source and target status
// - Rejected operations by reason code
// - Stock adjustments by direction, and rollbacks of applied adjustments
// - Operation latency
//
// Everything is registered on the struct's own registry and scraped via /metrics
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub orders_placed: IntCounter,
    pub orders_deleted: IntCounter,
    pub order_transitions: IntCounterVec,
    pub order_rejections: IntCounterVec,

    pub stock_adjustments: IntCounterVec,
    pub stock_rollbacks: IntCounter,

    pub operation_duration: HistogramVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_placed = IntCounter::new("orders_placed_total", "Total orders placed")?;
        registry.register(Box::new(orders_placed.clone()))?;

        let orders_deleted = IntCounter::new("orders_deleted_total", "Total orders deleted by admins")?;
        registry.register(Box::new(orders_deleted.clone()))?;

        let order_transitions = IntCounterVec::new(
            Opts::new("order_transitions_total", "Order status transitions"),
            &["from", "to"],
        )?;
        registry.register(Box::new(order_transitions.clone()))?;

        let order_rejections = IntCounterVec::new(
            Opts::new("order_rejections_total", "Order operations rejected before any change"),
            &["operation", "reason"],
        )?;
        registry.register(Box::new(order_rejections.clone()))?;

        // Counted in units, not in calls
        let stock_adjustments = IntCounterVec::new(
            Opts::new("stock_adjustments_total", "Stock units moved by order transitions"),
            &["direction"],
        )?;
        registry.register(Box::new(stock_adjustments.clone()))?;

        let stock_rollbacks = IntCounter::new(
            "stock_rollbacks_total",
            "Stock batches reverted because the order write failed",
        )?;
        registry.register(Box::new(stock_rollbacks.clone()))?;

        let operation_duration = HistogramVec::new(
            HistogramOpts::new("order_operation_duration_seconds", "Order operation duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        Ok(Self {
            registry,
            orders_placed,
            orders_deleted,
            order_transitions,
            order_rejections,
            stock_adjustments,
            stock_rollbacks,
            operation_duration,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_transition(&self, from: &str, to: &str) {
        self.order_transitions.with_label_values(&[from, to]).inc();
    }

    pub fn record_rejection(&self, operation: &str, reason: &str) {
        self.order_rejections.with_label_values(&[operation, reason]).inc();
    }

    pub fn record_stock_adjustment(&self, direction: &str, quantity: u32) {
        self.stock_adjustments
            .with_label_values(&[direction])
            .inc_by(u64::from(quantity));
    }

    pub fn observe_duration(&self, operation: &str, duration_secs: f64) {
        self.operation_duration.with_label_values(&[operation]).observe(duration_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter_value(metrics: &Metrics, name: &str) -> Vec<f64> {
        metrics
            .registry
            .gather()
            .iter()
            .find(|family| family.name() == name)
            .map(|family| family.metric.iter().filter_map(|m| m.counter.value).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.orders_placed.inc();
        assert_eq!(counter_value(&metrics, "orders_placed_total"), vec![1.0]);
    }

    #[test]
    fn test_stock_adjustments_count_units() {
        let metrics = Metrics::new().unwrap();
        metrics.record_stock_adjustment("decrement", 3);
        metrics.record_stock_adjustment("decrement", 4);

        assert_eq!(counter_value(&metrics, "stock_adjustments_total"), vec![7.0]);
    }

    #[test]
    fn test_rejections_are_labelled_by_reason() {
        let metrics = Metrics::new().unwrap();
        metrics.record_rejection("advance_status", "INSUFFICIENT_STOCK");
        metrics.record_rejection("advance_status", "INVALID_TRANSITION");
        metrics.record_rejection("cancel_order", "FORBIDDEN");

        let gathered = metrics.registry.gather();
        let rejections = gathered.iter().find(|m| m.name() == "order_rejections_total").unwrap();
        assert_eq!(rejections.metric.len(), 3);
    }

    #[test]
    fn test_metrics_are_isolated_per_instance() {
        let first = Metrics::new().unwrap();
        let second = Metrics::new().unwrap();
        first.record_transition("processing", "shipped");

        assert_eq!(counter_value(&first, "order_transitions_total"), vec![1.0]);
        assert!(counter_value(&second, "order_transitions_total").is_empty());
    }
}

use async_trait::async_trait;
use uuid::Uuid;

use super::errors::InventoryError;
use super::value_objects::{StockDelta, StockDirection};

// ============================================================================
// Inventory Ledger - stock counts shared by every order
// ============================================================================
//
// Every single-product adjustment must be atomic at the storage layer.
// Batches are all-or-nothing: either every delta lands or none does.
//
// ============================================================================

#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Current stock of a product
    async fn stock(&self, product_id: Uuid) -> Result<u32, InventoryError>;

    /// Atomically subtract `quantity`, never going below zero. Returns the new stock.
    async fn decrement(&self, product_id: Uuid, quantity: u32) -> Result<u32, InventoryError>;

    /// Atomically add `quantity` back. Returns the new stock.
    async fn increment(&self, product_id: Uuid, quantity: u32) -> Result<u32, InventoryError>;

    async fn apply(&self, delta: &StockDelta) -> Result<u32, InventoryError> {
        match delta.direction {
            StockDirection::Decrement => self.decrement(delta.product_id, delta.quantity).await,
            StockDirection::Increment => self.increment(delta.product_id, delta.quantity).await,
        }
    }

    /// Apply every delta or none of them.
    ///
    /// Deltas are applied one atomic step at a time. When one fails, the ones
    /// already applied are reversed newest-first and the failure is returned.
    async fn apply_batch(&self, deltas: &[StockDelta]) -> Result<(), InventoryError> {
        let mut applied: Vec<StockDelta> = Vec::with_capacity(deltas.len());

        for delta in deltas {
            match self.apply(delta).await {
                Ok(remaining) => {
                    tracing::debug!(
                        product_id = %delta.product_id,
                        quantity = delta.quantity,
                        direction = delta.direction.as_str(),
                        remaining,
                        "Stock adjusted"
                    );
                    applied.push(*delta);
                }
                Err(err) => {
                    tracing::warn!(
                        product_id = %delta.product_id,
                        error = %err,
                        applied = applied.len(),
                        "Stock batch failed, reverting applied deltas"
                    );
                    revert(self, &applied).await;
                    return Err(err);
                }
            }
        }

        Ok(())
    }
}

/// Undo applied deltas newest-first. A failed undo cannot be recovered here,
/// so it is logged loudly for an operator to reconcile.
pub async fn revert<L>(ledger: &L, applied: &[StockDelta])
where
    L: InventoryLedger + ?Sized,
{
    for delta in applied.iter().rev() {
        let inverse = delta.inverse();
        if let Err(err) = ledger.apply(&inverse).await {
            tracing::error!(
                product_id = %inverse.product_id,
                quantity = inverse.quantity,
                direction = inverse.direction.as_str(),
                error = %err,
                "❌ Failed to revert stock delta, manual reconciliation required"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Only per-product operations, so the default batch path is exercised
    struct StepwiseLedger {
        stock: Mutex<HashMap<Uuid, u32>>,
    }

    impl StepwiseLedger {
        fn with(entries: &[(Uuid, u32)]) -> Self {
            Self { stock: Mutex::new(entries.iter().copied().collect()) }
        }

        fn get(&self, id: Uuid) -> u32 {
            self.stock.lock().unwrap()[&id]
        }
    }

    #[async_trait]
    impl InventoryLedger for StepwiseLedger {
        async fn stock(&self, product_id: Uuid) -> Result<u32, InventoryError> {
            self.stock
                .lock()
                .unwrap()
                .get(&product_id)
                .copied()
                .ok_or(InventoryError::ProductNotFound(product_id))
        }

        async fn decrement(&self, product_id: Uuid, quantity: u32) -> Result<u32, InventoryError> {
            let mut stock = self.stock.lock().unwrap();
            let current = stock.get_mut(&product_id).ok_or(InventoryError::ProductNotFound(product_id))?;
            if *current < quantity {
                return Err(InventoryError::InsufficientStock {
                    product_id,
                    requested: quantity,
                    available: *current,
                });
            }
            *current -= quantity;
            Ok(*current)
        }

        async fn increment(&self, product_id: Uuid, quantity: u32) -> Result<u32, InventoryError> {
            let mut stock = self.stock.lock().unwrap();
            let current = stock.get_mut(&product_id).ok_or(InventoryError::ProductNotFound(product_id))?;
            *current += quantity;
            Ok(*current)
        }
    }

    #[tokio::test]
    async fn test_batch_applies_all_deltas() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let ledger = StepwiseLedger::with(&[(a, 10), (b, 5)]);

        ledger
            .apply_batch(&[StockDelta::decrement(a, 3), StockDelta::decrement(b, 5)])
            .await
            .unwrap();

        assert_eq!(ledger.get(a), 7);
        assert_eq!(ledger.get(b), 0);
    }

    #[tokio::test]
    async fn test_failed_batch_reverts_earlier_deltas() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let ledger = StepwiseLedger::with(&[(a, 10), (b, 4), (c, 1)]);

        let result = ledger
            .apply_batch(&[
                StockDelta::decrement(a, 3),
                StockDelta::decrement(b, 4),
                StockDelta::decrement(c, 2),
            ])
            .await;

        assert!(matches!(
            result,
            Err(InventoryError::InsufficientStock { requested: 2, available: 1, .. })
        ));
        assert_eq!(ledger.get(a), 10);
        assert_eq!(ledger.get(b), 4);
        assert_eq!(ledger.get(c), 1);
    }

    #[tokio::test]
    async fn test_missing_product_fails_batch() {
        let a = Uuid::new_v4();
        let missing = Uuid::new_v4();
        let ledger = StepwiseLedger::with(&[(a, 2)]);

        let result = ledger
            .apply_batch(&[StockDelta::increment(a, 1), StockDelta::increment(missing, 1)])
            .await;

        assert!(matches!(result, Err(InventoryError::ProductNotFound(id)) if id == missing));
        assert_eq!(ledger.get(a), 2);
    }
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::order::OrderItem;
use super::errors::InventoryError;

// ============================================================================
// Inventory Value Objects
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub stock: u32,
}

impl Product {
    pub fn new(name: impl Into<String>, category: impl Into<String>, price: Decimal, stock: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            category: category.into(),
            price,
            stock,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockDirection {
    Decrement,
    Increment,
}

impl StockDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            StockDirection::Decrement => "decrement",
            StockDirection::Increment => "increment",
        }
    }
}

/// A single signed stock adjustment for one product
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDelta {
    pub product_id: Uuid,
    pub quantity: u32,
    pub direction: StockDirection,
}

impl StockDelta {
    pub fn decrement(product_id: Uuid, quantity: u32) -> Self {
        Self { product_id, quantity, direction: StockDirection::Decrement }
    }

    pub fn increment(product_id: Uuid, quantity: u32) -> Self {
        Self { product_id, quantity, direction: StockDirection::Increment }
    }

    pub fn inverse(&self) -> Self {
        let direction = match self.direction {
            StockDirection::Decrement => StockDirection::Increment,
            StockDirection::Increment => StockDirection::Decrement,
        };
        Self { direction, ..*self }
    }

    /// Stock level after this delta, or why it cannot be applied
    pub fn apply_to(&self, current: u32) -> Result<u32, InventoryError> {
        match self.direction {
            StockDirection::Decrement => current.checked_sub(self.quantity).ok_or(
                InventoryError::InsufficientStock {
                    product_id: self.product_id,
                    requested: self.quantity,
                    available: current,
                },
            ),
            StockDirection::Increment => current
                .checked_add(self.quantity)
                .ok_or(InventoryError::StockOverflow(self.product_id)),
        }
    }
}

/// Compute one delta per product for a set of order lines.
///
/// Lines for the same product are merged so each product is touched exactly
/// once per batch; products keep the order of their first appearance.
pub fn deltas_for_items(items: &[OrderItem], direction: StockDirection) -> Result<Vec<StockDelta>, InventoryError> {
    let mut deltas: Vec<StockDelta> = Vec::with_capacity(items.len());

    for item in items {
        match deltas.iter_mut().find(|delta| delta.product_id == item.product_id) {
            Some(delta) => {
                delta.quantity = delta
                    .quantity
                    .checked_add(item.quantity)
                    .ok_or(InventoryError::QuantityOverflow(item.product_id))?;
            }
            None => deltas.push(StockDelta {
                product_id: item.product_id,
                quantity: item.quantity,
                direction,
            }),
        }
    }

    Ok(deltas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(product_id: Uuid, quantity: u32) -> OrderItem {
        OrderItem {
            product_id,
            name: "Tea towel".to_string(),
            quantity,
            unit_price: dec!(4.50),
        }
    }

    #[test]
    fn test_duplicate_lines_are_merged() {
        let towel = Uuid::new_v4();
        let mug = Uuid::new_v4();

        let deltas = deltas_for_items(
            &[line(towel, 2), line(mug, 1), line(towel, 3)],
            StockDirection::Decrement,
        )
        .unwrap();

        assert_eq!(deltas, vec![StockDelta::decrement(towel, 5), StockDelta::decrement(mug, 1)]);
    }

    #[test]
    fn test_merged_quantity_overflow_is_rejected() {
        let towel = Uuid::new_v4();

        let result = deltas_for_items(&[line(towel, u32::MAX), line(towel, 1)], StockDirection::Increment);

        assert!(matches!(result, Err(InventoryError::QuantityOverflow(id)) if id == towel));
    }

    #[test]
    fn test_inverse_flips_direction_only() {
        let delta = StockDelta::decrement(Uuid::new_v4(), 7);
        let inverse = delta.inverse();

        assert_eq!(inverse.direction, StockDirection::Increment);
        assert_eq!(inverse.quantity, 7);
        assert_eq!(inverse.product_id, delta.product_id);
        assert_eq!(inverse.inverse(), delta);
    }

    #[test]
    fn test_apply_to_guards_bounds() {
        let id = Uuid::new_v4();
        assert_eq!(StockDelta::decrement(id, 3).apply_to(10).unwrap(), 7);
        assert!(matches!(
            StockDelta::decrement(id, 3).apply_to(2),
            Err(InventoryError::InsufficientStock { requested: 3, available: 2, .. })
        ));
        assert!(matches!(StockDelta::increment(id, 1).apply_to(u32::MAX), Err(InventoryError::StockOverflow(_))));
    }
}

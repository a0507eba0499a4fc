use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Order Value Objects
// ============================================================================

/// One purchased line. Immutable once the order is placed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderItem {
    pub product_id: Uuid,
    #[serde(default)]
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// Address snapshot captured when the order is placed
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ShippingInfo {
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
    pub phone: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Cash on delivery, nothing collected yet
    #[default]
    Pending,
    Succeeded,
    Failed,
}

/// Informational only, never reconciled against a gateway
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PaymentInfo {
    #[serde(default)]
    pub reference_id: Option<String>,
    #[serde(default)]
    pub status: PaymentStatus,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Pricing {
    pub items_price: Decimal,
    pub tax_price: Decimal,
    pub shipping_price: Decimal,
    pub total_price: Decimal,
}

impl Pricing {
    /// `None` when the components do not fit in a `Decimal`
    pub fn components_total(&self) -> Option<Decimal> {
        self.items_price
            .checked_add(self.tax_price)?
            .checked_add(self.shipping_price)
    }

    pub fn has_negative_component(&self) -> bool {
        [self.items_price, self.tax_price, self.shipping_price, self.total_price]
            .iter()
            .any(|price| *price < Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Position on the forward fulfillment path. Cancelled is off the path.
    fn stage(self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Processing => Some(1),
            OrderStatus::Shipped => Some(2),
            OrderStatus::Delivered => Some(3),
            OrderStatus::Cancelled => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Stages at which goods leave the warehouse and stock is committed
    pub fn is_fulfillment_stage(self) -> bool {
        matches!(self, OrderStatus::Shipped | OrderStatus::Delivered)
    }

    /// True when `self` lies strictly after `from` on the fulfillment path
    pub fn is_forward_of(self, from: OrderStatus) -> bool {
        match (from.stage(), self.stage()) {
            (Some(from), Some(to)) => to > from,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown order status: {s}"))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_pricing_consistency() {
        let pricing = Pricing {
            items_price: dec!(100.00),
            tax_price: dec!(18.00),
            shipping_price: dec!(0),
            total_price: dec!(118.00),
        };
        assert_eq!(pricing.components_total(), Some(pricing.total_price));
        assert!(!pricing.has_negative_component());

        let skewed = Pricing { total_price: dec!(117.99), ..pricing };
        assert_ne!(skewed.components_total(), Some(skewed.total_price));

        let negative = Pricing { tax_price: dec!(-1), total_price: dec!(99), ..pricing };
        assert!(negative.has_negative_component());
    }

    #[test]
    fn test_components_total_overflow_is_none() {
        let pricing = Pricing {
            items_price: Decimal::MAX,
            tax_price: dec!(1),
            shipping_price: dec!(0),
            total_price: Decimal::MAX,
        };

        assert_eq!(pricing.components_total(), None);
    }

    #[test]
    fn test_forward_ordering() {
        assert!(OrderStatus::Processing.is_forward_of(OrderStatus::Pending));
        assert!(OrderStatus::Delivered.is_forward_of(OrderStatus::Processing));
        assert!(!OrderStatus::Processing.is_forward_of(OrderStatus::Shipped));
        assert!(!OrderStatus::Shipped.is_forward_of(OrderStatus::Shipped));
        assert!(!OrderStatus::Cancelled.is_forward_of(OrderStatus::Processing));
        assert!(!OrderStatus::Delivered.is_forward_of(OrderStatus::Cancelled));
    }

    #[test]
    fn test_terminal_and_fulfillment_stages() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Shipped.is_terminal());

        assert!(OrderStatus::Shipped.is_fulfillment_stage());
        assert!(OrderStatus::Delivered.is_fulfillment_stage());
        assert!(!OrderStatus::Processing.is_fulfillment_stage());
    }

    #[test]
    fn test_status_parsing_is_case_insensitive() {
        assert_eq!("shipped".parse::<OrderStatus>(), Ok(OrderStatus::Shipped));
        assert_eq!("DELIVERED".parse::<OrderStatus>(), Ok(OrderStatus::Delivered));
        assert!("lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_payment_info_defaults_to_pending() {
        let info: PaymentInfo = serde_json::from_str("{}").unwrap();
        assert_eq!(info.status, PaymentStatus::Pending);
        assert!(info.reference_id.is_none());
    }
}

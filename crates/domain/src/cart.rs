//! Cart snapshots and derived totals.

use common::{Money, ProductId, UserId};
use serde::{Deserialize, Serialize};

/// A single product line in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,

    /// Display name resolved from the catalog at read time.
    pub name: String,

    /// Current catalog price per unit.
    pub unit_price: Money,

    pub quantity: u32,
}

impl CartLine {
    /// Creates a new cart line.
    pub fn new(
        product_id: ProductId,
        name: impl Into<String>,
        unit_price: Money,
        quantity: u32,
    ) -> Self {
        Self {
            product_id,
            name: name.into(),
            unit_price,
            quantity,
        }
    }

    /// Returns the total price for this line (quantity * unit_price).
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A point-in-time view of one user's cart.
///
/// Line prices are the catalog prices at the moment the snapshot was
/// read; they are frozen onto order lines only at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub user_id: UserId,
    pub lines: Vec<CartLine>,
}

impl CartSnapshot {
    /// Creates a snapshot from already-resolved lines.
    pub fn new(user_id: UserId, lines: Vec<CartLine>) -> Self {
        Self { user_id, lines }
    }

    /// Returns an empty snapshot for the given user.
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            lines: Vec::new(),
        }
    }

    /// Returns true if the cart holds no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Computes the unit count and total price across all lines.
    pub fn totals(&self) -> CartTotals {
        CartTotals {
            item_count: self.lines.iter().map(|line| line.quantity).sum(),
            total_price: self.lines.iter().map(CartLine::line_total).sum(),
        }
    }
}

/// Aggregated cart figures served alongside the lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    /// Total units across all lines.
    pub item_count: u32,

    pub total_price: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str, unit_cents: i64, quantity: u32) -> CartLine {
        CartLine::new(ProductId::new(), name, Money::from_cents(unit_cents), quantity)
    }

    #[test]
    fn test_line_total_multiplies_by_quantity() {
        assert_eq!(line("Widget", 1000, 3).line_total().cents(), 3000);
    }

    #[test]
    fn test_totals_sum_lines() {
        // Two units of a $10.00 product plus one unit of a $5.00 product.
        let snapshot = CartSnapshot::new(
            UserId::new(),
            vec![line("Product A", 10_00, 2), line("Product B", 5_00, 1)],
        );

        let totals = snapshot.totals();
        assert_eq!(totals.item_count, 3);
        assert_eq!(totals.total_price, Money::from_cents(25_00));
    }

    #[test]
    fn test_empty_snapshot_has_zero_totals() {
        let snapshot = CartSnapshot::empty(UserId::new());
        assert!(snapshot.is_empty());

        let totals = snapshot.totals();
        assert_eq!(totals.item_count, 0);
        assert!(totals.total_price.is_zero());
    }

    #[test]
    fn test_snapshot_with_lines_is_not_empty() {
        let snapshot = CartSnapshot::new(UserId::new(), vec![line("Widget", 100, 1)]);
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn test_snapshot_serialization_roundtrip() {
        let snapshot = CartSnapshot::new(UserId::new(), vec![line("Widget", 999, 2)]);
        let json = serde_json::to_string(&snapshot).unwrap();
        let deserialized: CartSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snapshot, deserialized);
    }
}

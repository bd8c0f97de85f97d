//! Orders and their status lifecycle.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The state of a placed order.
///
/// Orders are inserted as `Pending` inside the checkout transaction and
/// flipped to `Paid` once the gateway approves the charge. A declined or
/// failed payment rolls the whole transaction back, so failed attempts
/// never surface here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order row exists but payment has not been confirmed.
    #[default]
    Pending,

    /// Payment was approved; the order is final.
    Paid,
}

impl OrderStatus {
    /// Returns true once payment has been confirmed.
    pub fn is_paid(&self) -> bool {
        matches!(self, OrderStatus::Paid)
    }

    /// Returns the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
        }
    }

    /// Parses a stored status name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "paid" => Some(OrderStatus::Paid),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A placed order row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total: Money,

    /// Idempotency key passed to the payment gateway for this attempt.
    pub payment_key: Uuid,

    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Creates a pending order for the given user and total.
    pub fn new(user_id: UserId, total: Money, payment_key: Uuid) -> Self {
        Self {
            id: OrderId::new(),
            user_id,
            status: OrderStatus::Pending,
            total,
            payment_key,
            created_at: Utc::now(),
        }
    }
}

/// A single product line on a placed order.
///
/// `unit_price` is frozen at checkout time; `name` and `description`
/// are joined from the live catalog when history is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub description: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl OrderLine {
    /// Creates a new order line.
    pub fn new(
        product_id: ProductId,
        name: impl Into<String>,
        description: impl Into<String>,
        unit_price: Money,
        quantity: u32,
    ) -> Self {
        Self {
            product_id,
            name: name.into(),
            description: description.into(),
            unit_price,
            quantity,
        }
    }

    /// Returns the total price for this line (quantity * unit_price).
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// An order with its lines, as served by the history endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub id: OrderId,
    pub status: OrderStatus,
    pub total: Money,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_is_paid() {
        assert!(!OrderStatus::Pending.is_paid());
        assert!(OrderStatus::Paid.is_paid());
    }

    #[test]
    fn test_status_as_str_parse_roundtrip() {
        for status in [OrderStatus::Pending, OrderStatus::Paid] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("shipped"), None);
        assert_eq!(OrderStatus::parse("Paid"), None);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(OrderStatus::Pending.to_string(), "pending");
        assert_eq!(OrderStatus::Paid.to_string(), "paid");
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&OrderStatus::Paid).unwrap(), "\"paid\"");
        let parsed: OrderStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(parsed, OrderStatus::Pending);
    }

    #[test]
    fn test_new_order_starts_pending() {
        let user = UserId::new();
        let key = Uuid::new_v4();
        let order = Order::new(user, Money::from_cents(25_00), key);

        assert_eq!(order.user_id, user);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total.cents(), 25_00);
        assert_eq!(order.payment_key, key);
    }

    #[test]
    fn test_order_line_total() {
        let order_line = OrderLine::new(
            ProductId::new(),
            "Widget",
            "A fine widget",
            Money::from_cents(999),
            2,
        );
        assert_eq!(order_line.line_total().cents(), 1998);
    }

    #[test]
    fn test_placed_order_serialization_roundtrip() {
        let placed = PlacedOrder {
            id: OrderId::new(),
            status: OrderStatus::Paid,
            total: Money::from_cents(25_00),
            created_at: Utc::now(),
            lines: vec![OrderLine::new(
                ProductId::new(),
                "Widget",
                "A fine widget",
                Money::from_cents(10_00),
                2,
            )],
        };
        let json = serde_json::to_string(&placed).unwrap();
        let deserialized: PlacedOrder = serde_json::from_str(&json).unwrap();
        assert_eq!(placed, deserialized);
    }
}

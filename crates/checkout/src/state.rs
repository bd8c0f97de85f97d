//! Checkout state machine.

use serde::{Deserialize, Serialize};

/// The state of a checkout as it moves through its transaction.
///
/// State transitions:
/// ```text
/// Initiated ──► Snapshotted ──► OrderCreated ──► LinesWritten
///     │              │               │               │
///     ▼              ▼               ▼               ▼
///   Failed ◄──────────────────────────────── PaymentAttempted ──► Paid
/// ```
///
/// Every non-`Paid` exit rolls the transaction back, so no intermediate
/// state is ever durable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CheckoutState {
    /// Checkout requested, nothing read or written yet.
    #[default]
    Initiated,

    /// The cart snapshot was taken under the per-user lock.
    Snapshotted,

    /// The pending order row exists inside the open transaction.
    OrderCreated,

    /// All order lines are written inside the open transaction.
    LinesWritten,

    /// The payment gateway has been asked for a verdict.
    PaymentAttempted,

    /// Payment approved and the transaction committed (terminal state).
    Paid,

    /// Checkout failed and the transaction rolled back (terminal state).
    Failed,
}

impl CheckoutState {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutState::Paid | CheckoutState::Failed)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::Initiated => "Initiated",
            CheckoutState::Snapshotted => "Snapshotted",
            CheckoutState::OrderCreated => "OrderCreated",
            CheckoutState::LinesWritten => "LinesWritten",
            CheckoutState::PaymentAttempted => "PaymentAttempted",
            CheckoutState::Paid => "Paid",
            CheckoutState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_initiated() {
        assert_eq!(CheckoutState::default(), CheckoutState::Initiated);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!CheckoutState::Initiated.is_terminal());
        assert!(!CheckoutState::Snapshotted.is_terminal());
        assert!(!CheckoutState::OrderCreated.is_terminal());
        assert!(!CheckoutState::LinesWritten.is_terminal());
        assert!(!CheckoutState::PaymentAttempted.is_terminal());
        assert!(CheckoutState::Paid.is_terminal());
        assert!(CheckoutState::Failed.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(CheckoutState::Initiated.to_string(), "Initiated");
        assert_eq!(CheckoutState::Snapshotted.to_string(), "Snapshotted");
        assert_eq!(CheckoutState::OrderCreated.to_string(), "OrderCreated");
        assert_eq!(CheckoutState::LinesWritten.to_string(), "LinesWritten");
        assert_eq!(
            CheckoutState::PaymentAttempted.to_string(),
            "PaymentAttempted"
        );
        assert_eq!(CheckoutState::Paid.to_string(), "Paid");
        assert_eq!(CheckoutState::Failed.to_string(), "Failed");
    }

    #[test]
    fn test_serialization() {
        let state = CheckoutState::PaymentAttempted;
        let json = serde_json::to_string(&state).unwrap();
        let deserialized: CheckoutState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, deserialized);
    }
}

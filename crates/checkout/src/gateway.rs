//! Payment gateway trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::Money;
use thiserror::Error;
use uuid::Uuid;

/// The gateway's answer to a charge request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentVerdict {
    /// The charge went through; `reference` is the gateway's receipt id.
    Approved { reference: String },

    /// The gateway refused the charge.
    Declined { reason: String },
}

/// Errors from the payment gateway itself, as opposed to a decline.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The gateway could not be reached or errored out.
    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),

    /// No verdict arrived within the configured deadline.
    #[error("payment gateway gave no verdict within {0:?}")]
    Timeout(Duration),
}

/// Trait for charging payments during checkout.
///
/// `charge` is called while the checkout transaction is open, so it must
/// have no side effect that needs compensation when the verdict is not
/// approved: checkout rolls back on any non-approved outcome and never
/// issues a refund. The `idempotency_key` is fresh per checkout attempt
/// and lets the gateway deduplicate retries of the same attempt.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Requests a charge of `amount`, identified by `idempotency_key`.
    async fn charge(
        &self,
        amount: Money,
        idempotency_key: Uuid,
    ) -> Result<PaymentVerdict, PaymentError>;
}

#[derive(Debug, Default)]
struct GatewayState {
    verdicts: HashMap<Uuid, PaymentVerdict>,
    next_reference: u32,
    calls: usize,
    last_key: Option<Uuid>,
    decline_all: bool,
    fail_on_charge: bool,
    delay: Option<Duration>,
}

/// In-memory payment gateway for testing.
///
/// Approves any positive amount by default and records one verdict per
/// idempotency key, so a replayed key gets the recorded verdict back.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<GatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to decline every charge.
    pub fn set_decline_all(&self, decline: bool) {
        self.state.write().unwrap().decline_all = decline;
    }

    /// Configures the gateway to fail charge calls outright.
    pub fn set_fail_on_charge(&self, fail: bool) {
        self.state.write().unwrap().fail_on_charge = fail;
    }

    /// Makes every charge wait for `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        self.state.write().unwrap().delay = Some(delay);
    }

    /// Number of charge calls that reached a verdict or a failure.
    pub fn charge_count(&self) -> usize {
        self.state.read().unwrap().calls
    }

    /// The idempotency key of the most recent charge call.
    pub fn last_key(&self) -> Option<Uuid> {
        self.state.read().unwrap().last_key
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn charge(
        &self,
        amount: Money,
        idempotency_key: Uuid,
    ) -> Result<PaymentVerdict, PaymentError> {
        let delay = self.state.read().unwrap().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.write().unwrap();
        state.calls += 1;
        state.last_key = Some(idempotency_key);

        if state.fail_on_charge {
            return Err(PaymentError::Unavailable("gateway offline".to_string()));
        }

        if let Some(verdict) = state.verdicts.get(&idempotency_key) {
            return Ok(verdict.clone());
        }

        let verdict = if state.decline_all {
            PaymentVerdict::Declined {
                reason: "card declined".to_string(),
            }
        } else if amount.cents() <= 0 {
            PaymentVerdict::Declined {
                reason: "amount must be positive".to_string(),
            }
        } else {
            state.next_reference += 1;
            PaymentVerdict::Approved {
                reference: format!("PAY-{:04}", state.next_reference),
            }
        };

        state.verdicts.insert(idempotency_key, verdict.clone());
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_charge_approves_positive_amount() {
        let gateway = InMemoryPaymentGateway::new();

        let verdict = gateway
            .charge(Money::from_cents(25_00), Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(
            verdict,
            PaymentVerdict::Approved {
                reference: "PAY-0001".to_string()
            }
        );
        assert_eq!(gateway.charge_count(), 1);
    }

    #[tokio::test]
    async fn test_zero_amount_declined() {
        let gateway = InMemoryPaymentGateway::new();

        let verdict = gateway
            .charge(Money::from_cents(0), Uuid::new_v4())
            .await
            .unwrap();

        assert!(matches!(verdict, PaymentVerdict::Declined { .. }));
    }

    #[tokio::test]
    async fn test_decline_all() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_decline_all(true);

        let verdict = gateway
            .charge(Money::from_cents(10_00), Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(
            verdict,
            PaymentVerdict::Declined {
                reason: "card declined".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_fail_on_charge() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_fail_on_charge(true);

        let result = gateway
            .charge(Money::from_cents(10_00), Uuid::new_v4())
            .await;

        assert!(matches!(result, Err(PaymentError::Unavailable(_))));
        assert_eq!(gateway.charge_count(), 1);
    }

    #[tokio::test]
    async fn test_sequential_references() {
        let gateway = InMemoryPaymentGateway::new();

        let v1 = gateway
            .charge(Money::from_cents(10_00), Uuid::new_v4())
            .await
            .unwrap();
        let v2 = gateway
            .charge(Money::from_cents(10_00), Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(
            v1,
            PaymentVerdict::Approved {
                reference: "PAY-0001".to_string()
            }
        );
        assert_eq!(
            v2,
            PaymentVerdict::Approved {
                reference: "PAY-0002".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_replayed_key_returns_recorded_verdict() {
        let gateway = InMemoryPaymentGateway::new();
        let key = Uuid::new_v4();

        let first = gateway.charge(Money::from_cents(10_00), key).await.unwrap();
        let replay = gateway.charge(Money::from_cents(10_00), key).await.unwrap();

        assert_eq!(first, replay);
        assert_eq!(gateway.charge_count(), 2);
        assert_eq!(gateway.last_key(), Some(key));
    }
}

//! Checkout orchestrator driving the cart-to-order transaction.

use std::time::Duration;

use common::{Money, OrderId, UserId};
use domain::CartLine;
use serde::Serialize;
use store::{CheckoutTx, Store};
use uuid::Uuid;

use crate::error::CheckoutError;
use crate::gateway::{PaymentError, PaymentGateway, PaymentVerdict};
use crate::state::CheckoutState;

/// Tunables for a checkout run.
#[derive(Debug, Clone)]
pub struct CheckoutPolicy {
    /// Longest the open transaction waits for a payment verdict.
    pub payment_timeout: Duration,
}

impl Default for CheckoutPolicy {
    fn default() -> Self {
        Self {
            payment_timeout: Duration::from_millis(5_000),
        }
    }
}

/// What a successful checkout hands back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    pub state: CheckoutState,
    pub total: Money,
    pub item_count: u32,
    pub lines: Vec<CartLine>,
}

/// Converts a cart into a paid order, all-or-nothing.
///
/// The whole run happens inside one store transaction: the cart snapshot
/// is taken under a per-user lock, the pending order and its lines are
/// written, the gateway is charged while the transaction is still open,
/// and only an approved verdict leads to mark-paid, cart-clear, and
/// commit. Every other outcome rolls back, so a failed checkout is
/// indistinguishable from one that never started.
pub struct CheckoutOrchestrator<S, P>
where
    S: Store,
    P: PaymentGateway,
{
    store: S,
    gateway: P,
    policy: CheckoutPolicy,
}

impl<S, P> CheckoutOrchestrator<S, P>
where
    S: Store,
    P: PaymentGateway,
{
    /// Creates a new orchestrator.
    pub fn new(store: S, gateway: P, policy: CheckoutPolicy) -> Self {
        Self {
            store,
            gateway,
            policy,
        }
    }

    /// Runs a checkout for the given user.
    #[tracing::instrument(skip(self))]
    pub async fn checkout(&self, user_id: UserId) -> Result<CheckoutReceipt, CheckoutError> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let started = std::time::Instant::now();
        let mut state = CheckoutState::Initiated;

        // 1. Fail fast on an empty cart, before any transaction opens.
        let preview = self
            .store
            .cart_snapshot(user_id)
            .await
            .map_err(|e| self.failed(state, CheckoutError::CartRead(e), started))?;
        if preview.is_empty() {
            return Err(self.failed(state, CheckoutError::EmptyCart, started));
        }

        // 2. Open the transaction and take the per-user cart lock.
        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| self.failed(state, CheckoutError::Begin(e), started))?;

        let snapshot = match tx.lock_cart_snapshot(user_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                return Err(self
                    .abandon(tx, state, CheckoutError::CartRead(e), started)
                    .await);
            }
        };

        // A concurrent checkout may have emptied the cart while this one
        // waited on the lock; the snapshot under the lock decides.
        if snapshot.is_empty() {
            return Err(self
                .abandon(tx, state, CheckoutError::EmptyCart, started)
                .await);
        }
        state = CheckoutState::Snapshotted;
        tracing::debug!(%state, lines = snapshot.lines.len(), "cart snapshot taken");

        let totals = snapshot.totals();

        // 3. Write the pending order and its lines.
        let payment_key = Uuid::new_v4();
        let order_id = match tx
            .insert_order(user_id, totals.total_price, payment_key)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                return Err(self
                    .abandon(tx, state, CheckoutError::OrderWrite(e), started)
                    .await);
            }
        };
        state = CheckoutState::OrderCreated;
        tracing::debug!(%state, %order_id, "pending order written");

        for line in &snapshot.lines {
            if let Err(e) = tx.insert_order_line(order_id, line).await {
                return Err(self
                    .abandon(tx, state, CheckoutError::OrderWrite(e), started)
                    .await);
            }
        }
        state = CheckoutState::LinesWritten;

        // 4. Charge inside the open transaction, bounded by the policy
        //    timeout so a hung gateway cannot pin the row locks.
        state = CheckoutState::PaymentAttempted;
        tracing::debug!(
            %state,
            %order_id,
            amount_cents = totals.total_price.cents(),
            "requesting payment verdict"
        );
        let charge = self.gateway.charge(totals.total_price, payment_key);
        let verdict = match tokio::time::timeout(self.policy.payment_timeout, charge).await {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(e)) => {
                return Err(self
                    .abandon(tx, state, CheckoutError::Gateway(e), started)
                    .await);
            }
            Err(_) => {
                let e = PaymentError::Timeout(self.policy.payment_timeout);
                return Err(self
                    .abandon(tx, state, CheckoutError::Gateway(e), started)
                    .await);
            }
        };

        let reference = match verdict {
            PaymentVerdict::Approved { reference } => reference,
            PaymentVerdict::Declined { reason } => {
                return Err(self
                    .abandon(tx, state, CheckoutError::PaymentDeclined(reason), started)
                    .await);
            }
        };

        // 5. Finalize: mark paid, clear the cart, commit.
        if let Err(e) = tx.mark_order_paid(order_id).await {
            return Err(self
                .abandon(tx, state, CheckoutError::OrderWrite(e), started)
                .await);
        }
        if let Err(e) = tx.clear_cart(user_id).await {
            return Err(self
                .abandon(tx, state, CheckoutError::OrderWrite(e), started)
                .await);
        }
        if let Err(e) = tx.commit().await {
            return Err(self.failed(state, CheckoutError::Commit(e), started));
        }
        state = CheckoutState::Paid;

        let duration = started.elapsed().as_secs_f64();
        metrics::histogram!("checkout_duration_seconds").record(duration);
        metrics::counter!("checkout_completed").increment(1);
        tracing::info!(%order_id, %reference, duration, "checkout completed");

        Ok(CheckoutReceipt {
            order_id,
            state,
            total: totals.total_price,
            item_count: totals.item_count,
            lines: snapshot.lines,
        })
    }

    /// Rolls the transaction back and reports the failure.
    async fn abandon(
        &self,
        tx: S::Tx,
        state: CheckoutState,
        err: CheckoutError,
        started: std::time::Instant,
    ) -> CheckoutError {
        if let Err(rollback_err) = tx.rollback().await {
            tracing::warn!(error = %rollback_err, "checkout rollback failed");
        }
        self.failed(state, err, started)
    }

    fn failed(
        &self,
        state: CheckoutState,
        err: CheckoutError,
        started: std::time::Instant,
    ) -> CheckoutError {
        metrics::counter!("checkout_failures_total").increment(1);
        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::warn!(reached = %state, error = %err, "checkout failed");
        err
    }
}

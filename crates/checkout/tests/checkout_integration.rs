//! Integration tests for the checkout orchestration.

use std::time::Duration;

use checkout::{
    CheckoutError, CheckoutOrchestrator, CheckoutPolicy, CheckoutState, InMemoryPaymentGateway,
};
use common::{Money, UserId};
use domain::{NewCategory, NewProduct, OrderStatus, Product, ProductUpdate};
use store::{MemoryStore, Store};

type TestOrchestrator = CheckoutOrchestrator<MemoryStore, InMemoryPaymentGateway>;

struct TestHarness {
    store: MemoryStore,
    gateway: InMemoryPaymentGateway,
    orchestrator: TestOrchestrator,
    user_id: UserId,
    keyboard: Product,
    mouse: Product,
}

impl TestHarness {
    async fn new() -> Self {
        Self::with_policy(CheckoutPolicy::default()).await
    }

    async fn with_policy(policy: CheckoutPolicy) -> Self {
        let store = MemoryStore::new();
        let gateway = InMemoryPaymentGateway::new();
        let orchestrator = CheckoutOrchestrator::new(store.clone(), gateway.clone(), policy);

        let user = store
            .create_user("alice", "alice@example.com", "hash")
            .await
            .unwrap();
        let category = store
            .insert_category(&NewCategory::new("Peripherals", "Desk gear").unwrap())
            .await
            .unwrap();
        let keyboard = store
            .insert_product(
                &NewProduct::new(category.id, "Keyboard", "Tactile", Money::from_cents(10_00))
                    .unwrap(),
            )
            .await
            .unwrap();
        let mouse = store
            .insert_product(
                &NewProduct::new(category.id, "Mouse", "Wireless", Money::from_cents(5_00))
                    .unwrap(),
            )
            .await
            .unwrap();

        Self {
            store,
            gateway,
            orchestrator,
            user_id: user.id,
            keyboard,
            mouse,
        }
    }

    /// Puts two keyboards and one mouse in the cart (25.00 total).
    async fn fill_cart(&self) {
        self.store
            .add_cart_line(self.user_id, self.keyboard.id, 2)
            .await
            .unwrap();
        self.store
            .add_cart_line(self.user_id, self.mouse.id, 1)
            .await
            .unwrap();
    }

    async fn assert_no_trace(&self) {
        assert_eq!(self.store.order_count().await, 0);
        let snapshot = self.store.cart_snapshot(self.user_id).await.unwrap();
        assert_eq!(snapshot.lines.len(), 2);
    }
}

#[tokio::test]
async fn test_happy_path_checkout() {
    let h = TestHarness::new().await;
    h.fill_cart().await;

    let receipt = h.orchestrator.checkout(h.user_id).await.unwrap();

    assert_eq!(receipt.state, CheckoutState::Paid);
    assert_eq!(receipt.total, Money::from_cents(25_00));
    assert_eq!(receipt.item_count, 3);
    assert_eq!(receipt.lines.len(), 2);
    assert_eq!(receipt.lines[0].name, "Keyboard");
    assert_eq!(receipt.lines[1].name, "Mouse");

    // The order is durable and paid, and the cart is cleared.
    let orders = h.store.orders_for_user(h.user_id).await;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id, receipt.order_id);
    assert_eq!(orders[0].status, OrderStatus::Paid);
    assert_eq!(orders[0].total, Money::from_cents(25_00));
    assert!(h.store.cart_snapshot(h.user_id).await.unwrap().is_empty());

    // The gateway was charged exactly once.
    assert_eq!(h.gateway.charge_count(), 1);

    let history = h.store.order_history(h.user_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, OrderStatus::Paid);
    assert_eq!(history[0].lines.len(), 2);
}

#[tokio::test]
async fn test_empty_cart_fails_before_any_transaction() {
    let h = TestHarness::new().await;

    let err = h.orchestrator.checkout(h.user_id).await.unwrap_err();

    assert!(matches!(err, CheckoutError::EmptyCart));
    assert!(err.is_caller_error());
    assert_eq!(h.store.begin_count(), 0);
    assert_eq!(h.gateway.charge_count(), 0);
    assert_eq!(h.store.order_count().await, 0);
}

#[tokio::test]
async fn test_declined_payment_rolls_back() {
    let h = TestHarness::new().await;
    h.fill_cart().await;
    h.gateway.set_decline_all(true);

    let err = h.orchestrator.checkout(h.user_id).await.unwrap_err();

    assert!(matches!(err, CheckoutError::PaymentDeclined(_)));
    assert!(!err.is_caller_error());
    assert_eq!(h.gateway.charge_count(), 1);
    h.assert_no_trace().await;
}

#[tokio::test]
async fn test_gateway_failure_rolls_back() {
    let h = TestHarness::new().await;
    h.fill_cart().await;
    h.gateway.set_fail_on_charge(true);

    let err = h.orchestrator.checkout(h.user_id).await.unwrap_err();

    assert!(matches!(err, CheckoutError::Gateway(_)));
    h.assert_no_trace().await;
}

#[tokio::test]
async fn test_payment_timeout_rolls_back() {
    let h = TestHarness::with_policy(CheckoutPolicy {
        payment_timeout: Duration::from_millis(50),
    })
    .await;
    h.fill_cart().await;
    h.gateway.set_delay(Duration::from_millis(500));

    let err = h.orchestrator.checkout(h.user_id).await.unwrap_err();

    assert!(matches!(err, CheckoutError::Gateway(_)));
    h.assert_no_trace().await;
}

#[tokio::test]
async fn test_order_write_failure_rolls_back() {
    let h = TestHarness::new().await;
    h.fill_cart().await;
    h.store.set_fail_on_insert_order(true);

    let err = h.orchestrator.checkout(h.user_id).await.unwrap_err();

    assert!(matches!(err, CheckoutError::OrderWrite(_)));
    // The gateway is never consulted when the order cannot be written.
    assert_eq!(h.gateway.charge_count(), 0);
    h.assert_no_trace().await;
}

#[tokio::test]
async fn test_begin_failure_surfaces() {
    let h = TestHarness::new().await;
    h.fill_cart().await;
    h.store.set_fail_on_begin(true);

    let err = h.orchestrator.checkout(h.user_id).await.unwrap_err();

    assert!(matches!(err, CheckoutError::Begin(_)));
    assert_eq!(h.gateway.charge_count(), 0);
    h.assert_no_trace().await;
}

#[tokio::test]
async fn test_commit_failure_leaves_no_trace() {
    let h = TestHarness::new().await;
    h.fill_cart().await;
    h.store.set_fail_on_commit(true);

    let err = h.orchestrator.checkout(h.user_id).await.unwrap_err();

    assert!(matches!(err, CheckoutError::Commit(_)));
    // The charge went through before the commit failed; the caller sees
    // a failed checkout and the store holds nothing.
    assert_eq!(h.gateway.charge_count(), 1);
    h.assert_no_trace().await;
}

#[tokio::test]
async fn test_total_uses_prices_at_snapshot_time() {
    let h = TestHarness::new().await;
    h.fill_cart().await;

    // A price change before checkout is picked up by the snapshot.
    h.store
        .update_product(
            h.keyboard.id,
            &ProductUpdate::new("Keyboard", "Tactile", Money::from_cents(12_00)).unwrap(),
        )
        .await
        .unwrap();

    let receipt = h.orchestrator.checkout(h.user_id).await.unwrap();
    assert_eq!(receipt.total, Money::from_cents(29_00));

    // A price change after checkout leaves the order untouched.
    h.store
        .update_product(
            h.keyboard.id,
            &ProductUpdate::new("Keyboard", "Tactile", Money::from_cents(99_00)).unwrap(),
        )
        .await
        .unwrap();

    let history = h.store.order_history(h.user_id).await.unwrap();
    assert_eq!(history[0].total, Money::from_cents(29_00));
    let keyboard_line = history[0]
        .lines
        .iter()
        .find(|l| l.product_id == h.keyboard.id)
        .unwrap();
    assert_eq!(keyboard_line.unit_price, Money::from_cents(12_00));
}

#[tokio::test]
async fn test_payment_key_is_persisted_and_sent_to_gateway() {
    let h = TestHarness::new().await;
    h.fill_cart().await;

    h.orchestrator.checkout(h.user_id).await.unwrap();

    let orders = h.store.orders_for_user(h.user_id).await;
    assert_eq!(h.gateway.last_key(), Some(orders[0].payment_key));
}

#[tokio::test]
async fn test_each_attempt_gets_a_fresh_payment_key() {
    let h = TestHarness::new().await;

    h.fill_cart().await;
    h.orchestrator.checkout(h.user_id).await.unwrap();
    let first_key = h.gateway.last_key().unwrap();

    h.fill_cart().await;
    h.orchestrator.checkout(h.user_id).await.unwrap();
    let second_key = h.gateway.last_key().unwrap();

    assert_ne!(first_key, second_key);

    let orders = h.store.orders_for_user(h.user_id).await;
    assert_eq!(orders.len(), 2);
    assert_ne!(orders[0].payment_key, orders[1].payment_key);
}

#[tokio::test]
async fn test_concurrent_checkouts_exactly_one_wins() {
    let h = TestHarness::new().await;
    h.fill_cart().await;

    let (first, second) = tokio::join!(
        h.orchestrator.checkout(h.user_id),
        h.orchestrator.checkout(h.user_id)
    );

    // One checkout pays, the other finds the cart already emptied.
    let (winner, loser) = if first.is_ok() {
        (first, second)
    } else {
        (second, first)
    };
    let receipt = winner.unwrap();
    assert_eq!(receipt.state, CheckoutState::Paid);
    assert!(matches!(loser.unwrap_err(), CheckoutError::EmptyCart));

    assert_eq!(h.store.order_count().await, 1);
    assert_eq!(h.gateway.charge_count(), 1);
    assert!(h.store.cart_snapshot(h.user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_checkout_can_be_retried() {
    let h = TestHarness::new().await;
    h.fill_cart().await;

    h.gateway.set_decline_all(true);
    h.orchestrator.checkout(h.user_id).await.unwrap_err();

    h.gateway.set_decline_all(false);
    let receipt = h.orchestrator.checkout(h.user_id).await.unwrap();

    assert_eq!(receipt.total, Money::from_cents(25_00));
    assert_eq!(h.store.order_count().await, 1);
}

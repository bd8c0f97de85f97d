//! Checkout error types.

use store::StoreError;
use thiserror::Error;

use crate::gateway::PaymentError;

/// Errors that can occur during a checkout run.
///
/// None of these are partially recoverable: a failed checkout leaves no
/// durable state, and the caller retries the whole operation.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart has no lines, so there is nothing to order.
    #[error("Cart is empty")]
    EmptyCart,

    /// The cart snapshot could not be read.
    #[error("Cart read failed: {0}")]
    CartRead(#[source] StoreError),

    /// The order, its lines, or the cart clear could not be written.
    #[error("Order write failed: {0}")]
    OrderWrite(#[source] StoreError),

    /// The gateway answered with a decline verdict.
    #[error("Payment declined: {0}")]
    PaymentDeclined(String),

    /// The gateway failed or timed out before giving a verdict.
    #[error("Payment gateway error: {0}")]
    Gateway(#[from] PaymentError),

    /// The checkout transaction could not be opened.
    #[error("Checkout transaction could not start: {0}")]
    Begin(#[source] StoreError),

    /// The checkout transaction could not be committed.
    #[error("Checkout commit failed: {0}")]
    Commit(#[source] StoreError),
}

impl CheckoutError {
    /// Returns true when the caller sent a request that can never
    /// succeed as-is, as opposed to a dependency failing.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, CheckoutError::EmptyCart)
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;

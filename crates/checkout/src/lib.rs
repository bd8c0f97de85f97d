//! Checkout orchestration for the store backend.
//!
//! Converts a user's cart into a paid order inside a single store
//! transaction: snapshot the cart under a per-user lock, write the
//! pending order and its lines, charge the payment gateway while the
//! transaction is still open, then mark the order paid, clear the cart,
//! and commit. Any failure before commit rolls the transaction back and
//! leaves no durable trace.

pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod state;

pub use error::CheckoutError;
pub use gateway::{InMemoryPaymentGateway, PaymentError, PaymentGateway, PaymentVerdict};
pub use orchestrator::{CheckoutOrchestrator, CheckoutPolicy, CheckoutReceipt};
pub use state::CheckoutState;

//! Relational persistence for the store backend.
//!
//! This crate provides:
//! - The [`Store`] trait covering users, the catalog, carts, and order
//!   history
//! - The [`CheckoutTx`] trait for the all-or-nothing checkout transaction
//! - A PostgreSQL implementation and an in-memory implementation with the
//!   same semantics

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{MemoryStore, MemoryTx};
pub use postgres::{PgCheckoutTx, PgStore};
pub use store::{CheckoutTx, Store};

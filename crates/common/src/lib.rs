//! Shared types for the store backend.
//!
//! Identifier newtypes keep user, catalog, cart, and order IDs from being
//! mixed up, and [`Money`] keeps prices in integer cents.

pub mod money;
pub mod types;

pub use money::Money;
pub use types::{CartId, CategoryId, OrderId, ProductId, UserId};

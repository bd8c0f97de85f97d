//! Domain layer for the store backend.
//!
//! This crate provides the core domain types:
//! - User accounts and validated registration input
//! - Catalog entities (categories and products) with validated payloads
//! - Cart snapshots with derived totals
//! - Orders, order lines, and the order status lifecycle

pub mod cart;
pub mod catalog;
pub mod error;
pub mod order;
pub mod user;

pub use cart::{CartLine, CartSnapshot, CartTotals};
pub use catalog::{Category, CategoryUpdate, NewCategory, NewProduct, Product, ProductUpdate};
pub use error::DomainError;
pub use order::{Order, OrderLine, OrderStatus, PlacedOrder};
pub use user::{NewUser, User};

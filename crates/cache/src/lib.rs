//! Redis-backed read-through caching for the catalog.
//!
//! This crate provides:
//! - The [`Cache`] trait (`get`/`set`/`delete` over JSON strings)
//! - A Redis implementation and an in-memory implementation for tests
//! - [`CachedCatalog`], which wraps a [`store::Store`] with the
//!   read-through and invalidation rules for categories and products

pub mod cache;
pub mod catalog;
pub mod error;
pub mod keys;
pub mod memory;
pub mod redis;

pub use cache::Cache;
pub use catalog::{CachedCatalog, CatalogError};
pub use error::{CacheError, Result};
pub use memory::MemoryCache;
pub use self::redis::RedisCache;

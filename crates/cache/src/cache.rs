use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

/// A string-keyed cache holding JSON-encoded values.
///
/// Implementations must treat `get` on an absent or expired key as a
/// miss, not an error. `delete` takes a batch so that one mutation can
/// drop every key that may hold a stale view in a single call.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Returns the cached value for `key`, or `None` on a miss.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key` for `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Deletes every key in `keys`. Missing keys are not an error.
    async fn delete(&self, keys: &[String]) -> Result<()>;
}

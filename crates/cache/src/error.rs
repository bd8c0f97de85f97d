use thiserror::Error;

/// Errors from a cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The Redis command failed.
    #[error("cache backend error: {0}")]
    Backend(#[from] redis::RedisError),

    /// A value could not be encoded for caching.
    #[error("cache encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

use common::UserId;
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No row matched the requested id.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The user has no cart row. Carts are created together with the
    /// user, so this points at missing data rather than normal flow.
    #[error("Cart not found for user: {0}")]
    CartMissing(UserId),

    /// A unique constraint rejected the write.
    #[error("Duplicate {0}")]
    Duplicate(&'static str),

    /// A relational constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A stored value failed to decode into a domain type.
    #[error("Invalid stored value: {0}")]
    Decode(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Builds a `NotFound` for the given entity and id.
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns true if this error means the requested row does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

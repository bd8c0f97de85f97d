//! HTTP route handlers and shared application state.

pub mod cart;
pub mod categories;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;
pub mod users;

use std::time::Duration;

use cache::CachedCatalog;
use checkout::{CheckoutOrchestrator, InMemoryPaymentGateway};
use store::Store;
use uuid::Uuid;

use crate::auth::TokenService;
use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store, C> {
    pub store: S,
    pub catalog: CachedCatalog<S, C>,
    pub checkout: CheckoutOrchestrator<S, InMemoryPaymentGateway>,
    pub tokens: TokenService,
    pub checkout_timeout: Duration,
    pub history_timeout: Duration,
}

/// Parses a path or body segment into a typed id.
pub(crate) fn parse_id<T: From<Uuid>>(raw: &str, entity: &str) -> Result<T, ApiError> {
    let uuid = Uuid::parse_str(raw)
        .map_err(|e| ApiError::BadRequest(format!("Invalid {entity} id: {e}")))?;
    Ok(T::from(uuid))
}

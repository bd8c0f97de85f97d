//! HTTP API server for the online store backend.
//!
//! Routes live under `/v1/api`: public registration and login, plus
//! bearer-token protected catalog, cart, checkout, and history
//! endpoints, with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use cache::{Cache, CachedCatalog};
use checkout::{CheckoutOrchestrator, CheckoutPolicy, InMemoryPaymentGateway};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::TokenService;
use config::Config;
use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static, C: Cache + Clone + 'static>(
    state: Arc<AppState<S, C>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/v1/api/public/register",
            post(routes::users::register::<S, C>),
        )
        .route("/v1/api/public/login", post(routes::users::login::<S, C>))
        .route(
            "/v1/api/protected/categories",
            get(routes::categories::list::<S, C>),
        )
        .route(
            "/v1/api/protected/categories",
            post(routes::categories::create::<S, C>),
        )
        .route(
            "/v1/api/protected/categories/{id}",
            get(routes::categories::get::<S, C>),
        )
        .route(
            "/v1/api/protected/categories/{id}",
            put(routes::categories::update::<S, C>),
        )
        .route(
            "/v1/api/protected/categories/{id}",
            delete(routes::categories::delete::<S, C>),
        )
        .route(
            "/v1/api/protected/categories/{id}/products",
            get(routes::categories::products::<S, C>),
        )
        .route(
            "/v1/api/protected/products",
            get(routes::products::list::<S, C>),
        )
        .route(
            "/v1/api/protected/products",
            post(routes::products::create::<S, C>),
        )
        .route(
            "/v1/api/protected/products/{id}",
            get(routes::products::get::<S, C>),
        )
        .route(
            "/v1/api/protected/products/{id}",
            put(routes::products::update::<S, C>),
        )
        .route(
            "/v1/api/protected/products/{id}",
            delete(routes::products::delete::<S, C>),
        )
        .route("/v1/api/protected/cart", get(routes::cart::view::<S, C>))
        .route("/v1/api/protected/cart", post(routes::cart::add::<S, C>))
        .route("/v1/api/protected/cart", put(routes::cart::modify::<S, C>))
        .route(
            "/v1/api/protected/cart",
            delete(routes::cart::empty::<S, C>),
        )
        .route(
            "/v1/api/protected/cart/{product_id}",
            delete(routes::cart::remove::<S, C>),
        )
        .route(
            "/v1/api/protected/checkout",
            post(routes::orders::checkout::<S, C>),
        )
        .route(
            "/v1/api/protected/checkout/history",
            get(routes::orders::history::<S, C>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Builds the shared application state from a store and a cache.
///
/// Returns the payment gateway handle alongside the state so tests can
/// steer its verdicts.
pub fn create_state<S: Store + Clone + 'static, C: Cache + Clone + 'static>(
    store: S,
    cache: C,
    config: &Config,
) -> (Arc<AppState<S, C>>, InMemoryPaymentGateway) {
    let gateway = InMemoryPaymentGateway::new();
    let catalog = CachedCatalog::new(store.clone(), cache, config.cache_ttl());
    let orchestrator = CheckoutOrchestrator::new(
        store.clone(),
        gateway.clone(),
        CheckoutPolicy {
            payment_timeout: config.payment_timeout(),
        },
    );

    let state = Arc::new(AppState {
        store,
        catalog,
        checkout: orchestrator,
        tokens: TokenService::new(&config.jwt_secret, config.jwt_expiry()),
        checkout_timeout: config.checkout_timeout(),
        history_timeout: config.history_timeout(),
    });

    (state, gateway)
}

//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cache::CatalogError;
use checkout::CheckoutError;
use domain::DomainError;
use store::StoreError;

use crate::auth::AuthError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Input validation error.
    Domain(DomainError),
    /// Authentication or token error.
    Auth(AuthError),
    /// Store error.
    Store(StoreError),
    /// Cached catalog error.
    Catalog(CatalogError),
    /// Checkout execution error.
    Checkout(CheckoutError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::Auth(err) => auth_error_to_response(err),
            ApiError::Store(err) => store_error_to_response(err),
            ApiError::Catalog(err) => catalog_error_to_response(err),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn store_error_to_response(err: StoreError) -> (StatusCode, String) {
    match &err {
        StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        StoreError::Duplicate(_) | StoreError::Conflict(_) => {
            (StatusCode::CONFLICT, err.to_string())
        }
        _ => {
            tracing::error!(error = %err, "store error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

fn catalog_error_to_response(err: CatalogError) -> (StatusCode, String) {
    match err {
        CatalogError::Store(inner) => store_error_to_response(inner),
        CatalogError::Invalidation(inner) => {
            tracing::error!(error = %inner, "cache invalidation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String) {
    match &err {
        CheckoutError::EmptyCart => (StatusCode::BAD_REQUEST, err.to_string()),
        CheckoutError::PaymentDeclined(_) => (StatusCode::PAYMENT_REQUIRED, err.to_string()),
        CheckoutError::Gateway(_) => (StatusCode::BAD_GATEWAY, err.to_string()),
        _ => {
            tracing::error!(error = %err, "checkout failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Checkout failed".to_string(),
            )
        }
    }
}

fn auth_error_to_response(err: AuthError) -> (StatusCode, String) {
    match &err {
        AuthError::InvalidCredentials | AuthError::MissingToken | AuthError::InvalidToken => {
            (StatusCode::UNAUTHORIZED, err.to_string())
        }
        AuthError::PasswordHash | AuthError::TokenIssue => {
            tracing::error!(error = %err, "auth internals failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Catalog(err)
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

//! Checkout and order history endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use cache::Cache;
use serde::Serialize;
use store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::routes::AppState;

use super::cart::CartLineResponse;

// -- Response types --

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub order_id: String,
    pub state: String,
    pub item_count: u32,
    pub total_cents: i64,
    pub lines: Vec<CartLineResponse>,
}

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub product_id: String,
    pub name: String,
    pub description: String,
    pub quantity: u32,
    /// Price per unit frozen at checkout time.
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

#[derive(Serialize)]
pub struct PlacedOrderResponse {
    pub id: String,
    pub status: String,
    pub total_cents: i64,
    pub created_at: String,
    pub lines: Vec<OrderLineResponse>,
}

// -- Handlers --

/// POST /v1/api/protected/checkout — turn the cart into a paid order.
///
/// The whole run is bounded by the configured checkout deadline; expiry
/// drops the in-flight transaction, which rolls it back.
#[tracing::instrument(skip(state))]
pub async fn checkout<S: Store + Clone + 'static, C: Cache + Clone + 'static>(
    State(state): State<Arc<AppState<S, C>>>,
    user: AuthUser,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let receipt = tokio::time::timeout(state.checkout_timeout, state.checkout.checkout(user.id))
        .await
        .map_err(|_| ApiError::Internal("Checkout timed out".to_string()))??;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            order_id: receipt.order_id.to_string(),
            state: receipt.state.to_string(),
            item_count: receipt.item_count,
            total_cents: receipt.total.cents(),
            lines: receipt
                .lines
                .into_iter()
                .map(CartLineResponse::from)
                .collect(),
        }),
    ))
}

/// GET /v1/api/protected/checkout/history — the caller's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn history<S: Store + Clone + 'static, C: Cache + Clone + 'static>(
    State(state): State<Arc<AppState<S, C>>>,
    user: AuthUser,
) -> Result<Json<Vec<PlacedOrderResponse>>, ApiError> {
    let orders = tokio::time::timeout(state.history_timeout, state.store.order_history(user.id))
        .await
        .map_err(|_| ApiError::Internal("Order history timed out".to_string()))??;

    let responses = orders
        .into_iter()
        .map(|order| PlacedOrderResponse {
            id: order.id.to_string(),
            status: order.status.as_str().to_string(),
            total_cents: order.total.cents(),
            created_at: order.created_at.to_rfc3339(),
            lines: order
                .lines
                .into_iter()
                .map(|line| {
                    let line_total = line.line_total();
                    OrderLineResponse {
                        product_id: line.product_id.to_string(),
                        name: line.name,
                        description: line.description,
                        quantity: line.quantity,
                        unit_price_cents: line.unit_price.cents(),
                        line_total_cents: line_total.cents(),
                    }
                })
                .collect(),
        })
        .collect();

    Ok(Json(responses))
}

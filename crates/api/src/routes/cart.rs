//! Cart endpoints: view, add, modify, remove, empty.
//!
//! Cart lines carry no price of their own; every response resolves
//! names and unit prices from the live catalog, so totals always
//! reflect current prices.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use cache::Cache;
use common::ProductId;
use domain::{CartLine, CartSnapshot, DomainError};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::routes::{AppState, parse_id};

// -- Request types --

#[derive(Deserialize)]
pub struct CartLineRequest {
    pub product_id: String,
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartLineResponse {
    pub product_id: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: u32,
    pub line_total_cents: i64,
}

impl From<CartLine> for CartLineResponse {
    fn from(line: CartLine) -> Self {
        let line_total = line.line_total();
        Self {
            product_id: line.product_id.to_string(),
            name: line.name,
            unit_price_cents: line.unit_price.cents(),
            quantity: line.quantity,
            line_total_cents: line_total.cents(),
        }
    }
}

#[derive(Serialize)]
pub struct CartResponse {
    pub lines: Vec<CartLineResponse>,
    pub item_count: u32,
    pub total_cents: i64,
}

impl From<CartSnapshot> for CartResponse {
    fn from(snapshot: CartSnapshot) -> Self {
        let totals = snapshot.totals();
        Self {
            lines: snapshot
                .lines
                .into_iter()
                .map(CartLineResponse::from)
                .collect(),
            item_count: totals.item_count,
            total_cents: totals.total_price.cents(),
        }
    }
}

// -- Handlers --

/// GET /v1/api/protected/cart — the caller's cart with totals.
#[tracing::instrument(skip(state))]
pub async fn view<S: Store + Clone + 'static, C: Cache + Clone + 'static>(
    State(state): State<Arc<AppState<S, C>>>,
    user: AuthUser,
) -> Result<Json<CartResponse>, ApiError> {
    let snapshot = state.store.cart_snapshot(user.id).await?;
    Ok(Json(snapshot.into()))
}

/// POST /v1/api/protected/cart — add a product, merging quantities.
#[tracing::instrument(skip(state, req))]
pub async fn add<S: Store + Clone + 'static, C: Cache + Clone + 'static>(
    State(state): State<Arc<AppState<S, C>>>,
    user: AuthUser,
    Json(req): Json<CartLineRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    if req.quantity == 0 {
        return Err(DomainError::InvalidQuantity.into());
    }
    let product_id: ProductId = parse_id(&req.product_id, "product")?;

    let snapshot = state
        .store
        .add_cart_line(user.id, product_id, req.quantity)
        .await?;
    Ok(Json(snapshot.into()))
}

/// PUT /v1/api/protected/cart — set a line's quantity; zero removes it.
#[tracing::instrument(skip(state, req))]
pub async fn modify<S: Store + Clone + 'static, C: Cache + Clone + 'static>(
    State(state): State<Arc<AppState<S, C>>>,
    user: AuthUser,
    Json(req): Json<CartLineRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let product_id: ProductId = parse_id(&req.product_id, "product")?;

    let snapshot = if req.quantity == 0 {
        state.store.remove_cart_line(user.id, product_id).await?
    } else {
        state
            .store
            .set_cart_line_quantity(user.id, product_id, req.quantity)
            .await?
    };
    Ok(Json(snapshot.into()))
}

/// DELETE /v1/api/protected/cart/{product_id} — drop one line.
#[tracing::instrument(skip(state))]
pub async fn remove<S: Store + Clone + 'static, C: Cache + Clone + 'static>(
    State(state): State<Arc<AppState<S, C>>>,
    user: AuthUser,
    Path(product_id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let product_id: ProductId = parse_id(&product_id, "product")?;
    let snapshot = state.store.remove_cart_line(user.id, product_id).await?;
    Ok(Json(snapshot.into()))
}

/// DELETE /v1/api/protected/cart — empty the cart.
#[tracing::instrument(skip(state))]
pub async fn empty<S: Store + Clone + 'static, C: Cache + Clone + 'static>(
    State(state): State<Arc<AppState<S, C>>>,
    user: AuthUser,
) -> Result<StatusCode, ApiError> {
    state.store.empty_cart(user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

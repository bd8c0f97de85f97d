//! Product CRUD endpoints backed by the cached catalog.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use cache::Cache;
use common::{CategoryId, Money, ProductId};
use domain::{NewProduct, Product, ProductUpdate};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::routes::{AppState, parse_id};

// -- Request types --

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub category_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: i64,
}

/// Update payload. The owning category cannot be changed.
#[derive(Deserialize)]
pub struct UpdateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub category_id: String,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub created_at: String,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.to_string(),
            category_id: product.category_id.to_string(),
            name: product.name,
            description: product.description,
            price_cents: product.price.cents(),
            created_at: product.created_at.to_rfc3339(),
        }
    }
}

// -- Handlers --

/// GET /v1/api/protected/products — list all products.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static, C: Cache + Clone + 'static>(
    State(state): State<Arc<AppState<S, C>>>,
    _user: AuthUser,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state.catalog.products().await?;
    Ok(Json(
        products.into_iter().map(ProductResponse::from).collect(),
    ))
}

/// POST /v1/api/protected/products — create a product in a category.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store + Clone + 'static, C: Cache + Clone + 'static>(
    State(state): State<Arc<AppState<S, C>>>,
    _user: AuthUser,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let category_id: CategoryId = parse_id(&req.category_id, "category")?;
    let input = NewProduct::new(
        category_id,
        req.name,
        req.description,
        Money::from_cents(req.price_cents),
    )?;

    let product = state.catalog.create_product(&input).await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

/// GET /v1/api/protected/products/{id} — fetch one product.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static, C: Cache + Clone + 'static>(
    State(state): State<Arc<AppState<S, C>>>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let id: ProductId = parse_id(&id, "product")?;
    let product = state.catalog.product(id).await?;
    Ok(Json(product.into()))
}

/// PUT /v1/api/protected/products/{id} — update name, description, price.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Store + Clone + 'static, C: Cache + Clone + 'static>(
    State(state): State<Arc<AppState<S, C>>>,
    _user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let id: ProductId = parse_id(&id, "product")?;
    let update = ProductUpdate::new(req.name, req.description, Money::from_cents(req.price_cents))?;
    let product = state.catalog.update_product(id, &update).await?;
    Ok(Json(product.into()))
}

/// DELETE /v1/api/protected/products/{id} — remove a product.
///
/// Drops the product from every cart; fails with a conflict if it
/// appears on a placed order.
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store + Clone + 'static, C: Cache + Clone + 'static>(
    State(state): State<Arc<AppState<S, C>>>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: ProductId = parse_id(&id, "product")?;
    state.catalog.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

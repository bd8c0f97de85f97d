//! Category CRUD endpoints backed by the cached catalog.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use cache::Cache;
use common::CategoryId;
use domain::{Category, CategoryUpdate, NewCategory};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::routes::{AppState, parse_id};

use super::products::ProductResponse;

// -- Request types --

#[derive(Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct CategoryResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: String,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id.to_string(),
            name: category.name,
            description: category.description,
            created_at: category.created_at.to_rfc3339(),
        }
    }
}

// -- Handlers --

/// GET /v1/api/protected/categories — list all categories.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static, C: Cache + Clone + 'static>(
    State(state): State<Arc<AppState<S, C>>>,
    _user: AuthUser,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    let categories = state.catalog.categories().await?;
    Ok(Json(
        categories.into_iter().map(CategoryResponse::from).collect(),
    ))
}

/// POST /v1/api/protected/categories — create a category.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store + Clone + 'static, C: Cache + Clone + 'static>(
    State(state): State<Arc<AppState<S, C>>>,
    _user: AuthUser,
    Json(req): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    let input = NewCategory::new(req.name, req.description)?;
    let category = state.catalog.create_category(&input).await?;
    Ok((StatusCode::CREATED, Json(category.into())))
}

/// GET /v1/api/protected/categories/{id} — fetch one category.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static, C: Cache + Clone + 'static>(
    State(state): State<Arc<AppState<S, C>>>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let id: CategoryId = parse_id(&id, "category")?;
    let category = state.catalog.category(id).await?;
    Ok(Json(category.into()))
}

/// PUT /v1/api/protected/categories/{id} — replace display fields.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Store + Clone + 'static, C: Cache + Clone + 'static>(
    State(state): State<Arc<AppState<S, C>>>,
    _user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<CategoryRequest>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let id: CategoryId = parse_id(&id, "category")?;
    let update = CategoryUpdate::new(req.name, req.description)?;
    let category = state.catalog.update_category(id, &update).await?;
    Ok(Json(category.into()))
}

/// DELETE /v1/api/protected/categories/{id} — remove an empty category.
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store + Clone + 'static, C: Cache + Clone + 'static>(
    State(state): State<Arc<AppState<S, C>>>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: CategoryId = parse_id(&id, "category")?;
    state.catalog.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/api/protected/categories/{id}/products — list a category's products.
#[tracing::instrument(skip(state))]
pub async fn products<S: Store + Clone + 'static, C: Cache + Clone + 'static>(
    State(state): State<Arc<AppState<S, C>>>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let id: CategoryId = parse_id(&id, "category")?;
    let products = state.catalog.products_by_category(id).await?;
    Ok(Json(
        products.into_iter().map(ProductResponse::from).collect(),
    ))
}

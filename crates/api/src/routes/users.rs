//! Registration and login endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use cache::Cache;
use domain::NewUser;
use serde::{Deserialize, Serialize};
use store::Store;

use crate::auth::{self, AuthError};
use crate::error::ApiError;
use crate::routes::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    /// Expiry of the token, seconds since the epoch.
    pub expires_at: i64,
}

// -- Handlers --

/// POST /v1/api/public/register — create an account and its empty cart.
#[tracing::instrument(skip(state, req))]
pub async fn register<S: Store + Clone + 'static, C: Cache + Clone + 'static>(
    State(state): State<Arc<AppState<S, C>>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let input = NewUser::new(req.username, req.email, req.password)?;
    let password_hash = auth::hash_password(&input.password)?;

    let user = state
        .store
        .create_user(&input.username, &input.email, &password_hash)
        .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id: user.id.to_string(),
            username: user.username,
            email: user.email,
            created_at: user.created_at.to_rfc3339(),
        }),
    ))
}

/// POST /v1/api/public/login — verify credentials and mint a session token.
#[tracing::instrument(skip(state, req))]
pub async fn login<S: Store + Clone + 'static, C: Cache + Clone + 'static>(
    State(state): State<Arc<AppState<S, C>>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    // Unknown users and wrong passwords produce the same response.
    let user = match state.store.user_by_username(&req.username).await {
        Ok(user) => user,
        Err(err) if err.is_not_found() => return Err(AuthError::InvalidCredentials.into()),
        Err(err) => return Err(err.into()),
    };

    auth::verify_password(&req.password, &user.password_hash)?;

    let (token, expires_at) = state.tokens.mint(&user)?;

    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(LoginResponse { token, expires_at }))
}

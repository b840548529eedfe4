//! User registration, the current-user endpoint, and administrative
//! user management.

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::error::ApiError;
use super::routes::AppState;
use super::types::{RegisterRequest, UserResponse};

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if req.email.trim().is_empty() {
        return Err(ApiError::Validation("email must not be empty".to_string()));
    }
    if req.password.is_empty() {
        return Err(ApiError::Validation(
            "password must not be empty".to_string(),
        ));
    }

    let user = state.store.register(&req.email, &req.password).await?;
    Ok(Json(user.into()))
}

pub async fn me(Extension(user): Extension<CurrentUser>) -> Json<UserResponse> {
    Json(UserResponse {
        id: user.id,
        email: user.email,
    })
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.store.list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.store.delete_user(id).await?;
    Ok(Json(user.into()))
}

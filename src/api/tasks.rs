//! Task endpoints. Every handler is scoped to the authenticated caller;
//! the store's ownership gate turns other users' ids into 404s.

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::error::ApiError;
use super::routes::AppState;
use crate::store::{NewTask, Task, TaskPatch};

pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = state.store.list_tasks(user.id).await?;
    Ok(Json(tasks))
}

pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(fields): Json<NewTask>,
) -> Result<Json<Task>, ApiError> {
    let task = state.store.create_task(user.id, fields).await?;
    Ok(Json(task))
}

pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(task_id): Path<i64>,
) -> Result<Json<Task>, ApiError> {
    let task = state.store.get_task(user.id, task_id).await?;
    Ok(Json(task))
}

pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(task_id): Path<i64>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Task>, ApiError> {
    let task = state.store.update_task(user.id, task_id, patch).await?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(task_id): Path<i64>,
) -> Result<Json<Task>, ApiError> {
    let task = state.store.delete_task(user.id, task_id).await?;
    Ok(Json(task))
}

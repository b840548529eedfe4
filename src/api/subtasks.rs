//! Subtask endpoints, nested under `/tasks/{id}/subtasks/`.
//!
//! The store checks parent ownership before touching the subtask, so a
//! subtask under someone else's task reports "Task not found" rather than
//! leaking that the task exists.

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::error::ApiError;
use super::routes::AppState;
use crate::store::{NewSubtask, Subtask, SubtaskPatch};

pub async fn create_subtask(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(task_id): Path<i64>,
    Json(fields): Json<NewSubtask>,
) -> Result<Json<Subtask>, ApiError> {
    let subtask = state.store.create_subtask(user.id, task_id, fields).await?;
    Ok(Json(subtask))
}

pub async fn list_subtasks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(task_id): Path<i64>,
) -> Result<Json<Vec<Subtask>>, ApiError> {
    let subtasks = state.store.list_subtasks(user.id, task_id).await?;
    Ok(Json(subtasks))
}

pub async fn update_subtask(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path((task_id, subtask_id)): Path<(i64, i64)>,
    Json(patch): Json<SubtaskPatch>,
) -> Result<Json<Subtask>, ApiError> {
    let subtask = state
        .store
        .update_subtask(user.id, task_id, subtask_id, patch)
        .await?;
    Ok(Json(subtask))
}

pub async fn delete_subtask(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path((task_id, subtask_id)): Path<(i64, i64)>,
) -> Result<Json<Subtask>, ApiError> {
    let subtask = state
        .store
        .delete_subtask(user.id, task_id, subtask_id)
        .await?;
    Ok(Json(subtask))
}

//! API error kinds and their status-code mapping.
//!
//! Every handler returns [`ApiError`] on failure; the mapping table lives in
//! one place so a new endpoint cannot invent its own codes. Bodies are
//! `{"detail": "<message>"}`, and every 401 carries a
//! `WWW-Authenticate: Bearer` challenge.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Incorrect email or password")]
    InvalidCredentials,

    /// Missing/invalid/expired token, or the token subject no longer exists.
    #[error("Could not validate credentials")]
    Unauthorized,

    /// Resource absent or not owned by the caller; deliberately conflated.
    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => ApiError::DuplicateEmail,
            StoreError::UserNotFound => ApiError::NotFound("User not found"),
            StoreError::TaskNotFound => ApiError::NotFound("Task not found"),
            StoreError::SubtaskNotFound => ApiError::NotFound("Subtask not found"),
            other => ApiError::Internal(other.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::DuplicateEmail | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if let ApiError::Internal(err) = &self {
            tracing::error!("request failed: {err:#}");
        }

        let body = Json(json!({ "detail": self.to_string() }));
        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

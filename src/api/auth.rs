//! Bearer-token authentication.
//!
//! - Clients submit form-encoded credentials to `POST /login/`
//! - The server returns a JWT bound to the user's email
//! - Protected routes run [`require_auth`], which verifies the token,
//!   re-resolves the subject against the credential store (a deleted user's
//!   tokens die with the account), and injects [`CurrentUser`]
//! - Administrative routes run [`require_admin`] against the configured
//!   `ADMIN_TOKEN`; with none configured they fail closed

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
    Form, Json,
};
use chrono::Duration;
use std::sync::Arc;

use super::error::ApiError;
use super::routes::AppState;
use super::types::{LoginForm, TokenResponse};
use crate::password;

/// The authenticated caller, injected into protected requests.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state
        .store
        .authenticate(&form.username, &form.password)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    let ttl = Duration::minutes(state.config.token_ttl_minutes);
    let access_token = state.tokens.issue(&user.email, Some(ttl))?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

fn bearer_token<'a>(req: &'a Request<Body>) -> Option<&'a str> {
    let header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = match bearer_token(&req) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => return ApiError::Unauthorized.into_response(),
    };

    let subject = match state.tokens.verify(&token) {
        Ok(subject) => subject,
        Err(e) => {
            tracing::debug!("rejected token: {}", e);
            return ApiError::Unauthorized.into_response();
        }
    };

    // The subject must still resolve to a live user.
    let user = match state.store.find_user_by_email(&subject).await {
        Ok(Some(user)) => user,
        Ok(None) => return ApiError::Unauthorized.into_response(),
        Err(e) => return ApiError::from(e).into_response(),
    };

    req.extensions_mut().insert(CurrentUser {
        id: user.id,
        email: user.email,
    });
    next.run(req).await
}

pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    // No configured credential means no admin access.
    let expected = match state.config.admin_token.as_deref() {
        Some(t) if !t.is_empty() => t,
        _ => return ApiError::Unauthorized.into_response(),
    };

    match bearer_token(&req) {
        Some(presented)
            if password::constant_time_eq(presented.as_bytes(), expected.as_bytes()) =>
        {
            next.run(req).await
        }
        _ => ApiError::Unauthorized.into_response(),
    }
}

//! Router assembly and server startup.

use std::sync::Arc;

use axum::middleware;
use axum::{
    routing::{delete, get, post, put},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::store::Store;
use crate::token::TokenService;

use super::auth;
use super::subtasks;
use super::tasks;
use super::types::HealthResponse;
use super::users;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Store,
    pub tokens: TokenService,
}

/// Build the full router: public routes, admin routes behind the admin
/// gate, and everything else behind bearer auth.
pub fn router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/users/", post(users::register))
        .route("/login/", post(auth::login));

    let admin_routes = Router::new()
        .route("/users/", get(users::list_users))
        .route("/users/:id", delete(users::delete_user))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_admin,
        ));

    let protected_routes = Router::new()
        .route("/me", get(users::me))
        .route("/tasks/", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/tasks/:id",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route(
            "/tasks/:id/subtasks/",
            get(subtasks::list_subtasks).post(subtasks::create_subtask),
        )
        .route(
            "/tasks/:id/subtasks/:subtask_id",
            put(subtasks::update_subtask).delete(subtasks::delete_subtask),
        )
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let store = Store::open(config.database_path.clone()).await?;
    let tokens = TokenService::new(&config.jwt_secret);

    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        tokens,
    });

    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

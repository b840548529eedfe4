//! HTTP API for taskdeck.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `POST /users/` - Register a user
//! - `POST /login/` - Exchange form credentials for a bearer token
//! - `GET /me` - Current user
//! - `GET /users/` / `DELETE /users/{id}` - Administrative user management
//! - `GET|POST /tasks/` - List / create the caller's tasks
//! - `GET|PUT|DELETE /tasks/{id}` - Fetch / partially update / delete a task
//! - `GET|POST /tasks/{id}/subtasks/` - List / create subtasks
//! - `PUT|DELETE /tasks/{id}/subtasks/{sid}` - Update / delete a subtask

mod auth;
mod error;
mod routes;
mod subtasks;
mod tasks;
mod types;
mod users;

pub use auth::CurrentUser;
pub use error::ApiError;
pub use routes::{router, serve, AppState};
pub use types::*;

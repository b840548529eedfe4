//! # taskdeck
//!
//! A task-management backend: users register, authenticate, and manage
//! personal tasks and their subtasks over a JSON API.
//!
//! ## Architecture
//!
//! ```text
//!   API layer (axum)
//!     ├── token verifier (protected routes)
//!     ├── credential store ──┐
//!     └── task repository ───┴── SQLite
//! ```
//!
//! Each request is handled independently; the only shared mutable state is
//! the SQLite store. Tasks and subtasks are visible only to their owning
//! user, enforced by a single ownership gate in the store.
//!
//! ## Modules
//! - `api`: HTTP routes, auth middleware, error mapping
//! - `store`: credential store and task repository over SQLite
//! - `token`: JWT issuing and verification
//! - `password`: PBKDF2 password hashing
//! - `config`: environment configuration

pub mod api;
pub mod config;
pub mod password;
pub mod store;
pub mod token;

pub use config::Config;
pub use store::Store;
pub use token::TokenService;

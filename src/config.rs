//! Configuration management for taskdeck.
//!
//! Configuration can be set via environment variables:
//! - `JWT_SECRET` - Required. Signing secret for session tokens.
//! - `DATABASE_PATH` - Optional. SQLite database file. Defaults to `./taskdeck.db`.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `8000`.
//! - `ACCESS_TOKEN_TTL_MINUTES` - Optional. Login token lifetime. Defaults to `30`.
//! - `ADMIN_TOKEN` - Optional. Bearer credential for the administrative
//!   user endpoints. When unset those endpoints reject every request.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Server configuration, fixed at process start.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Signing secret for session tokens
    pub jwt_secret: String,

    /// Lifetime of tokens issued by the login flow, in minutes
    pub token_ttl_minutes: i64,

    /// Bearer credential for administrative endpoints
    pub admin_token: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `JWT_SECRET` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| ConfigError::MissingEnvVar("JWT_SECRET".to_string()))?;

        let database_path = std::env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./taskdeck.db"));

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let token_ttl_minutes = std::env::var("ACCESS_TOKEN_TTL_MINUTES")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("ACCESS_TOKEN_TTL_MINUTES".to_string(), format!("{}", e))
            })?;

        let admin_token = std::env::var("ADMIN_TOKEN").ok();

        Ok(Self {
            database_path,
            host,
            port,
            jwt_secret,
            token_ttl_minutes,
            admin_token,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(jwt_secret: impl Into<String>, database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            host: "127.0.0.1".to_string(),
            port: 8000,
            jwt_secret: jwt_secret.into(),
            token_ttl_minutes: 30,
            admin_token: None,
        }
    }
}

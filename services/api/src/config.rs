//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_ORACLE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_ORACLE_MODEL: &str = "gemini-2.5-flash";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub gemini_api_key: Option<String>,
    pub oracle_base_url: String,
    pub oracle_model: String,
    pub oracle_timeout: Duration,
    pub user_db_file: PathBuf,
    pub log_file: PathBuf,
    pub session_timeout: Duration,
    pub admin_password: Option<String>,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());
        // Blank values count as unset.
        let optional = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        // --- Load Server Settings ---
        let bind_address_str = var_or("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = var_or("CORS_ORIGIN", "http://localhost:3000");

        // --- Load Oracle Settings ---
        let gemini_api_key = optional("GEMINI_API_KEY");
        let oracle_base_url = var_or("ORACLE_BASE_URL", DEFAULT_ORACLE_BASE_URL);
        let oracle_model = var_or("ORACLE_MODEL", DEFAULT_ORACLE_MODEL);
        let oracle_timeout =
            Duration::from_secs(parse_positive(&var_or("ORACLE_TIMEOUT_SECS", "600"), "ORACLE_TIMEOUT_SECS")?);

        // --- Load Persistence and Session Settings ---
        let user_db_file = PathBuf::from(var_or("USER_DB_FILE", "users.json"));
        let log_file = PathBuf::from(var_or("LOG_FILE", "access_log.txt"));
        let session_timeout = Duration::from_secs(
            60 * parse_positive(&var_or("SESSION_TIMEOUT_MIN", "15"), "SESSION_TIMEOUT_MIN")?,
        );
        let admin_password = optional("ADMIN_PASSWORD");

        Ok(Self {
            bind_address,
            log_level,
            gemini_api_key,
            oracle_base_url,
            oracle_model,
            oracle_timeout,
            user_db_file,
            log_file,
            session_timeout,
            admin_password,
            cors_origin,
        })
    }
}

fn parse_positive(raw: &str, name: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidValue(
            name.to_string(),
            format!("'{}' is not a positive integer", raw),
        )),
    }
}

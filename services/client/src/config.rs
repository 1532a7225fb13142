//! services/client/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub backend_url: String,
    pub log_level: Level,
    pub state_path: PathBuf,
    pub answer_top_k: u32,
    pub summary_top_k: u32,
    pub quiz_count: u32,
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

        // --- Load Backend and Logging Settings ---
        let backend_url = std::env::var("BACKEND_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string());
        let backend_url = backend_url.trim_end_matches('/').to_string();
        if backend_url.is_empty() {
            return Err(ConfigError::InvalidValue(
                "BACKEND_URL".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let state_path = std::env::var("STATE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./assistant_state.json"));

        // --- Load Request Defaults ---
        let answer_top_k = parse_count("ANSWER_TOP_K", 6)?;
        let summary_top_k = parse_count("SUMMARY_TOP_K", 20)?;
        let quiz_count = parse_count("QUIZ_COUNT", 5)?;

        Ok(Self {
            backend_url,
            log_level,
            state_path,
            answer_top_k,
            summary_top_k,
            quiz_count,
        })
    }
}

fn parse_count(var: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidValue(var.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

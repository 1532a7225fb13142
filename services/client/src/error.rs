//! services/client/src/error.rs
//!
//! Defines the primary error type for the entire client service.

use crate::config::ConfigError;
use campus_assistant_core::ports::PortError;

/// The primary error type for the `client` service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents a standard Input/Output error (e.g., reading terminal input).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

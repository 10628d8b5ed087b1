//! Error types for Prompt Gateway

use std::io;

use prompt_gateway_core::StoreError;
use thiserror::Error;

/// Result type alias for Prompt Gateway
pub type Result<T> = std::result::Result<T, Error>;

/// Prompt Gateway errors
///
/// The `Display` text of lifecycle and bind errors is meant to be shown to the
/// user as-is by the embedding application.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The configured port is taken
    #[error("Port {port} is already in use on {host}")]
    AddressInUse {
        /// Host the bind was attempted on
        host: String,
        /// Port that was taken
        port: u16,
    },

    /// Any other bind failure
    #[error("Failed to start server: {0}")]
    Bind(String),

    /// `start` called while running
    #[error("Server is already running")]
    AlreadyRunning,

    /// `stop` called while stopped
    #[error("Server is not running")]
    NotRunning,

    /// Storage lookup failed
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Classify a listener bind failure
    #[must_use]
    pub fn from_bind(err: &io::Error, host: &str, port: u16) -> Self {
        if err.kind() == io::ErrorKind::AddrInUse {
            Self::AddressInUse {
                host: host.to_string(),
                port,
            }
        } else {
            Self::Bind(err.to_string())
        }
    }
}

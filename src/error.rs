//! Error handling types for pkl-lsp-launcher
//!
//! Each subsystem has its own error enum; `LauncherError` is what the binary
//! and the orchestration layer deal in.

use thiserror::Error;

use crate::config::ConfigError;
use crate::distribution::DistributionError;
use crate::install::fetch::FetchError;
use crate::install::maven::RegistryError;
use crate::runtime::RuntimeError;

/// Top-level error type for launcher operations
#[derive(Debug, Error)]
pub enum LauncherError {
    /// Configuration could not be read or parsed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No usable Java runtime
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// No usable pkl-lsp distribution
    #[error(transparent)]
    Distribution(#[from] DistributionError),

    /// Registry query or artifact download failed
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Artifact download failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Spawning or relaying to the language server failed
    #[error("Failed to launch pkl-lsp: {message}")]
    Launch { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for launcher operations
pub type LauncherResult<T> = Result<T, LauncherError>;

impl LauncherError {
    /// Create a launch error
    pub fn launch(message: impl Into<String>) -> Self {
        LauncherError::Launch {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        LauncherError::Internal(message.into())
    }
}

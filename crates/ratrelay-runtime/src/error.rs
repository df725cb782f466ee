//! Runtime error types.

use ratrelay_core::{PersistError, TransportError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while building or running the relay.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The stream target could not be resolved.
    #[error("Invalid stream target: {0}")]
    Transport(#[from] TransportError),

    /// The API client could not be built.
    #[error("Failed to set up API client: {0}")]
    Api(#[from] PersistError),

    /// Registering a shutdown signal handler failed.
    #[error("Failed to listen for shutdown signal: {0}")]
    Signal(#[from] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

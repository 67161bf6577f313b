//! Error types for the registry facade.

use dataroom_core::{ErrorKind, RegistryError};
use dataroom_store::StoreError;
use thiserror::Error;

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A registry operation was rejected or the oracle failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Storage error. Nothing was applied.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Invalid or unreadable configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Registry(e) => e.kind(),
            Error::Store(e) => e.kind(),
            Error::Config(_) => ErrorKind::Config,
        }
    }

    /// The underlying registry error, if this is one.
    pub fn as_registry(&self) -> Option<&RegistryError> {
        match self {
            Error::Registry(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, Error>;

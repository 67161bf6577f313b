//! Error types for registry operations.

use thiserror::Error;

use crate::oracle::OracleError;
use crate::types::{DatasetId, RequestId, Timestamp};

/// Malformed input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("quality score {0} is outside 0..=100")]
    QualityScoreOutOfRange(u8),

    #[error("metadata hash must not be empty")]
    EmptyMetadataHash,

    #[error("topic must not be empty")]
    EmptyTopic,

    #[error("deadline {deadline} is not after current time {now}")]
    DeadlineNotInFuture { deadline: Timestamp, now: Timestamp },

    #[error("Invalid contributor for {0}")]
    InvalidContributor(DatasetId),

    #[error("stale nonce {got}: last accepted is {last}")]
    StaleNonce { got: u64, last: u64 },
}

/// Coarse classification of every failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Authorization,
    NotFound,
    State,
    Oracle,
    Storage,
    Config,
}

/// Errors that abort a registry transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Malformed input.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Caller lacks the required role or relationship.
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// Dataset id outside the allocated range.
    #[error("{0} not found")]
    DatasetNotFound(DatasetId),

    /// Request id outside the allocated range.
    #[error("{0} not found")]
    RequestNotFound(RequestId),

    /// Operation on a deactivated dataset.
    #[error("{0} is inactive")]
    DatasetInactive(DatasetId),

    /// The encryption oracle refused or failed.
    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),
}

impl RegistryError {
    /// Shorthand for the access-denied authorization failure.
    pub fn access_denied() -> Self {
        RegistryError::Unauthorized("Access denied".into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::Validation(_) => ErrorKind::Validation,
            RegistryError::Unauthorized(_) => ErrorKind::Authorization,
            RegistryError::DatasetNotFound(_) | RegistryError::RequestNotFound(_) => {
                ErrorKind::NotFound
            }
            RegistryError::DatasetInactive(_) => ErrorKind::State,
            RegistryError::Oracle(_) => ErrorKind::Oracle,
        }
    }
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

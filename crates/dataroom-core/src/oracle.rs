//! The narrow interface to the confidential-computation collaborator.

use thiserror::Error;

use crate::crypto::Principal;
use crate::handle::{BitWidth, CipherHandle, HandleId};

/// Errors reported by an encryption oracle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// Plaintext does not fit the requested width.
    #[error("plaintext does not fit in {bits} bits")]
    WidthOverflow { bits: u32 },

    /// The oracle does not know this handle.
    #[error("unknown handle: {0:?}")]
    UnknownHandle(HandleId),

    /// The principal may not decrypt this handle.
    #[error("principal {0} may not decrypt this handle")]
    NotAllowed(Principal),

    /// Encryption failed.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Decryption failed.
    #[error("decryption error: {0}")]
    Decryption(String),

    /// The oracle is unavailable.
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

/// Client interface to the external encryption oracle.
///
/// Calls are synchronous and form part of the surrounding registry
/// transaction. A failing call aborts the whole transaction.
pub trait EncryptionOracle: Send + Sync {
    /// Wrap a plaintext integer into a fresh opaque handle.
    ///
    /// Grants no read rights by itself.
    fn wrap(&self, plaintext: u64, width: BitWidth) -> Result<CipherHandle, OracleError>;

    /// Give the registry itself permanent use of the handle.
    fn allow_self(&self, handle: &CipherHandle) -> Result<(), OracleError>;

    /// Give `principal` decryption rights over the handle. Idempotent.
    fn allow_principal(&self, handle: &CipherHandle, principal: &Principal)
        -> Result<(), OracleError>;
}

impl<T: EncryptionOracle + ?Sized> EncryptionOracle for std::sync::Arc<T> {
    fn wrap(&self, plaintext: u64, width: BitWidth) -> Result<CipherHandle, OracleError> {
        (**self).wrap(plaintext, width)
    }

    fn allow_self(&self, handle: &CipherHandle) -> Result<(), OracleError> {
        (**self).allow_self(handle)
    }

    fn allow_principal(
        &self,
        handle: &CipherHandle,
        principal: &Principal,
    ) -> Result<(), OracleError> {
        (**self).allow_principal(handle, principal)
    }
}

//! In-process encryption oracle.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use rand::RngCore;

use dataroom_core::{BitWidth, CipherHandle, EncryptionOracle, HandleId, OracleError, Principal};

use crate::crypto::EncryptionKey;
use crate::envelope::SealedValue;

/// Access list of one handle.
#[derive(Debug, Default)]
struct HandleAcl {
    self_allowed: bool,
    principals: HashSet<Principal>,
}

/// Oracle that seals values under a private master key and keeps
/// decryption rights in memory.
///
/// Thread-safe via RwLock.
pub struct LocalOracle {
    master: EncryptionKey,
    acl: RwLock<HashMap<HandleId, HandleAcl>>,
}

impl LocalOracle {
    /// Create an oracle with a fresh random master key.
    pub fn new() -> Self {
        Self::with_key(EncryptionKey::generate())
    }

    /// Create an oracle with a known master key.
    pub fn with_key(master: EncryptionKey) -> Self {
        Self {
            master,
            acl: RwLock::new(HashMap::new()),
        }
    }

    /// Decrypt a handle on behalf of `principal`.
    ///
    /// Fails unless `principal` was allowed on this exact handle.
    pub fn reveal(&self, handle: &CipherHandle, principal: &Principal) -> Result<u64, OracleError> {
        {
            let acl = self.read_acl()?;
            let entry = acl
                .get(&handle.id)
                .ok_or(OracleError::UnknownHandle(handle.id))?;
            if !entry.principals.contains(principal) {
                return Err(OracleError::NotAllowed(*principal));
            }
        }

        SealedValue::from_bytes(&handle.blob)?.open(&self.handle_key(&handle.id))
    }

    /// Whether `principal` may decrypt the handle.
    pub fn is_allowed(&self, handle: &HandleId, principal: &Principal) -> bool {
        self.read_acl()
            .map(|acl| {
                acl.get(handle)
                    .map(|entry| entry.principals.contains(principal))
                    .unwrap_or(false)
            })
            .unwrap_or(false)
    }

    /// Whether the registry was given use of the handle.
    pub fn is_self_allowed(&self, handle: &HandleId) -> bool {
        self.read_acl()
            .map(|acl| acl.get(handle).map(|e| e.self_allowed).unwrap_or(false))
            .unwrap_or(false)
    }

    /// Number of handles issued so far.
    pub fn handle_count(&self) -> usize {
        self.read_acl().map(|acl| acl.len()).unwrap_or(0)
    }

    fn handle_key(&self, id: &HandleId) -> EncryptionKey {
        self.master.derive(id.as_bytes())
    }

    fn read_acl(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<HandleId, HandleAcl>>, OracleError> {
        self.acl
            .read()
            .map_err(|e| OracleError::Unavailable(format!("acl lock poisoned: {}", e)))
    }

    fn write_acl(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<HandleId, HandleAcl>>, OracleError> {
        self.acl
            .write()
            .map_err(|e| OracleError::Unavailable(format!("acl lock poisoned: {}", e)))
    }
}

impl Default for LocalOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl EncryptionOracle for LocalOracle {
    fn wrap(&self, plaintext: u64, width: BitWidth) -> Result<CipherHandle, OracleError> {
        if !width.fits(plaintext) {
            return Err(OracleError::WidthOverflow { bits: width.bits() });
        }

        // The id is chosen first because it selects the sealing key.
        let mut id_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut id_bytes);
        let id = HandleId::from_bytes(id_bytes);
        let sealed = SealedValue::seal(plaintext, width, &self.handle_key(&id))?;
        let handle = CipherHandle::new(id, width, sealed.to_bytes()?);

        self.write_acl()?.insert(id, HandleAcl::default());
        tracing::debug!(handle = ?id, bits = width.bits(), "wrapped value");

        Ok(handle)
    }

    fn allow_self(&self, handle: &CipherHandle) -> Result<(), OracleError> {
        let mut acl = self.write_acl()?;
        let entry = acl
            .get_mut(&handle.id)
            .ok_or(OracleError::UnknownHandle(handle.id))?;
        entry.self_allowed = true;
        Ok(())
    }

    fn allow_principal(
        &self,
        handle: &CipherHandle,
        principal: &Principal,
    ) -> Result<(), OracleError> {
        let mut acl = self.write_acl()?;
        let entry = acl
            .get_mut(&handle.id)
            .ok_or(OracleError::UnknownHandle(handle.id))?;
        entry.principals.insert(*principal);
        Ok(())
    }
}

//! Sealed value envelope.
//!
//! The blob inside a [`CipherHandle`] issued by [`LocalOracle`] is the CBOR
//! encoding of a [`SealedValue`].
//!
//! [`CipherHandle`]: dataroom_core::CipherHandle
//! [`LocalOracle`]: crate::LocalOracle

use serde::{Deserialize, Serialize};

use dataroom_core::{BitWidth, OracleError};

use crate::crypto::{EncryptionKey, EncryptionNonce};

/// Format identifier for sealed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum EncryptionFormat {
    /// ChaCha20-Poly1305 with a 256-bit key.
    ChaCha20Poly1305 = 1,
}

/// An encrypted integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedValue {
    pub format: EncryptionFormat,
    pub width: BitWidth,
    pub nonce: EncryptionNonce,
    /// Little-endian plaintext, encrypted, with authentication tag.
    pub ciphertext: Vec<u8>,
}

impl SealedValue {
    /// Seal `value` under `key`. The width is authenticated.
    pub fn seal(value: u64, width: BitWidth, key: &EncryptionKey) -> Result<Self, OracleError> {
        if !width.fits(value) {
            return Err(OracleError::WidthOverflow { bits: width.bits() });
        }

        let nonce = EncryptionNonce::generate();
        let ciphertext = key.encrypt(&value.to_le_bytes(), &width_aad(width), &nonce)?;

        Ok(Self {
            format: EncryptionFormat::ChaCha20Poly1305,
            width,
            nonce,
            ciphertext,
        })
    }

    /// Recover the plaintext.
    pub fn open(&self, key: &EncryptionKey) -> Result<u64, OracleError> {
        let bytes = match self.format {
            EncryptionFormat::ChaCha20Poly1305 => {
                key.decrypt(&self.ciphertext, &width_aad(self.width), &self.nonce)?
            }
        };

        let arr: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
            OracleError::Decryption(format!("expected 8 plaintext bytes, got {}", bytes.len()))
        })?;
        Ok(u64::from_le_bytes(arr))
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, OracleError> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| OracleError::Encryption(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, OracleError> {
        ciborium::from_reader(bytes).map_err(|e| OracleError::Decryption(e.to_string()))
    }
}

fn width_aad(width: BitWidth) -> [u8; 1] {
    [width.bits() as u8]
}

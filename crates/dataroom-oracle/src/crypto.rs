//! Symmetric encryption for sealed values.
//!
//! ChaCha20-Poly1305 with keys derived through Blake3.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use dataroom_core::OracleError;

/// A 256-bit symmetric encryption key for ChaCha20-Poly1305.
#[derive(Clone)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Derive a subkey bound to `context`.
    pub fn derive(&self, context: &[u8]) -> EncryptionKey {
        let mut hasher = blake3::Hasher::new_derive_key("dataroom-oracle-v0-subkey");
        hasher.update(&self.0);
        hasher.update(context);
        EncryptionKey(*hasher.finalize().as_bytes())
    }

    /// Encrypt `plaintext`, authenticating `aad` alongside it.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        aad: &[u8],
        nonce: &EncryptionNonce,
    ) -> Result<Vec<u8>, OracleError> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| OracleError::Encryption(e.to_string()))?;

        cipher
            .encrypt(
                Nonce::from_slice(&nonce.0),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|e| OracleError::Encryption(e.to_string()))
    }

    /// Decrypt `ciphertext` produced by [`EncryptionKey::encrypt`].
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        aad: &[u8],
        nonce: &EncryptionNonce,
    ) -> Result<Vec<u8>, OracleError> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| OracleError::Decryption(e.to_string()))?;

        cipher
            .decrypt(
                Nonce::from_slice(&nonce.0),
                Payload {
                    msg: ciphertext,
                    aad,
                },
            )
            .map_err(|e| OracleError::Decryption(e.to_string()))
    }
}

/// A 96-bit nonce for ChaCha20-Poly1305.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionNonce(pub [u8; 12]);

impl EncryptionNonce {
    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; 12];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let key = EncryptionKey::generate();
        let nonce = EncryptionNonce::generate();

        let ciphertext = key.encrypt(b"12345", b"u64", &nonce).unwrap();
        assert_ne!(ciphertext, b"12345");

        let decrypted = key.decrypt(&ciphertext, b"u64", &nonce).unwrap();
        assert_eq!(decrypted, b"12345");
    }

    #[test]
    fn test_wrong_key_or_aad_fails() {
        let key = EncryptionKey::generate();
        let other = EncryptionKey::generate();
        let nonce = EncryptionNonce::generate();

        let ciphertext = key.encrypt(b"secret", b"u8", &nonce).unwrap();

        assert!(other.decrypt(&ciphertext, b"u8", &nonce).is_err());
        assert!(key.decrypt(&ciphertext, b"u64", &nonce).is_err());
    }

    #[test]
    fn test_derivation_separates_contexts() {
        let master = EncryptionKey::from_bytes([0x42; 32]);

        assert_eq!(master.derive(b"a").as_bytes(), master.derive(b"a").as_bytes());
        assert_ne!(master.derive(b"a").as_bytes(), master.derive(b"b").as_bytes());
    }
}

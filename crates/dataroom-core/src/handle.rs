//! Opaque ciphertext handles.
//!
//! A handle is a capability token issued by the encryption oracle: an
//! identifier plus an opaque blob. The registry stores, copies and forwards
//! handles but never looks inside the blob.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a ciphertext handle, chosen by the oracle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandleId(pub [u8; 32]);

impl HandleId {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HandleId({})", &self.to_hex()[..16])
    }
}

/// Width of the plaintext integer behind a handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitWidth {
    U8,
    U16,
    U32,
    U64,
}

impl BitWidth {
    /// Number of bits.
    pub const fn bits(&self) -> u32 {
        match self {
            BitWidth::U8 => 8,
            BitWidth::U16 => 16,
            BitWidth::U32 => 32,
            BitWidth::U64 => 64,
        }
    }

    /// Largest plaintext representable at this width.
    pub const fn max_value(&self) -> u64 {
        match self {
            BitWidth::U8 => u8::MAX as u64,
            BitWidth::U16 => u16::MAX as u64,
            BitWidth::U32 => u32::MAX as u64,
            BitWidth::U64 => u64::MAX,
        }
    }

    /// Whether `value` fits in this width.
    pub const fn fits(&self, value: u64) -> bool {
        value <= self.max_value()
    }
}

/// An opaque ciphertext handle.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherHandle {
    /// Oracle-assigned identifier.
    pub id: HandleId,
    /// Declared plaintext width.
    pub width: BitWidth,
    /// Oracle-private contents.
    pub blob: Bytes,
}

impl CipherHandle {
    /// Assemble a handle. Only oracles should call this.
    pub fn new(id: HandleId, width: BitWidth, blob: impl Into<Bytes>) -> Self {
        Self {
            id,
            width,
            blob: blob.into(),
        }
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ciborium::ser::Error<std::io::Error>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ciborium::de::Error<std::io::Error>> {
        ciborium::from_reader(bytes)
    }
}

impl fmt::Debug for CipherHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The blob is deliberately left out.
        f.debug_struct("CipherHandle")
            .field("id", &self.id)
            .field("width", &self.width)
            .finish_non_exhaustive()
    }
}

//! # Dataroom Oracle
//!
//! An in-process implementation of the confidential-computation
//! collaborator behind [`EncryptionOracle`].
//!
//! ## Overview
//!
//! The registry itself never decrypts anything. It asks an oracle to turn a
//! plaintext into an opaque [`CipherHandle`] and to record who may decrypt
//! it. [`LocalOracle`] does this with ChaCha20-Poly1305 under a per-oracle
//! master key and an access list per handle; it is meant for tests, local
//! development and as a model for networked oracles.
//!
//! ## Usage
//!
//! ```rust
//! use dataroom_core::{BitWidth, EncryptionOracle, Keypair};
//! use dataroom_oracle::LocalOracle;
//!
//! let oracle = LocalOracle::new();
//! let reader = Keypair::generate().principal();
//!
//! let handle = oracle.wrap(42, BitWidth::U64).unwrap();
//! oracle.allow_self(&handle).unwrap();
//! oracle.allow_principal(&handle, &reader).unwrap();
//!
//! assert_eq!(oracle.reveal(&handle, &reader).unwrap(), 42);
//! ```
//!
//! [`EncryptionOracle`]: dataroom_core::EncryptionOracle
//! [`CipherHandle`]: dataroom_core::CipherHandle

pub mod crypto;
pub mod envelope;
pub mod local;

pub use crypto::{EncryptionKey, EncryptionNonce};
pub use envelope::{EncryptionFormat, SealedValue};
pub use local::LocalOracle;

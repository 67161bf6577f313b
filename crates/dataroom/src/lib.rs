//! # Dataroom
//!
//! A registry for confidential data sharing: contributors register
//! encrypted datasets, grant read access to other principals, respond to
//! data requests and receive confidential rewards from a platform
//! authority.
//!
//! ## Overview
//!
//! - **Datasets**: an encrypted value and quality score, plus public metadata
//! - **Grants**: per-dataset read rights, issued by the contributor or the authority
//! - **Requests**: solicitations for data with an encrypted budget
//! - **Rewards**: encrypted amounts recorded against a contributor
//! - **Authority**: a single privileged principal fixed at first start
//!
//! Plaintext values never live in the registry. They are wrapped into
//! opaque handles by an [`EncryptionOracle`](core::EncryptionOracle), which
//! also keeps the decryption rights.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dataroom::{Registry, RegistryConfig, SystemClock};
//! use dataroom::core::Keypair;
//! use dataroom::oracle::LocalOracle;
//! use dataroom::store::SqliteStore;
//!
//! async fn example() {
//!     let authority = Keypair::generate().principal();
//!     let contributor = Keypair::generate().principal();
//!
//!     let store = SqliteStore::open("dataroom.db").unwrap();
//!     let registry = Registry::open(
//!         store,
//!         LocalOracle::new(),
//!         SystemClock,
//!         RegistryConfig::default(),
//!         authority,
//!     )
//!     .await
//!     .unwrap();
//!
//!     let id = registry
//!         .contribute_data(contributor, 12345, 85, "QmHash", true)
//!         .await
//!         .unwrap();
//!     let info = registry.access_dataset(id, &contributor).await.unwrap();
//!     assert_eq!(info.access_count, 0);
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `dataroom::core` - Records, ids, events, errors, the oracle trait
//! - `dataroom::engine` - Registry state and transaction staging
//! - `dataroom::oracle` - In-process encryption oracle
//! - `dataroom::store` - Storage abstraction and SQLite

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod registry;

// Re-export component crates
pub use dataroom_core as core;
pub use dataroom_engine as engine;
pub use dataroom_oracle as oracle;
pub use dataroom_store as store;

// Re-export main types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{RegistryConfig, StorageConfig};
pub use error::{Error, Result};
pub use events::EventBus;
pub use registry::Registry;

// Re-export commonly used core types
pub use dataroom_core::{
    Command, DatasetAccess, DatasetId, DatasetView, ErrorKind, EventRecord, Keypair, Outcome,
    PlatformStats, Principal, RegistryError, RegistryEvent, RequestId, RequestView,
    SignedCommand, Timestamp,
};

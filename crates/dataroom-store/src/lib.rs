//! # Dataroom Store
//!
//! Persistence for the Dataroom registry. Provides a trait-based interface
//! with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The registry keeps its working state in memory and writes through the
//! [`Store`] trait. At startup it loads a [`Snapshot`]; afterwards every
//! committed transaction is handed over as one [`ChangeSet`], which the store
//! must apply all-or-nothing together with the events it carries.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dataroom_store::{SqliteStore, Store};
//!
//! async fn example() {
//!     // Open a SQLite database
//!     let store = SqliteStore::open("registry.db").unwrap();
//!
//!     // Or use an in-memory database for testing
//!     let store = SqliteStore::open_memory().unwrap();
//!
//!     let snapshot = store.load_snapshot().await.unwrap();
//!     assert_eq!(snapshot.next_dataset_id, 1);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Atomic commits**: a change set is applied in one database transaction
//! - **Append-only event log**: events get a store-assigned sequence number
//! - **Immutable columns**: replacing a dataset only rewrites the fields that
//!   may change (quality handle, access count, active flag)
//!
//! [`Snapshot`]: dataroom_core::Snapshot
//! [`ChangeSet`]: dataroom_core::ChangeSet

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::Store;

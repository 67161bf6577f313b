//! # Dataroom Engine
//!
//! The registry state and the operations that change it.
//!
//! ## Overview
//!
//! [`RegistryState`] holds every record in memory: datasets, grants,
//! requests, rewards and the two id counters. It is only ever changed by
//! [`RegistryState::apply`], which takes a [`ChangeSet`] and cannot fail.
//!
//! Operations run inside a [`Transaction`], which borrows the state
//! immutably. Each operation checks its guards, calls the encryption oracle,
//! and queues mutations and events. Because the state is borrowed shared
//! for the whole transaction, an error at any point leaves nothing behind.
//!
//! Several operations may share one transaction. Each one reads the writes
//! staged by those before it, so the result matches committing them one at
//! a time.
//!
//! ## Components
//!
//! - [`sequence`] - Id allocation for datasets and requests
//! - [`authority`] - The platform authority and role guards
//! - [`datasets`] - Contribution, rescoring and deactivation
//! - [`access`] - Grants and read authorization
//! - [`requests`] - Data access requests
//! - [`rewards`] - Reward bookkeeping
//! - [`stats`] - Read-only rollups
//! - [`commands`] - Signed command dispatch
//!
//! ## Usage
//!
//! ```rust
//! use dataroom_core::{Keypair, Timestamp};
//! use dataroom_engine::{RegistryState, Transaction};
//! use dataroom_oracle::LocalOracle;
//!
//! let authority = Keypair::generate().principal();
//! let contributor = Keypair::generate().principal();
//! let oracle = LocalOracle::new();
//!
//! let mut state = RegistryState::genesis(authority);
//!
//! let mut tx = Transaction::new(&state, &oracle, Timestamp(1_700_000_000));
//! let id = tx.contribute(contributor, 12345, 85, "QmHash", true).unwrap();
//! let changes = tx.into_changes();
//!
//! state.apply(&changes);
//! assert_eq!(state.dataset_info(id).unwrap().access_count, 0);
//! ```
//!
//! [`ChangeSet`]: dataroom_core::ChangeSet

pub mod access;
pub mod authority;
pub mod commands;
pub mod datasets;
pub mod requests;
pub mod rewards;
pub mod sequence;
pub mod state;
pub mod stats;
pub mod txn;

pub use sequence::SequenceAllocator;
pub use state::{ArenaGap, RegistryState};
pub use txn::Transaction;

/// Widths used when wrapping plaintexts.
pub mod widths {
    use dataroom_core::BitWidth;

    pub const DATASET_VALUE: BitWidth = BitWidth::U64;
    pub const QUALITY_SCORE: BitWidth = BitWidth::U8;
    pub const REQUEST_BUDGET: BitWidth = BitWidth::U64;
    pub const REWARD_AMOUNT: BitWidth = BitWidth::U64;
}

//! Store trait: the abstract interface for registry persistence.
//!
//! This trait allows the registry to be storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use std::sync::Arc;

use async_trait::async_trait;
use dataroom_core::{ChangeSet, EventRecord, Snapshot};

use crate::error::Result;

/// The Store trait: async interface for registry persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
#[async_trait]
pub trait Store: Send + Sync {
    /// Load everything persisted so far.
    ///
    /// An empty store yields [`Snapshot::default`]: no authority and both
    /// counters at 1.
    async fn load_snapshot(&self) -> Result<Snapshot>;

    /// Apply every mutation of `changes` and append its events to the log.
    ///
    /// Either all of it becomes durable or none of it does. Returns the
    /// appended log records, in emission order.
    async fn commit(&self, changes: &ChangeSet) -> Result<Vec<EventRecord>>;

    /// Logged events with `seq > after_seq`, ordered by seq.
    async fn events_since(&self, after_seq: u64) -> Result<Vec<EventRecord>>;
}

#[async_trait]
impl<S: Store + ?Sized> Store for Arc<S> {
    async fn load_snapshot(&self) -> Result<Snapshot> {
        (**self).load_snapshot().await
    }

    async fn commit(&self, changes: &ChangeSet) -> Result<Vec<EventRecord>> {
        (**self).commit(changes).await
    }

    async fn events_since(&self, after_seq: u64) -> Result<Vec<EventRecord>> {
        (**self).events_since(after_seq).await
    }
}

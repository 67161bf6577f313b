//! Write sets and snapshots.
//!
//! A transaction never mutates registry state while it runs. It records the
//! writes it wants as [`Mutation`]s in a [`ChangeSet`]; the state and the
//! store apply the whole set only once every check has passed.

use crate::crypto::Principal;
use crate::event::RegistryEvent;
use crate::records::{Contribution, DataRequest, Dataset};
use crate::types::{DatasetId, SequenceKind, Timestamp};

/// A single write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Fix the platform authority. Only ever written once.
    SetAuthority(Principal),

    /// Advance a named id counter by exactly one.
    AdvanceSequence(SequenceKind),

    /// Insert a new dataset or replace an existing one with the same id.
    PutDataset(Dataset),

    /// Set the grant relation `(dataset_id, grantee)` to true.
    PutGrant {
        dataset_id: DatasetId,
        grantee: Principal,
    },

    /// Insert a new data request.
    PutRequest(DataRequest),

    /// Append a reward record to a contributor's list.
    AppendContribution {
        contributor: Principal,
        contribution: Contribution,
    },

    /// Record the last accepted command nonce of a principal.
    SetNonce { principal: Principal, nonce: u64 },
}

/// Everything one transaction commits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Commit time.
    pub at: Timestamp,
    /// Writes, in the order they must be applied.
    pub mutations: Vec<Mutation>,
    /// Events to publish after the writes are durable.
    pub events: Vec<RegistryEvent>,
}

impl ChangeSet {
    /// An empty change set stamped with `at`.
    pub fn new(at: Timestamp) -> Self {
        Self {
            at,
            mutations: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Queue a write.
    pub fn push(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }

    /// Queue an event.
    pub fn emit(&mut self, event: RegistryEvent) {
        self.events.push(event);
    }

    /// Whether the transaction changes nothing.
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty() && self.events.is_empty()
    }
}

/// Complete persisted registry contents, as loaded at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub authority: Option<Principal>,
    pub next_dataset_id: u64,
    pub next_request_id: u64,
    /// Ordered by id.
    pub datasets: Vec<Dataset>,
    /// In first-grant order.
    pub grants: Vec<(DatasetId, Principal)>,
    /// Ordered by id.
    pub requests: Vec<DataRequest>,
    /// In insertion order.
    pub contributions: Vec<(Principal, Contribution)>,
    pub nonces: Vec<(Principal, u64)>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            authority: None,
            next_dataset_id: 1,
            next_request_id: 1,
            datasets: Vec::new(),
            grants: Vec::new(),
            requests: Vec::new(),
            contributions: Vec::new(),
            nonces: Vec::new(),
        }
    }
}

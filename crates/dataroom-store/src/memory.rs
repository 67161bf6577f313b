//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;

use dataroom_core::{
    ChangeSet, Contribution, DataRequest, Dataset, DatasetId, EventRecord, Mutation, Principal,
    RequestId, SequenceKind, Snapshot,
};

use crate::error::{Result, StoreError};
use crate::traits::Store;

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

struct MemoryStoreInner {
    authority: Option<Principal>,

    /// Next id per counter.
    sequences: HashMap<SequenceKind, u64>,

    datasets: BTreeMap<DatasetId, Dataset>,

    /// Grants in first-grant order, with a set for dedup.
    grants: Vec<(DatasetId, Principal)>,
    grant_keys: HashSet<(DatasetId, Principal)>,

    requests: BTreeMap<RequestId, DataRequest>,

    /// Reward records in insertion order.
    contributions: Vec<(Principal, Contribution)>,

    nonces: HashMap<Principal, u64>,

    /// Event log; `events[i].seq == i + 1`.
    events: Vec<EventRecord>,
}

impl MemoryStoreInner {
    fn apply(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::SetAuthority(principal) => {
                self.authority.get_or_insert(*principal);
            }
            Mutation::AdvanceSequence(kind) => {
                *self.sequences.entry(*kind).or_insert(1) += 1;
            }
            Mutation::PutDataset(dataset) => {
                self.datasets.insert(dataset.id, dataset.clone());
            }
            Mutation::PutGrant {
                dataset_id,
                grantee,
            } => {
                if self.grant_keys.insert((*dataset_id, *grantee)) {
                    self.grants.push((*dataset_id, *grantee));
                }
            }
            Mutation::PutRequest(request) => {
                self.requests.insert(request.id, request.clone());
            }
            Mutation::AppendContribution {
                contributor,
                contribution,
            } => {
                self.contributions.push((*contributor, contribution.clone()));
            }
            Mutation::SetNonce { principal, nonce } => {
                self.nonces.insert(*principal, *nonce);
            }
        }
    }

    fn next_id(&self, kind: SequenceKind) -> u64 {
        self.sequences.get(&kind).copied().unwrap_or(1)
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner {
                authority: None,
                sequences: HashMap::new(),
                datasets: BTreeMap::new(),
                grants: Vec::new(),
                grant_keys: HashSet::new(),
                requests: BTreeMap::new(),
                contributions: Vec::new(),
                nonces: HashMap::new(),
                events: Vec::new(),
            }),
        }
    }

    /// Number of logged events.
    pub fn event_count(&self) -> usize {
        self.inner.read().map(|inner| inner.events.len()).unwrap_or(0)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned(e: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable(format!("lock poisoned: {}", e))
}

#[async_trait]
impl Store for MemoryStore {
    async fn load_snapshot(&self) -> Result<Snapshot> {
        let inner = self.inner.read().map_err(poisoned)?;

        let mut nonces: Vec<(Principal, u64)> =
            inner.nonces.iter().map(|(p, n)| (*p, *n)).collect();
        nonces.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

        Ok(Snapshot {
            authority: inner.authority,
            next_dataset_id: inner.next_id(SequenceKind::Dataset),
            next_request_id: inner.next_id(SequenceKind::Request),
            datasets: inner.datasets.values().cloned().collect(),
            grants: inner.grants.clone(),
            requests: inner.requests.values().cloned().collect(),
            contributions: inner.contributions.clone(),
            nonces,
        })
    }

    async fn commit(&self, changes: &ChangeSet) -> Result<Vec<EventRecord>> {
        let mut inner = self.inner.write().map_err(poisoned)?;

        for mutation in &changes.mutations {
            inner.apply(mutation);
        }

        let first = inner.events.len();
        for event in &changes.events {
            let seq = inner.events.len() as u64 + 1;
            inner.events.push(EventRecord {
                seq,
                at: changes.at,
                event: event.clone(),
            });
        }

        tracing::debug!(
            mutations = changes.mutations.len(),
            events = changes.events.len(),
            "memory store commit"
        );
        Ok(inner.events[first..].to_vec())
    }

    async fn events_since(&self, after_seq: u64) -> Result<Vec<EventRecord>> {
        let inner = self.inner.read().map_err(poisoned)?;
        let start = usize::try_from(after_seq)
            .unwrap_or(usize::MAX)
            .min(inner.events.len());
        Ok(inner.events[start..].to_vec())
    }
}

//! In-memory registry state.
//!
//! Records live in arenas indexed by their sequential id. Indexes by
//! contributor and by grantee are kept alongside so reads never scan.

use std::collections::{HashMap, HashSet};
use std::fmt;

use dataroom_core::{
    ChangeSet, Contribution, DataRequest, Dataset, DatasetId, Mutation, Principal, RequestId,
    SequenceKind, Snapshot,
};

use crate::sequence::SequenceAllocator;

/// Complete registry state.
#[derive(Debug, Clone, Default)]
pub struct RegistryState {
    /// The platform authority, fixed once at initialization.
    pub(crate) authority: Option<Principal>,

    /// Id counters.
    pub(crate) sequences: SequenceAllocator,

    /// Dataset arena: `datasets[id - 1]`.
    pub(crate) datasets: Vec<Dataset>,

    /// Grant relation.
    pub(crate) grants: HashSet<(DatasetId, Principal)>,

    /// Index: dataset -> distinct grantees in first-grant order.
    pub(crate) grantees: HashMap<DatasetId, Vec<Principal>>,

    /// Request arena: `requests[id - 1]`.
    pub(crate) requests: Vec<DataRequest>,

    /// Index: contributor -> their dataset ids in creation order.
    pub(crate) by_contributor: HashMap<Principal, Vec<DatasetId>>,

    /// Reward records per contributor in insertion order.
    pub(crate) rewards: HashMap<Principal, Vec<Contribution>>,

    /// Last accepted command nonce per principal.
    pub(crate) nonces: HashMap<Principal, u64>,
}

/// A record whose id does not follow the records already held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaGap {
    pub kind: SequenceKind,
    pub id: u64,
    pub len: usize,
}

impl fmt::Display for ArenaGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} id {} cannot follow {} stored records",
            self.kind, self.id, self.len
        )
    }
}

impl std::error::Error for ArenaGap {}

impl RegistryState {
    /// Create an empty state with no authority.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty state owned by `authority`.
    pub fn genesis(authority: Principal) -> Self {
        Self {
            authority: Some(authority),
            ..Self::default()
        }
    }

    /// Rebuild state from persisted contents.
    ///
    /// Fails if the datasets or requests are not numbered `1..=n` in order.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, ArenaGap> {
        let mut state = Self {
            authority: snapshot.authority,
            sequences: SequenceAllocator::restore(
                snapshot.next_dataset_id,
                snapshot.next_request_id,
            ),
            ..Self::default()
        };

        for dataset in snapshot.datasets {
            state.put_dataset(dataset)?;
        }
        for (dataset_id, grantee) in snapshot.grants {
            state.put_grant(dataset_id, grantee);
        }
        for request in snapshot.requests {
            state.put_request(request)?;
        }
        for (contributor, contribution) in snapshot.contributions {
            state.rewards.entry(contributor).or_default().push(contribution);
        }
        state.nonces = snapshot.nonces.into_iter().collect();

        Ok(state)
    }

    /// Apply a committed change set.
    pub fn apply(&mut self, changes: &ChangeSet) {
        for mutation in &changes.mutations {
            self.apply_mutation(mutation);
        }
    }

    /// Apply a single write.
    ///
    /// A dataset or request that would leave a gap in its arena is dropped
    /// and logged; debug builds panic instead.
    pub fn apply_mutation(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::SetAuthority(principal) => {
                if self.authority.is_none() {
                    self.authority = Some(*principal);
                }
            }
            Mutation::AdvanceSequence(kind) => {
                self.sequences.next(*kind);
            }
            Mutation::PutDataset(dataset) => {
                let placed = self.put_dataset(dataset.clone());
                if let Err(gap) = &placed {
                    tracing::error!(%gap, "dropping dataset");
                }
                debug_assert!(placed.is_ok(), "dropping dataset: {placed:?}");
            }
            Mutation::PutGrant {
                dataset_id,
                grantee,
            } => self.put_grant(*dataset_id, *grantee),
            Mutation::PutRequest(request) => {
                let placed = self.put_request(request.clone());
                if let Err(gap) = &placed {
                    tracing::error!(%gap, "dropping request");
                }
                debug_assert!(placed.is_ok(), "dropping request: {placed:?}");
            }
            Mutation::AppendContribution {
                contributor,
                contribution,
            } => {
                self.rewards
                    .entry(*contributor)
                    .or_default()
                    .push(contribution.clone());
            }
            Mutation::SetNonce { principal, nonce } => {
                self.nonces.insert(*principal, *nonce);
            }
        }
    }

    /// Look up a dataset by id.
    pub fn dataset(&self, id: DatasetId) -> Option<&Dataset> {
        arena_index(id.0).and_then(|i| self.datasets.get(i))
    }

    /// Look up a request by id.
    pub fn request(&self, id: RequestId) -> Option<&DataRequest> {
        arena_index(id.0).and_then(|i| self.requests.get(i))
    }

    /// The id counters.
    pub fn sequences(&self) -> &SequenceAllocator {
        &self.sequences
    }

    /// The last accepted command nonce of `principal` (0 if none).
    pub fn last_nonce(&self, principal: &Principal) -> u64 {
        self.nonces.get(principal).copied().unwrap_or(0)
    }

    /// Whether the dataset id has been allocated.
    pub fn dataset_in_range(&self, id: DatasetId) -> bool {
        self.sequences.contains(SequenceKind::Dataset, id.0)
    }

    fn put_dataset(&mut self, dataset: Dataset) -> Result<(), ArenaGap> {
        let index = arena_slot(SequenceKind::Dataset, dataset.id.0, self.datasets.len())?;

        if index < self.datasets.len() {
            self.datasets[index] = dataset;
        } else {
            self.by_contributor
                .entry(dataset.contributor)
                .or_default()
                .push(dataset.id);
            self.datasets.push(dataset);
        }
        Ok(())
    }

    fn put_grant(&mut self, dataset_id: DatasetId, grantee: Principal) {
        if self.grants.insert((dataset_id, grantee)) {
            self.grantees.entry(dataset_id).or_default().push(grantee);
        }
    }

    fn put_request(&mut self, request: DataRequest) -> Result<(), ArenaGap> {
        let index = arena_slot(SequenceKind::Request, request.id.0, self.requests.len())?;

        if index < self.requests.len() {
            self.requests[index] = request;
        } else {
            self.requests.push(request);
        }
        Ok(())
    }
}

/// Where a record with `id` goes in an arena of `len` records.
fn arena_slot(kind: SequenceKind, id: u64, len: usize) -> Result<usize, ArenaGap> {
    match arena_index(id) {
        Some(index) if index <= len => Ok(index),
        _ => Err(ArenaGap { kind, id, len }),
    }
}

fn arena_index(id: u64) -> Option<usize> {
    id.checked_sub(1).and_then(|i| usize::try_from(i).ok())
}

//! Transaction staging.
//!
//! A [`Transaction`] borrows the registry state immutably, so nothing an
//! operation does can leak into the state before the caller applies the
//! resulting [`ChangeSet`].
//!
//! Several operations may be staged in one transaction. Every staged write
//! is also kept in an overlay, and reads inside the transaction consult the
//! overlay before the borrowed state, so later operations see earlier ones.

use std::collections::HashMap;

use dataroom_core::{
    BitWidth, ChangeSet, CipherHandle, Dataset, DatasetId, EncryptionOracle, Mutation, Principal,
    RegistryError, RegistryEvent, Result, SequenceKind, Timestamp,
};

use crate::authority;
use crate::state::RegistryState;

/// Writes staged so far that later operations in the same transaction read.
#[derive(Debug, Default)]
struct Staged {
    authority: Option<Principal>,
    datasets: HashMap<DatasetId, Dataset>,
    /// Grantees new in this transaction, in grant order.
    grantees: HashMap<DatasetId, Vec<Principal>>,
    nonces: HashMap<Principal, u64>,
}

/// One atomic registry transaction in progress.
pub struct Transaction<'a, O: EncryptionOracle + ?Sized> {
    pub(crate) state: &'a RegistryState,
    pub(crate) oracle: &'a O,
    pub(crate) now: Timestamp,
    pub(crate) propagate_grants_on_rescore: bool,
    changes: ChangeSet,
    allocated: HashMap<SequenceKind, u64>,
    staged: Staged,
}

impl<'a, O: EncryptionOracle + ?Sized> Transaction<'a, O> {
    /// Start a transaction at time `now`.
    pub fn new(state: &'a RegistryState, oracle: &'a O, now: Timestamp) -> Self {
        Self {
            state,
            oracle,
            now,
            propagate_grants_on_rescore: true,
            changes: ChangeSet::new(now),
            allocated: HashMap::new(),
            staged: Staged::default(),
        }
    }

    /// Whether rescoring re-issues read rights on the new quality handle
    /// to the contributor and every existing grantee.
    pub fn with_grant_propagation(mut self, enabled: bool) -> Self {
        self.propagate_grants_on_rescore = enabled;
        self
    }

    /// The transaction timestamp.
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// The state this transaction started from.
    pub fn state(&self) -> &RegistryState {
        self.state
    }

    /// Finish staging and hand back the writes.
    pub fn into_changes(self) -> ChangeSet {
        self.changes
    }

    /// Allocate the next id of `kind`.
    ///
    /// The counter only advances if the change set is applied.
    pub(crate) fn allocate(&mut self, kind: SequenceKind) -> u64 {
        let pending = self.allocated.entry(kind).or_insert(0);
        let id = self.state.sequences.peek(kind) + *pending;
        *pending += 1;
        self.changes.push(Mutation::AdvanceSequence(kind));
        id
    }

    pub(crate) fn push(&mut self, mutation: Mutation) {
        match &mutation {
            Mutation::SetAuthority(principal) => {
                if self.authority().is_none() {
                    self.staged.authority = Some(*principal);
                }
            }
            Mutation::PutDataset(dataset) => {
                self.staged.datasets.insert(dataset.id, dataset.clone());
            }
            Mutation::PutGrant {
                dataset_id,
                grantee,
            } => {
                if !self.has_access(*dataset_id, grantee) {
                    self.staged
                        .grantees
                        .entry(*dataset_id)
                        .or_default()
                        .push(*grantee);
                }
            }
            Mutation::SetNonce { principal, nonce } => {
                self.staged.nonces.insert(*principal, *nonce);
            }
            Mutation::AdvanceSequence(_)
            | Mutation::PutRequest(_)
            | Mutation::AppendContribution { .. } => {}
        }
        self.changes.push(mutation);
    }

    pub(crate) fn emit(&mut self, event: RegistryEvent) {
        self.changes.emit(event);
    }

    /// Wrap a plaintext, keep use of it for the registry, and let `readers`
    /// decrypt it.
    pub(crate) fn seal(
        &self,
        plaintext: u64,
        width: BitWidth,
        readers: &[Principal],
    ) -> Result<CipherHandle> {
        let handle = self.oracle.wrap(plaintext, width)?;
        self.oracle.allow_self(&handle)?;
        for reader in readers {
            self.oracle.allow_principal(&handle, reader)?;
        }
        Ok(handle)
    }

    /// Let `principal` decrypt every given handle.
    pub(crate) fn share(&self, handles: &[&CipherHandle], principal: &Principal) -> Result<()> {
        for handle in handles {
            self.oracle.allow_principal(handle, principal)?;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads through the staged writes
    // ─────────────────────────────────────────────────────────────────────────

    /// The platform authority, including one set earlier in this transaction.
    pub fn authority(&self) -> Option<Principal> {
        self.state.authority().or(self.staged.authority)
    }

    /// A dataset as this transaction currently sees it.
    pub fn dataset(&self, id: DatasetId) -> Option<&Dataset> {
        self.staged
            .datasets
            .get(&id)
            .or_else(|| self.state.dataset(id))
    }

    /// Whether `principal` holds a grant, committed or staged.
    pub fn has_access(&self, dataset_id: DatasetId, principal: &Principal) -> bool {
        self.state.has_access(dataset_id, principal)
            || self
                .staged
                .grantees
                .get(&dataset_id)
                .is_some_and(|staged| staged.contains(principal))
    }

    /// Distinct grantees in first-grant order, committed ones first.
    pub fn grantees(&self, dataset_id: DatasetId) -> Vec<Principal> {
        let mut grantees = self.state.grantees(dataset_id).to_vec();
        if let Some(staged) = self.staged.grantees.get(&dataset_id) {
            grantees.extend_from_slice(staged);
        }
        grantees
    }

    /// Highest nonce accepted from `principal`, including this transaction.
    pub fn last_nonce(&self, principal: &Principal) -> u64 {
        self.staged
            .nonces
            .get(principal)
            .copied()
            .unwrap_or_else(|| self.state.last_nonce(principal))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Guards
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) fn require_authority(&self, caller: &Principal) -> Result<()> {
        authority::require_authority(self.authority(), caller)
    }

    pub(crate) fn require_contributor_or_authority(
        &self,
        dataset: &Dataset,
        caller: &Principal,
    ) -> Result<()> {
        authority::require_contributor_or_authority(self.authority(), dataset, caller)
    }

    /// The dataset must have been allocated.
    pub(crate) fn existing_dataset(&self, id: DatasetId) -> Result<Dataset> {
        self.dataset(id)
            .cloned()
            .ok_or(RegistryError::DatasetNotFound(id))
    }

    /// The dataset must exist and still be active.
    pub(crate) fn valid_dataset(&self, id: DatasetId) -> Result<Dataset> {
        let dataset = self.existing_dataset(id)?;
        require_active(&dataset)?;
        Ok(dataset)
    }
}

/// The dataset must have been allocated.
pub(crate) fn existing_dataset(state: &RegistryState, id: DatasetId) -> Result<&Dataset> {
    state.dataset(id).ok_or(RegistryError::DatasetNotFound(id))
}

/// The dataset must exist and still be active.
pub(crate) fn valid_dataset(state: &RegistryState, id: DatasetId) -> Result<&Dataset> {
    let dataset = existing_dataset(state, id)?;
    require_active(dataset)?;
    Ok(dataset)
}

fn require_active(dataset: &Dataset) -> Result<()> {
    if dataset.is_active {
        Ok(())
    } else {
        Err(RegistryError::DatasetInactive(dataset.id))
    }
}

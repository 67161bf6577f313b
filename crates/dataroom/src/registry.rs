//! The Registry: unified async API for the dataroom.
//!
//! Every mutating call is one transaction. It is staged against the current
//! state, persisted through the store, applied in memory and only then
//! announced to subscribers. Writers are serialized; readers never see a
//! staged change.

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex, RwLock};

use dataroom_core::{
    ContributionView, DatasetAccess, DatasetId, DatasetView, EncryptionOracle, EventRecord,
    Outcome, PlatformStats, Principal, RequestId, RequestView, SealedHandles, SignedCommand,
    Timestamp,
};
use dataroom_engine::{RegistryState, Transaction};
use dataroom_store::{SqliteStore, Store, StoreError};

use crate::clock::{Clock, SystemClock};
use crate::config::RegistryConfig;
use crate::error::Result;
use crate::events::EventBus;

/// The main Registry struct.
///
/// Provides a unified API for:
/// - Contributing, rescoring and deactivating datasets
/// - Granting and checking access
/// - Submitting data requests
/// - Recording rewards
/// - Running signed commands
/// - Following the event log
pub struct Registry<S: Store, O: EncryptionOracle, C: Clock = SystemClock> {
    /// The storage backend.
    store: Arc<S>,
    /// The confidential-computation collaborator.
    oracle: O,
    clock: C,
    config: RegistryConfig,
    /// In-memory state, mirrors the store.
    state: RwLock<RegistryState>,
    /// Held for the whole of each write transaction.
    writer: Mutex<()>,
    events: EventBus,
}

impl<S: Store, O: EncryptionOracle, C: Clock> Registry<S, O, C> {
    /// Open a registry over `store`.
    ///
    /// Loads the persisted state. If no authority has been recorded yet,
    /// `initializer` becomes the authority in a genesis commit; an existing
    /// authority is kept.
    pub async fn open(
        store: S,
        oracle: O,
        clock: C,
        config: RegistryConfig,
        initializer: Principal,
    ) -> Result<Self> {
        config.validate()?;

        let snapshot = store.load_snapshot().await?;
        let state = RegistryState::from_snapshot(snapshot)
            .map_err(|gap| StoreError::InvalidData(gap.to_string()))?;
        let events = EventBus::new(config.event_buffer);

        let registry = Self {
            store: Arc::new(store),
            oracle,
            clock,
            config,
            state: RwLock::new(state),
            writer: Mutex::new(()),
            events,
        };

        let existing = registry.state.read().await.authority();
        match existing {
            Some(authority) => {
                tracing::info!(
                    authority = %authority.short(),
                    "registry opened with persisted authority"
                );
            }
            None => {
                registry
                    .transact("initialize_authority", &initializer, |tx| {
                        tx.initialize_authority(initializer)
                    })
                    .await?;
            }
        }

        Ok(registry)
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the oracle reference.
    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transactions
    // ─────────────────────────────────────────────────────────────────────────

    /// Stage `f`, then persist, apply and publish its changes.
    ///
    /// Nothing is applied or published if staging or persistence fails.
    async fn transact<T, F>(&self, operation: &'static str, caller: &Principal, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction<'_, O>) -> dataroom_core::Result<T>,
    {
        let _writer = self.writer.lock().await;

        let (value, changes) = {
            let state = self.state.read().await;
            let mut tx = Transaction::new(&state, &self.oracle, self.clock.now())
                .with_grant_propagation(self.config.propagate_grants_on_rescore);

            match f(&mut tx) {
                Ok(value) => (value, tx.into_changes()),
                Err(e) => {
                    tracing::warn!(
                        operation,
                        caller = %caller.short(),
                        kind = ?e.kind(),
                        error = %e,
                        "transaction aborted"
                    );
                    return Err(e.into());
                }
            }
        };

        let records = match self.store.commit(&changes).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    operation,
                    caller = %caller.short(),
                    kind = ?e.kind(),
                    error = %e,
                    "commit failed"
                );
                return Err(e.into());
            }
        };

        self.state.write().await.apply(&changes);

        tracing::info!(
            operation,
            caller = %caller.short(),
            at = %changes.at,
            mutations = changes.mutations.len(),
            events = records.len(),
            subscribers = self.events.subscriber_count(),
            "transaction committed"
        );

        for record in records {
            tracing::debug!(seq = record.seq, event = record.event.name(), "event");
            self.events.emit(record);
        }

        Ok(value)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Dataset Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a confidential dataset on behalf of `contributor`.
    pub async fn contribute_data(
        &self,
        contributor: Principal,
        value: u64,
        quality_score: u8,
        metadata_hash: &str,
        is_public: bool,
    ) -> Result<DatasetId> {
        self.transact("contribute_data", &contributor, |tx| {
            tx.contribute(contributor, value, quality_score, metadata_hash, is_public)
        })
        .await
    }

    /// Replace a dataset's quality score. Authority only.
    pub async fn update_quality_score(
        &self,
        caller: Principal,
        dataset_id: DatasetId,
        new_score: u8,
    ) -> Result<()> {
        self.transact("update_quality_score", &caller, |tx| {
            tx.update_quality_score(caller, dataset_id, new_score)
        })
        .await
    }

    /// Deactivate a dataset. Contributor or authority only.
    pub async fn deactivate_dataset(&self, caller: Principal, dataset_id: DatasetId) -> Result<()> {
        self.transact("deactivate_dataset", &caller, |tx| {
            tx.deactivate(caller, dataset_id)
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Access Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Grant `accessor` read rights on a dataset.
    pub async fn grant_data_access(
        &self,
        caller: Principal,
        dataset_id: DatasetId,
        accessor: Principal,
    ) -> Result<()> {
        self.transact("grant_data_access", &caller, |tx| {
            tx.grant(caller, dataset_id, accessor)
        })
        .await
    }

    /// Public fields of a dataset, for a permitted reader.
    pub async fn access_dataset(
        &self,
        dataset_id: DatasetId,
        caller: &Principal,
    ) -> Result<DatasetAccess> {
        Ok(self.state.read().await.access_dataset(dataset_id, caller)?)
    }

    /// Ciphertext handles of a dataset, for its contributor, a grantee or
    /// the authority.
    pub async fn sealed_handles(
        &self,
        dataset_id: DatasetId,
        caller: &Principal,
    ) -> Result<SealedHandles> {
        Ok(self.state.read().await.sealed_handles(dataset_id, caller)?)
    }

    pub async fn has_access(&self, dataset_id: DatasetId, principal: &Principal) -> bool {
        self.state.read().await.has_access(dataset_id, principal)
    }

    /// Distinct grantees, in first-grant order.
    pub async fn grantees(&self, dataset_id: DatasetId) -> Vec<Principal> {
        self.state.read().await.grantees(dataset_id).to_vec()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Request Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Post a data request.
    pub async fn request_data_access(
        &self,
        requester: Principal,
        topic: &str,
        budget: u64,
        deadline: Timestamp,
    ) -> Result<RequestId> {
        self.transact("request_data_access", &requester, |tx| {
            tx.submit_request(requester, topic, budget, deadline)
        })
        .await
    }

    pub async fn data_request_info(&self, request_id: RequestId) -> Result<RequestView> {
        Ok(self.state.read().await.request_info(request_id)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reward Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Record a confidential reward for a dataset's contributor. Authority only.
    pub async fn distribute_reward(
        &self,
        caller: Principal,
        contributor: Principal,
        dataset_id: DatasetId,
        amount: u64,
    ) -> Result<()> {
        self.transact("distribute_reward", &caller, |tx| {
            tx.distribute_reward(caller, contributor, dataset_id, amount)
        })
        .await
    }

    pub async fn contributor_reward_count(&self, contributor: &Principal) -> u64 {
        self.state.read().await.contributor_reward_count(contributor)
    }

    /// Reward records of a contributor, oldest first.
    pub async fn contributor_rewards(&self, contributor: &Principal) -> Vec<ContributionView> {
        self.state.read().await.contributor_rewards(contributor)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Signed Commands
    // ─────────────────────────────────────────────────────────────────────────

    /// Verify and run a signed command.
    pub async fn execute(&self, signed: &SignedCommand) -> Result<Outcome> {
        self.transact("execute", &signed.signer, |tx| tx.execute(signed))
            .await
    }

    /// Highest nonce accepted from `principal` so far (0 if none).
    pub async fn last_nonce(&self, principal: &Principal) -> u64 {
        self.state.read().await.last_nonce(principal)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Query Operations
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn dataset_info(&self, dataset_id: DatasetId) -> Result<DatasetView> {
        Ok(self.state.read().await.dataset_info(dataset_id)?)
    }

    pub async fn contributor_dataset_count(&self, contributor: &Principal) -> u64 {
        self.state.read().await.contributor_dataset_count(contributor)
    }

    /// Dataset ids of a contributor, in contribution order.
    pub async fn contributor_datasets(&self, contributor: &Principal) -> Vec<DatasetId> {
        self.state.read().await.contributor_datasets(contributor).to_vec()
    }

    pub async fn platform_stats(&self) -> PlatformStats {
        self.state.read().await.stats(self.clock.now())
    }

    pub async fn authority(&self) -> Option<Principal> {
        self.state.read().await.authority()
    }

    pub async fn is_authority(&self, principal: &Principal) -> bool {
        self.state.read().await.is_authority(principal)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────────

    /// Receive events committed from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.events.subscribe()
    }

    /// Log position of the last event published to subscribers (0 if none).
    ///
    /// A subscriber that lagged can pass this to [`Self::event_log`] after
    /// catching up from its own last seen position.
    pub fn last_event_seq(&self) -> u64 {
        self.events.sequence()
    }

    /// Persisted events with `seq > after_seq`, oldest first.
    pub async fn event_log(&self, after_seq: u64) -> Result<Vec<EventRecord>> {
        Ok(self.store.events_since(after_seq).await?)
    }
}

impl<O: EncryptionOracle, C: Clock> Registry<SqliteStore, O, C> {
    /// Open a registry on the SQLite database named by `config.storage`.
    pub async fn from_config(
        config: RegistryConfig,
        oracle: O,
        clock: C,
        initializer: Principal,
    ) -> Result<Self> {
        let store = config.storage.open()?;
        Self::open(store, oracle, clock, config, initializer).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use dataroom_core::{
        BitWidth, ChangeSet, CipherHandle, Dataset, ErrorKind, HandleId, Keypair, Mutation,
        RegistryEvent,
    };
    use dataroom_oracle::LocalOracle;
    use dataroom_store::MemoryStore;

    fn principal(seed: u8) -> Principal {
        Keypair::from_seed(&[seed; 32]).principal()
    }

    async fn registry() -> Registry<MemoryStore, LocalOracle, ManualClock> {
        Registry::open(
            MemoryStore::new(),
            LocalOracle::new(),
            ManualClock::new(Timestamp(1_000)),
            RegistryConfig::default(),
            principal(0),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_open_sets_authority() {
        let registry = registry().await;
        assert_eq!(registry.authority().await, Some(principal(0)));
        assert!(registry.is_authority(&principal(0)).await);
        assert!(!registry.is_authority(&principal(1)).await);
    }

    #[tokio::test]
    async fn test_open_rejects_zero_buffer() {
        let config = RegistryConfig {
            event_buffer: 0,
            ..RegistryConfig::default()
        };
        let result = Registry::open(
            MemoryStore::new(),
            LocalOracle::new(),
            SystemClock,
            config,
            principal(0),
        )
        .await;
        assert_eq!(result.err().map(|e| e.kind()), Some(ErrorKind::Config));
    }

    #[tokio::test]
    async fn test_failed_transaction_changes_nothing() {
        let registry = registry().await;
        let a = principal(1);

        let err = registry
            .contribute_data(a, 1, 101, "QmHash", true)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert_eq!(registry.platform_stats().await.total_datasets, 0);
        assert_eq!(registry.store().event_count(), 0);
    }

    #[tokio::test]
    async fn test_commit_publishes_events() {
        let registry = registry().await;
        let mut rx = registry.subscribe();
        let a = principal(1);

        let id = registry
            .contribute_data(a, 12345, 85, "QmHash", true)
            .await
            .unwrap();

        let record = rx.recv().await.unwrap();
        assert_eq!(record.seq, 1);
        assert_eq!(record.at, Timestamp(1_000));
        assert_eq!(
            record.event,
            RegistryEvent::DatasetContributed {
                dataset_id: id,
                contributor: a,
                metadata_hash: "QmHash".into(),
            }
        );
        assert_eq!(registry.event_log(0).await.unwrap(), vec![record]);
    }

    #[tokio::test]
    async fn test_open_rejects_gapped_store() {
        let store = MemoryStore::new();
        let contributor = principal(1);
        let handle = || CipherHandle::new(HandleId::from_bytes([7; 32]), BitWidth::U64, vec![7]);
        let mut changes = ChangeSet::new(Timestamp(1));
        changes.push(Mutation::PutDataset(Dataset {
            id: DatasetId(2),
            contributor,
            value_handle: handle(),
            quality_handle: handle(),
            metadata_hash: "QmHash".into(),
            is_public: true,
            created_at: Timestamp(1),
            access_count: 0,
            is_active: true,
        }));
        store.commit(&changes).await.unwrap();

        let result = Registry::open(
            store,
            LocalOracle::new(),
            ManualClock::new(Timestamp(1_000)),
            RegistryConfig::default(),
            principal(0),
        )
        .await;
        assert_eq!(result.err().map(|e| e.kind()), Some(ErrorKind::Storage));
    }

    #[tokio::test]
    async fn test_last_event_seq_tracks_published_events() {
        let registry = registry().await;
        assert_eq!(registry.last_event_seq(), 0);

        let a = principal(1);
        let id = registry
            .contribute_data(a, 1, 50, "QmHash", false)
            .await
            .unwrap();
        registry.grant_data_access(a, id, principal(2)).await.unwrap();
        assert_eq!(registry.last_event_seq(), 2);

        // Deactivation emits nothing.
        registry.deactivate_dataset(a, id).await.unwrap();
        assert_eq!(registry.last_event_seq(), 2);

        let log = registry.event_log(0).await.unwrap();
        assert_eq!(log.last().map(|r| r.seq), Some(registry.last_event_seq()));
        assert!(registry.event_log(registry.last_event_seq()).await.unwrap().is_empty());
    }
}

//! Test fixtures and helpers.
//!
//! Common setup code for integration tests, including collaborators that
//! fail on demand.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use dataroom::{ManualClock, Registry, RegistryConfig};
use dataroom_core::{
    BitWidth, ChangeSet, CipherHandle, EncryptionOracle, EventRecord, Keypair, OracleError,
    Principal, Snapshot, Timestamp,
};
use dataroom_oracle::LocalOracle;
use dataroom_store::{MemoryStore, Store, StoreError};

/// Start time of every fixture clock: 2023-11-14T22:13:20Z.
pub const GENESIS: Timestamp = Timestamp(1_700_000_000);

/// Deterministic keypair from a one-byte seed.
pub fn keypair(seed: u8) -> Keypair {
    Keypair::from_seed(&[seed; 32])
}

/// Deterministic principal from a one-byte seed.
pub fn principal(seed: u8) -> Principal {
    keypair(seed).principal()
}

/// Distinct deterministic keypairs for multi-party tests.
pub fn multi_party_keypairs(count: usize) -> Vec<Keypair> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = 0xA0;
            seed[1..9].copy_from_slice(&(i as u64).to_le_bytes());
            Keypair::from_seed(&seed)
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Failure injection
// ─────────────────────────────────────────────────────────────────────────────

const UNLIMITED: u64 = u64::MAX;

/// A [`LocalOracle`] that starts failing after a set number of calls.
pub struct FlakyOracle {
    inner: LocalOracle,
    /// Calls left before failing; `UNLIMITED` disables.
    budget: AtomicU64,
    calls: AtomicU64,
}

impl FlakyOracle {
    pub fn new() -> Self {
        Self {
            inner: LocalOracle::new(),
            budget: AtomicU64::new(UNLIMITED),
            calls: AtomicU64::new(0),
        }
    }

    /// Let `calls` more calls through, then fail every call.
    pub fn fail_after(&self, calls: u64) {
        self.budget.store(calls, Ordering::SeqCst);
    }

    /// Stop failing.
    pub fn heal(&self) {
        self.budget.store(UNLIMITED, Ordering::SeqCst);
    }

    /// Calls seen so far, successful or not.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// The wrapped oracle, for revealing values.
    pub fn local(&self) -> &LocalOracle {
        &self.inner
    }

    fn take(&self) -> Result<(), OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let granted = self
            .budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                UNLIMITED => Some(UNLIMITED),
                0 => None,
                n => Some(n - 1),
            })
            .is_ok();
        if granted {
            Ok(())
        } else {
            Err(OracleError::Unavailable("injected failure".into()))
        }
    }
}

impl Default for FlakyOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl EncryptionOracle for FlakyOracle {
    fn wrap(&self, plaintext: u64, width: BitWidth) -> Result<CipherHandle, OracleError> {
        self.take()?;
        self.inner.wrap(plaintext, width)
    }

    fn allow_self(&self, handle: &CipherHandle) -> Result<(), OracleError> {
        self.take()?;
        self.inner.allow_self(handle)
    }

    fn allow_principal(
        &self,
        handle: &CipherHandle,
        principal: &Principal,
    ) -> Result<(), OracleError> {
        self.take()?;
        self.inner.allow_principal(handle, principal)
    }
}

/// A store wrapper whose commits can be made to fail.
pub struct FlakyStore<S: Store> {
    inner: S,
    fail_commits: AtomicBool,
}

impl<S: Store> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_commits: AtomicBool::new(false),
        }
    }

    /// Make every following commit fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.fail_commits.store(failing, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: Store> Store for FlakyStore<S> {
    async fn load_snapshot(&self) -> Result<Snapshot, StoreError> {
        self.inner.load_snapshot().await
    }

    async fn commit(&self, changes: &ChangeSet) -> Result<Vec<EventRecord>, StoreError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected failure".into()));
        }
        self.inner.commit(changes).await
    }

    async fn events_since(&self, after_seq: u64) -> Result<Vec<EventRecord>, StoreError> {
        self.inner.events_since(after_seq).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry fixture
// ─────────────────────────────────────────────────────────────────────────────

/// The registry type every fixture builds.
pub type FixtureRegistry = Registry<Arc<FlakyStore<MemoryStore>>, Arc<FlakyOracle>, ManualClock>;

/// A registry on an in-memory store with an injectable oracle, store and clock.
pub struct TestFixture {
    pub authority: Keypair,
    pub oracle: Arc<FlakyOracle>,
    pub store: Arc<FlakyStore<MemoryStore>>,
    pub clock: ManualClock,
    pub config: RegistryConfig,
}

impl TestFixture {
    /// Create a fixture whose authority is `principal(0)`.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            authority: keypair(0),
            oracle: Arc::new(FlakyOracle::new()),
            store: Arc::new(FlakyStore::new(MemoryStore::new())),
            clock: ManualClock::new(GENESIS),
            config,
        }
    }

    pub fn authority(&self) -> Principal {
        self.authority.principal()
    }

    /// Open a registry over this fixture's collaborators.
    ///
    /// Opening twice reloads from the same store.
    pub async fn registry(&self) -> dataroom::Result<FixtureRegistry> {
        Registry::open(
            self.store.clone(),
            self.oracle.clone(),
            self.clock.clone(),
            self.config.clone(),
            self.authority(),
        )
        .await
    }

    /// The persisted state, straight from the store.
    pub async fn snapshot(&self) -> Snapshot {
        self.store.load_snapshot().await.unwrap_or_default()
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for the registry. It uses rusqlite
//! with bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Transaction};

use dataroom_core::{
    ChangeSet, CipherHandle, Contribution, DataRequest, Dataset, DatasetId, EventRecord,
    Mutation, Principal, RequestId, SequenceKind, Snapshot, Timestamp,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::Store;

const AUTHORITY_KEY: &str = "authority";

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Unavailable(format!("mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("spawn_blocking failed: {}", e)))?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Encoding helpers
// ─────────────────────────────────────────────────────────────────────────────

fn decode_principal(bytes: Vec<u8>, column: &str) -> Result<Principal> {
    let arr: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
        StoreError::InvalidData(format!("{}: expected 32 bytes, got {}", column, b.len()))
    })?;
    Ok(Principal::from_bytes(arr))
}

fn encode_handle(handle: &CipherHandle, column: &str) -> Result<Vec<u8>> {
    handle
        .to_bytes()
        .map_err(|e| StoreError::Serialization(format!("{}: {}", column, e)))
}

fn decode_handle(bytes: &[u8], column: &str) -> Result<CipherHandle> {
    CipherHandle::from_bytes(bytes)
        .map_err(|e| StoreError::Serialization(format!("{}: {}", column, e)))
}

fn encode_ids(ids: &[DatasetId]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(ids, &mut buf).map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode_ids(bytes: &[u8]) -> Result<Vec<DatasetId>> {
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

struct DatasetRow {
    id: i64,
    contributor: Vec<u8>,
    value_handle: Vec<u8>,
    quality_handle: Vec<u8>,
    metadata_hash: String,
    is_public: bool,
    created_at: i64,
    access_count: i64,
    is_active: bool,
}

impl DatasetRow {
    fn decode(self) -> Result<Dataset> {
        Ok(Dataset {
            id: DatasetId(self.id as u64),
            contributor: decode_principal(self.contributor, "contributor")?,
            value_handle: decode_handle(&self.value_handle, "value_handle")?,
            quality_handle: decode_handle(&self.quality_handle, "quality_handle")?,
            metadata_hash: self.metadata_hash,
            is_public: self.is_public,
            created_at: Timestamp(self.created_at as u64),
            access_count: self.access_count as u64,
            is_active: self.is_active,
        })
    }
}

struct RequestRow {
    id: i64,
    requester: Vec<u8>,
    topic: String,
    budget_handle: Vec<u8>,
    deadline: i64,
    is_fulfilled: bool,
    approved_datasets: Vec<u8>,
}

impl RequestRow {
    fn decode(self) -> Result<DataRequest> {
        Ok(DataRequest {
            id: RequestId(self.id as u64),
            requester: decode_principal(self.requester, "requester")?,
            topic: self.topic,
            budget_handle: decode_handle(&self.budget_handle, "budget_handle")?,
            deadline: Timestamp(self.deadline as u64),
            is_fulfilled: self.is_fulfilled,
            approved_datasets: decode_ids(&self.approved_datasets)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Writes
// ─────────────────────────────────────────────────────────────────────────────

fn apply_mutation(tx: &Transaction<'_>, at: Timestamp, mutation: &Mutation) -> Result<()> {
    match mutation {
        Mutation::SetAuthority(principal) => {
            tx.execute(
                "INSERT OR IGNORE INTO registry_meta (key, value) VALUES (?1, ?2)",
                params![AUTHORITY_KEY, principal.as_bytes().as_slice()],
            )?;
        }
        Mutation::AdvanceSequence(kind) => {
            let updated = tx.execute(
                "UPDATE sequences SET next_value = next_value + 1 WHERE name = ?1",
                params![kind.name()],
            )?;
            if updated != 1 {
                return Err(StoreError::InvalidData(format!(
                    "missing sequence counter {}",
                    kind.name()
                )));
            }
        }
        Mutation::PutDataset(dataset) => {
            tx.execute(
                "INSERT INTO datasets (
                    dataset_id, contributor, value_handle, quality_handle, metadata_hash,
                    is_public, created_at, access_count, is_active
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(dataset_id) DO UPDATE SET
                    quality_handle = excluded.quality_handle,
                    access_count = excluded.access_count,
                    is_active = excluded.is_active",
                params![
                    dataset.id.0 as i64,
                    dataset.contributor.as_bytes().as_slice(),
                    encode_handle(&dataset.value_handle, "value_handle")?,
                    encode_handle(&dataset.quality_handle, "quality_handle")?,
                    dataset.metadata_hash,
                    dataset.is_public,
                    dataset.created_at.as_secs() as i64,
                    dataset.access_count as i64,
                    dataset.is_active,
                ],
            )?;
        }
        Mutation::PutGrant {
            dataset_id,
            grantee,
        } => {
            tx.execute(
                "INSERT OR IGNORE INTO access_grants (dataset_id, grantee, granted_at)
                 VALUES (?1, ?2, ?3)",
                params![
                    dataset_id.0 as i64,
                    grantee.as_bytes().as_slice(),
                    at.as_secs() as i64
                ],
            )?;
        }
        Mutation::PutRequest(request) => {
            tx.execute(
                "INSERT OR REPLACE INTO data_requests (
                    request_id, requester, topic, budget_handle, deadline,
                    is_fulfilled, approved_datasets
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    request.id.0 as i64,
                    request.requester.as_bytes().as_slice(),
                    request.topic,
                    encode_handle(&request.budget_handle, "budget_handle")?,
                    request.deadline.as_secs() as i64,
                    request.is_fulfilled,
                    encode_ids(&request.approved_datasets)?,
                ],
            )?;
        }
        Mutation::AppendContribution {
            contributor,
            contribution,
        } => {
            tx.execute(
                "INSERT INTO contributions (
                    contributor, dataset_id, reward_handle, reward_claimed, distributed_at
                ) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    contributor.as_bytes().as_slice(),
                    contribution.dataset_id.0 as i64,
                    encode_handle(&contribution.reward_handle, "reward_handle")?,
                    contribution.reward_claimed,
                    at.as_secs() as i64,
                ],
            )?;
        }
        Mutation::SetNonce { principal, nonce } => {
            tx.execute(
                "INSERT INTO principal_nonces (principal, nonce) VALUES (?1, ?2)
                 ON CONFLICT(principal) DO UPDATE SET nonce = excluded.nonce",
                params![principal.as_bytes().as_slice(), *nonce as i64],
            )?;
        }
    }
    Ok(())
}

fn commit_blocking(conn: &mut Connection, changes: &ChangeSet) -> Result<Vec<EventRecord>> {
    let tx = conn.transaction()?;

    for mutation in &changes.mutations {
        apply_mutation(&tx, changes.at, mutation)?;
    }

    let mut appended = Vec::with_capacity(changes.events.len());
    for event in &changes.events {
        let body = EventRecord::event_bytes(event)
            .map_err(|e| StoreError::Serialization(format!("{}: {}", event.name(), e)))?;
        tx.execute(
            "INSERT INTO events (at, name, body) VALUES (?1, ?2, ?3)",
            params![changes.at.as_secs() as i64, event.name(), body],
        )?;
        appended.push(EventRecord {
            seq: tx.last_insert_rowid() as u64,
            at: changes.at,
            event: event.clone(),
        });
    }

    tx.commit()?;
    Ok(appended)
}

// ─────────────────────────────────────────────────────────────────────────────
// Reads
// ─────────────────────────────────────────────────────────────────────────────

fn load_blocking(conn: &Connection) -> Result<Snapshot> {
    let mut snapshot = Snapshot::default();

    let authority: Option<Vec<u8>> = conn
        .query_row(
            "SELECT value FROM registry_meta WHERE key = ?1",
            params![AUTHORITY_KEY],
            |row| row.get(0),
        )
        .optional()?;
    snapshot.authority = authority
        .map(|bytes| decode_principal(bytes, "authority"))
        .transpose()?;

    let mut stmt = conn.prepare("SELECT name, next_value FROM sequences")?;
    let counters = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    for (name, next) in counters {
        match SequenceKind::from_name(&name) {
            Some(SequenceKind::Dataset) => snapshot.next_dataset_id = next as u64,
            Some(SequenceKind::Request) => snapshot.next_request_id = next as u64,
            None => {
                return Err(StoreError::InvalidData(format!(
                    "unknown sequence counter {}",
                    name
                )))
            }
        }
    }

    let mut stmt = conn.prepare(
        "SELECT dataset_id, contributor, value_handle, quality_handle, metadata_hash,
                is_public, created_at, access_count, is_active
         FROM datasets ORDER BY dataset_id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(DatasetRow {
                id: row.get(0)?,
                contributor: row.get(1)?,
                value_handle: row.get(2)?,
                quality_handle: row.get(3)?,
                metadata_hash: row.get(4)?,
                is_public: row.get(5)?,
                created_at: row.get(6)?,
                access_count: row.get(7)?,
                is_active: row.get(8)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    snapshot.datasets = rows
        .into_iter()
        .map(DatasetRow::decode)
        .collect::<Result<_>>()?;

    let mut stmt =
        conn.prepare("SELECT dataset_id, grantee FROM access_grants ORDER BY rowid")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    snapshot.grants = rows
        .into_iter()
        .map(|(id, grantee)| -> Result<(DatasetId, Principal)> {
            Ok((DatasetId(id as u64), decode_principal(grantee, "grantee")?))
        })
        .collect::<Result<_>>()?;

    let mut stmt = conn.prepare(
        "SELECT request_id, requester, topic, budget_handle, deadline,
                is_fulfilled, approved_datasets
         FROM data_requests ORDER BY request_id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(RequestRow {
                id: row.get(0)?,
                requester: row.get(1)?,
                topic: row.get(2)?,
                budget_handle: row.get(3)?,
                deadline: row.get(4)?,
                is_fulfilled: row.get(5)?,
                approved_datasets: row.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    snapshot.requests = rows
        .into_iter()
        .map(RequestRow::decode)
        .collect::<Result<_>>()?;

    let mut stmt = conn.prepare(
        "SELECT contributor, dataset_id, reward_handle, reward_claimed
         FROM contributions ORDER BY position",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, Vec<u8>>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Vec<u8>>(2)?,
                row.get::<_, bool>(3)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    snapshot.contributions = rows
        .into_iter()
        .map(|(contributor, dataset_id, handle, claimed)| -> Result<(Principal, Contribution)> {
            Ok((
                decode_principal(contributor, "contributor")?,
                Contribution {
                    dataset_id: DatasetId(dataset_id as u64),
                    reward_handle: decode_handle(&handle, "reward_handle")?,
                    reward_claimed: claimed,
                },
            ))
        })
        .collect::<Result<_>>()?;

    let mut stmt =
        conn.prepare("SELECT principal, nonce FROM principal_nonces ORDER BY principal")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    snapshot.nonces = rows
        .into_iter()
        .map(|(principal, nonce)| -> Result<(Principal, u64)> {
            Ok((decode_principal(principal, "principal")?, nonce as u64))
        })
        .collect::<Result<_>>()?;

    Ok(snapshot)
}

fn events_blocking(conn: &Connection, after_seq: u64) -> Result<Vec<EventRecord>> {
    let after = i64::try_from(after_seq).unwrap_or(i64::MAX);
    let mut stmt =
        conn.prepare("SELECT seq, at, body FROM events WHERE seq > ?1 ORDER BY seq")?;
    let rows = stmt
        .query_map(params![after], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Vec<u8>>(2)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(|(seq, at, body)| -> Result<EventRecord> {
            let event = EventRecord::event_from_bytes(&body)
                .map_err(|e| StoreError::Serialization(format!("event {}: {}", seq, e)))?;
            Ok(EventRecord {
                seq: seq as u64,
                at: Timestamp(at as u64),
                event,
            })
        })
        .collect()
}

#[async_trait]
impl Store for SqliteStore {
    async fn load_snapshot(&self) -> Result<Snapshot> {
        let snapshot = self.blocking(|conn| load_blocking(conn)).await?;
        tracing::debug!(
            datasets = snapshot.datasets.len(),
            requests = snapshot.requests.len(),
            grants = snapshot.grants.len(),
            "loaded snapshot"
        );
        Ok(snapshot)
    }

    async fn commit(&self, changes: &ChangeSet) -> Result<Vec<EventRecord>> {
        let changes = changes.clone();
        let mutations = changes.mutations.len();

        let appended = self
            .blocking(move |conn| commit_blocking(conn, &changes))
            .await?;

        tracing::debug!(mutations, events = appended.len(), "sqlite commit");
        Ok(appended)
    }

    async fn events_since(&self, after_seq: u64) -> Result<Vec<EventRecord>> {
        self.blocking(move |conn| events_blocking(conn, after_seq))
            .await
    }
}

//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
            tracing::debug!(version, "applied schema migration");
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Singleton values, e.g. 'authority' -> 32-byte Ed25519 public key
        CREATE TABLE registry_meta (
            key TEXT PRIMARY KEY,
            value BLOB NOT NULL
        );

        -- Named id counters: the next id to hand out
        CREATE TABLE sequences (
            name TEXT PRIMARY KEY,
            next_value INTEGER NOT NULL
        );
        INSERT INTO sequences (name, next_value) VALUES ('dataset', 1), ('request', 1);

        CREATE TABLE datasets (
            dataset_id INTEGER PRIMARY KEY,
            contributor BLOB NOT NULL,        -- 32 bytes
            value_handle BLOB NOT NULL,       -- CBOR CipherHandle
            quality_handle BLOB NOT NULL,     -- CBOR CipherHandle, replaced on rescore
            metadata_hash TEXT NOT NULL,
            is_public INTEGER NOT NULL,
            created_at INTEGER NOT NULL,      -- Unix seconds
            access_count INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1
        );

        -- Grant relation; rowid preserves first-grant order
        CREATE TABLE access_grants (
            dataset_id INTEGER NOT NULL,
            grantee BLOB NOT NULL,
            granted_at INTEGER NOT NULL,
            PRIMARY KEY (dataset_id, grantee)
        );

        CREATE TABLE data_requests (
            request_id INTEGER PRIMARY KEY,
            requester BLOB NOT NULL,
            topic TEXT NOT NULL,
            budget_handle BLOB NOT NULL,      -- CBOR CipherHandle
            deadline INTEGER NOT NULL,
            is_fulfilled INTEGER NOT NULL DEFAULT 0,
            approved_datasets BLOB NOT NULL   -- CBOR array of dataset ids
        );

        -- Reward records; position preserves insertion order
        CREATE TABLE contributions (
            position INTEGER PRIMARY KEY AUTOINCREMENT,
            contributor BLOB NOT NULL,
            dataset_id INTEGER NOT NULL,
            reward_handle BLOB NOT NULL,      -- CBOR CipherHandle
            reward_claimed INTEGER NOT NULL DEFAULT 0,
            distributed_at INTEGER NOT NULL
        );

        -- Last accepted signed-command nonce per principal
        CREATE TABLE principal_nonces (
            principal BLOB PRIMARY KEY,
            nonce INTEGER NOT NULL
        );

        -- Append-only audit log of emitted events
        CREATE TABLE events (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            at INTEGER NOT NULL,
            name TEXT NOT NULL,
            body BLOB NOT NULL                -- CBOR RegistryEvent
        );

        CREATE INDEX idx_datasets_contributor ON datasets(contributor);
        CREATE INDEX idx_contributions_contributor ON contributions(contributor);
        CREATE INDEX idx_events_name ON events(name);
        "#,
    )?;

    Ok(())
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creates_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        for table in [
            "registry_meta",
            "sequences",
            "datasets",
            "access_grants",
            "data_requests",
            "contributions",
            "principal_nonces",
            "events",
            "schema_migrations",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {}", table);
        }
    }

    #[test]
    fn test_migration_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        let version: u32 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 1);

        let counters: i64 = conn
            .query_row("SELECT COUNT(*) FROM sequences", [], |row| row.get(0))
            .unwrap();
        assert_eq!(counters, 2);
    }

    #[test]
    fn test_newer_schema_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (99, 0)",
            [],
        )
        .unwrap();

        assert!(matches!(migrate(&mut conn), Err(StoreError::Migration(_))));
    }
}

use std::path::Path;

use chrono::{Duration, Utc};
use rusqlite::Connection;
use thiserror::Error;

use crate::record::Record;

pub const DB_PATH: &str = "data/sismos.sqlite";

// A run holding the lease longer than this is considered dead and
// its lease may be reclaimed.
const LEASE_TTL_SECS: i64 = 300;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("bad field encoding: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The persistent record store capability: full scan of identifiers,
/// batch delete, batch insert, and the single-writer run lease.
///
/// Each batch runs as one logical unit; a batch either fully applies
/// or fails as a whole.
pub trait RecordStore {
    fn scan_ids(&self) -> Result<Vec<String>, StoreError>;
    fn delete_batch(&self, ids: &[String]) -> Result<usize, StoreError>;
    fn insert_batch(&self, records: &[Record]) -> Result<usize, StoreError>;

    /// Try to take the run lease. Returns false if another live run holds it.
    fn acquire_lease(&self, holder: &str) -> Result<bool, StoreError>;
    fn release_lease(&self, holder: &str) -> Result<(), StoreError>;
}

/// SQLite-backed store. One logical table keyed by `id`; the per-record
/// attribute set is dynamic, so fields are kept as an order-preserving
/// JSON array of [name, value] pairs.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Stored records in insertion order, for the CLI read paths.
    pub fn fetch_all(&self, limit: Option<usize>) -> Result<Vec<Record>, StoreError> {
        // A negative LIMIT means no limit in SQLite.
        let limit = limit.map(|n| n as i64).unwrap_or(-1);
        let mut stmt = self
            .conn
            .prepare("SELECT id, fields FROM records ORDER BY rowid LIMIT ?1")?;
        let rows = stmt
            .query_map(rusqlite::params![limit], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for (id, blob) in rows {
            let fields: Vec<(String, String)> = serde_json::from_str(&blob)?;
            records.push(Record::from_parts(id, fields));
        }
        Ok(records)
    }

    pub fn stats(&self) -> Result<StoreStats, StoreError> {
        let records: usize =
            self.conn.query_row("SELECT COUNT(*) FROM records", [], |r| r.get(0))?;
        let last_synced: Option<String> =
            self.conn.query_row("SELECT MAX(synced_at) FROM records", [], |r| r.get(0))?;
        Ok(StoreStats { records, last_synced })
    }
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS records (
            id        TEXT PRIMARY KEY,
            fields    TEXT NOT NULL,
            synced_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS sync_lease (
            id          INTEGER PRIMARY KEY CHECK (id = 1),
            holder      TEXT NOT NULL,
            acquired_at TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}

impl RecordStore for SqliteStore {
    fn scan_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT id FROM records")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    fn delete_batch(&self, ids: &[String]) -> Result<usize, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM records WHERE id = ?1")?;
            for id in ids {
                count += stmt.execute(rusqlite::params![id])?;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    fn insert_batch(&self, records: &[Record]) -> Result<usize, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let mut count = 0;
        {
            // Plain INSERT: a duplicate id is a bug upstream and must surface.
            let mut stmt = tx.prepare("INSERT INTO records (id, fields) VALUES (?1, ?2)")?;
            for r in records {
                let blob = serde_json::to_string(&r.fields)?;
                count += stmt.execute(rusqlite::params![r.id, blob])?;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    fn acquire_lease(&self, holder: &str) -> Result<bool, StoreError> {
        let now = Utc::now();
        let stale = now - Duration::seconds(LEASE_TTL_SECS);
        let changed = self.conn.execute(
            "INSERT INTO sync_lease (id, holder, acquired_at) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET
                 holder = excluded.holder,
                 acquired_at = excluded.acquired_at
             WHERE sync_lease.acquired_at < ?3",
            rusqlite::params![holder, now.to_rfc3339(), stale.to_rfc3339()],
        )?;
        Ok(changed == 1)
    }

    fn release_lease(&self, holder: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "DELETE FROM sync_lease WHERE id = 1 AND holder = ?1",
            rusqlite::params![holder],
        )?;
        Ok(())
    }
}

pub struct StoreStats {
    pub records: usize,
    pub last_synced: Option<String>,
}

// ── Tests ──

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::record::Record;
use crate::store::{RecordStore, StoreError};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("sync lease already held by another run")]
    LeaseHeld,

    #[error("lease handling failed: {0}")]
    Lease(#[source] StoreError),

    #[error("failed to clear existing records: {0}")]
    Delete(#[source] StoreError),

    #[error("failed to insert new records: {0}")]
    Insert(#[source] StoreError),
}

#[derive(Debug)]
pub struct SyncStats {
    pub deleted: usize,
    pub inserted: usize,
}

/// Replace the store's full content with `snapshot`.
///
/// Two-phase: scan + batch-delete everything, then batch-insert the new
/// snapshot. The store offers no multi-row transaction across the two
/// phases, so an insert failure can leave the store empty until the next
/// successful run. That window is accepted and surfaced, not masked.
///
/// A run lease guards against concurrent invocations interleaving their
/// scan/delete/insert phases; a second run fails fast with `LeaseHeld`
/// before touching any record.
pub fn replace_all<S: RecordStore>(store: &S, snapshot: &[Record]) -> Result<SyncStats, SyncError> {
    let holder = Uuid::new_v4().to_string();
    match store.acquire_lease(&holder) {
        Ok(true) => {}
        Ok(false) => return Err(SyncError::LeaseHeld),
        Err(e) => return Err(SyncError::Lease(e)),
    }

    let result = delete_then_insert(store, snapshot);

    if let Err(e) = store.release_lease(&holder) {
        warn!("Failed to release sync lease: {}", e);
    }
    result
}

fn delete_then_insert<S: RecordStore>(
    store: &S,
    snapshot: &[Record],
) -> Result<SyncStats, SyncError> {
    let existing = store.scan_ids().map_err(SyncError::Delete)?;
    let deleted = store.delete_batch(&existing).map_err(SyncError::Delete)?;
    info!("Cleared {} existing records", deleted);

    let inserted = match store.insert_batch(snapshot) {
        Ok(n) => n,
        Err(e) => {
            warn!(
                "Insert failed after deleting {} records; store may be empty until the next run",
                deleted
            );
            return Err(SyncError::Insert(e));
        }
    };
    info!("Inserted {} records", inserted);

    Ok(SyncStats { deleted, inserted })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    fn record(id: &str, kv: &[(&str, &str)]) -> Record {
        Record::from_parts(
            id.to_string(),
            kv.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        )
    }

    #[test]
    fn replaces_previous_snapshot_exactly() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_batch(&[record("old-1", &[]), record("old-2", &[])])
            .unwrap();

        let snapshot = vec![
            record("new-1", &[("Magnitud", "4.5")]),
            record("new-2", &[("Magnitud", "3.8")]),
        ];
        let stats = replace_all(&store, &snapshot).unwrap();
        assert_eq!(stats.deleted, 2);
        assert_eq!(stats.inserted, 2);

        let mut ids = store.scan_ids().unwrap();
        ids.sort();
        assert_eq!(ids, vec!["new-1", "new-2"]);
    }

    #[test]
    fn empty_snapshot_wipes_the_store() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_batch(&[record("old", &[])]).unwrap();

        let stats = replace_all(&store, &[]).unwrap();
        assert_eq!(stats.deleted, 1);
        assert_eq!(stats.inserted, 0);
        assert!(store.scan_ids().unwrap().is_empty());
    }

    #[test]
    fn insert_failure_after_delete_leaves_store_empty() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_batch(&[record("old", &[])]).unwrap();

        // Duplicate ids make the insert batch fail after deletion.
        let bad = vec![record("dup", &[]), record("dup", &[])];
        let err = replace_all(&store, &bad).unwrap_err();
        assert!(matches!(err, SyncError::Insert(_)));
        assert!(store.scan_ids().unwrap().is_empty());
    }

    #[test]
    fn lease_is_released_after_success_and_failure() {
        let store = SqliteStore::open_in_memory().unwrap();
        replace_all(&store, &[record("a", &[])]).unwrap();
        // A failing run still releases the lease.
        let bad = vec![record("dup", &[]), record("dup", &[])];
        replace_all(&store, &bad).unwrap_err();
        // If the lease leaked, this third run would see LeaseHeld.
        replace_all(&store, &[record("b", &[])]).unwrap();
    }

    #[test]
    fn held_lease_fails_fast_without_touching_records() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_batch(&[record("old", &[])]).unwrap();
        assert!(store.acquire_lease("other-run").unwrap());

        let err = replace_all(&store, &[record("new", &[])]).unwrap_err();
        assert!(matches!(err, SyncError::LeaseHeld));
        assert_eq!(store.scan_ids().unwrap(), vec!["old"]);
    }

    #[test]
    fn scan_failure_maps_to_delete_error() {
        struct BrokenScan;
        impl RecordStore for BrokenScan {
            fn scan_ids(&self) -> Result<Vec<String>, StoreError> {
                Err(StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
            }
            fn delete_batch(&self, _: &[String]) -> Result<usize, StoreError> {
                unreachable!("delete must not run when the scan fails")
            }
            fn insert_batch(&self, _: &[Record]) -> Result<usize, StoreError> {
                unreachable!("insert must not run when the scan fails")
            }
            fn acquire_lease(&self, _: &str) -> Result<bool, StoreError> {
                Ok(true)
            }
            fn release_lease(&self, _: &str) -> Result<(), StoreError> {
                Ok(())
            }
        }

        let err = replace_all(&BrokenScan, &[]).unwrap_err();
        assert!(matches!(err, SyncError::Delete(_)));
    }
}

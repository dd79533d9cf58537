use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};
use tracing::{debug, info};

use crate::error::KVError;
use crate::traits::{KVOp, KVStore};

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("kv");

fn storage<E: std::fmt::Display>(e: E) -> KVError {
    KVError::Storage(e.to_string())
}

/// RedbStore is a KVStore implementation backed by redb, a pure-Rust embedded
/// key-value database. Every batch runs in one redb write transaction, and
/// redb serializes writers, so batches are atomic and isolated.
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create a redb database at the given path.
    pub fn open(path: &Path) -> Result<Self, KVError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(storage)?;
            }
        }

        let db = Database::create(path).map_err(storage)?;

        // Ensure the table exists by doing a write transaction.
        let write_txn = db.begin_write().map_err(storage)?;
        {
            let _table = write_txn.open_table(TABLE).map_err(storage)?;
        }
        write_txn.commit().map_err(storage)?;

        info!("opened redb store at {:?}", path);
        Ok(Self { db: Arc::new(db) })
    }
}

impl KVStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError> {
        let read_txn = self.db.begin_read().map_err(storage)?;
        let table = read_txn.open_table(TABLE).map_err(storage)?;

        match table.get(key) {
            Ok(Some(val)) => Ok(Some(val.value().to_vec())),
            Ok(None) => Ok(None),
            Err(e) => Err(storage(e)),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), KVError> {
        let write_txn = self.db.begin_write().map_err(storage)?;
        {
            let mut table = write_txn.open_table(TABLE).map_err(storage)?;
            table.insert(key, value).map_err(storage)?;
        }
        write_txn.commit().map_err(storage)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), KVError> {
        let write_txn = self.db.begin_write().map_err(storage)?;
        {
            let mut table = write_txn.open_table(TABLE).map_err(storage)?;
            table.remove(key).map_err(storage)?;
        }
        write_txn.commit().map_err(storage)?;
        Ok(())
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KVError> {
        let read_txn = self.db.begin_read().map_err(storage)?;
        let table = read_txn.open_table(TABLE).map_err(storage)?;

        let mut results = Vec::new();
        let iter = table.range(prefix..).map_err(storage)?;

        for entry in iter {
            let entry = entry.map_err(storage)?;
            let key = entry.0.value().to_string();
            if !key.starts_with(prefix) {
                break;
            }
            let value = entry.1.value().to_vec();
            results.push((key, value));
        }

        Ok(results)
    }

    fn apply(&self, ops: &[KVOp]) -> Result<(), KVError> {
        let write_txn = self.db.begin_write().map_err(storage)?;
        {
            let mut table = write_txn.open_table(TABLE).map_err(storage)?;
            for op in ops {
                match op {
                    KVOp::Insert { key, value } => {
                        let exists = table.get(key.as_str()).map_err(storage)?.is_some();
                        if exists {
                            debug!(key = %key, "batch aborted: insert over existing key");
                            return Err(KVError::Conflict(key.clone()));
                        }
                        table
                            .insert(key.as_str(), value.as_slice())
                            .map_err(storage)?;
                    }
                    KVOp::Delete { key } => {
                        table.remove(key.as_str()).map_err(storage)?;
                    }
                    KVOp::DeleteExisting { key } => {
                        let removed = table.remove(key.as_str()).map_err(storage)?.is_some();
                        if !removed {
                            debug!(key = %key, "batch aborted: delete of missing key");
                            return Err(KVError::Missing(key.clone()));
                        }
                    }
                    KVOp::AssertAbsent { key } => {
                        let exists = table.get(key.as_str()).map_err(storage)?.is_some();
                        if exists {
                            debug!(key = %key, "batch aborted: guarded key present");
                            return Err(KVError::Conflict(key.clone()));
                        }
                    }
                }
            }
        }
        // Returning early above drops the transaction uncommitted, which
        // discards every op already staged in it.
        write_txn.commit().map_err(storage)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (RedbStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::open(&dir.path().join("test.redb")).unwrap();
        (store, dir)
    }

    fn insert(key: &str, value: &[u8]) -> KVOp {
        KVOp::Insert { key: key.into(), value: value.to_vec() }
    }

    #[test]
    fn set_get_delete() {
        let (store, _dir) = open_temp();
        store.set("a:1", b"one").unwrap();
        assert_eq!(store.get("a:1").unwrap(), Some(b"one".to_vec()));
        store.delete("a:1").unwrap();
        assert_eq!(store.get("a:1").unwrap(), None);
        // Deleting again is fine.
        store.delete("a:1").unwrap();
    }

    #[test]
    fn scan_stops_at_prefix_boundary() {
        let (store, _dir) = open_temp();
        store.set("a:1", b"1").unwrap();
        store.set("a:2", b"2").unwrap();
        store.set("b:1", b"3").unwrap();

        let rows = store.scan("a:").unwrap();
        let keys: Vec<_> = rows.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a:1", "a:2"]);
    }

    #[test]
    fn batch_commits_all_ops() {
        let (store, _dir) = open_temp();
        store.set("old", b"x").unwrap();

        store
            .apply(&[
                KVOp::AssertAbsent { key: "guard".into() },
                KVOp::Delete { key: "old".into() },
                insert("new:1", b"1"),
                insert("new:2", b"2"),
            ])
            .unwrap();

        assert_eq!(store.get("old").unwrap(), None);
        assert_eq!(store.scan("new:").unwrap().len(), 2);
    }

    #[test]
    fn failed_insert_rolls_back_batch() {
        let (store, _dir) = open_temp();
        store.set("dup", b"x").unwrap();
        store.set("victim", b"y").unwrap();

        let err = store
            .apply(&[
                KVOp::Delete { key: "victim".into() },
                insert("fresh", b"1"),
                insert("dup", b"2"),
            ])
            .unwrap_err();
        assert!(matches!(err, KVError::Conflict(ref k) if k == "dup"));

        // Nothing from the batch is visible.
        assert_eq!(store.get("victim").unwrap(), Some(b"y".to_vec()));
        assert_eq!(store.get("fresh").unwrap(), None);
        assert_eq!(store.get("dup").unwrap(), Some(b"x".to_vec()));
    }

    #[test]
    fn guard_and_delete_existing_failures() {
        let (store, _dir) = open_temp();
        store.set("blocker", b"1").unwrap();

        let err = store
            .apply(&[KVOp::AssertAbsent { key: "blocker".into() }, insert("k", b"v")])
            .unwrap_err();
        assert!(matches!(err, KVError::Conflict(_)));
        assert_eq!(store.get("k").unwrap(), None);

        let err = store
            .apply(&[KVOp::DeleteExisting { key: "ghost".into() }])
            .unwrap_err();
        assert!(matches!(err, KVError::Missing(ref k) if k == "ghost"));
    }

    #[test]
    fn ops_see_earlier_ops_in_batch() {
        let (store, _dir) = open_temp();
        let err = store
            .apply(&[insert("k", b"1"), KVOp::AssertAbsent { key: "k".into() }])
            .unwrap_err();
        assert!(matches!(err, KVError::Conflict(_)));
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("persist.redb");
        {
            let store = RedbStore::open(&path).unwrap();
            store.apply(&[insert("p", b"1")]).unwrap();
        }
        let store = RedbStore::open(&path).unwrap();
        assert_eq!(store.get("p").unwrap(), Some(b"1".to_vec()));
    }
}

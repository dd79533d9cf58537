use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::KVError;
use crate::traits::{KVOp, KVStore};

/// MemoryKV is an in-process KVStore over a `BTreeMap`.
///
/// Batches take the write lock for their whole duration, stage their effects
/// in a pending map and only then merge it, so a failing op leaves the map
/// untouched. Contents are lost when the value is dropped.
#[derive(Default)]
pub struct MemoryKV {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryKV {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> Result<usize, KVError> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, KVError> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Vec<u8>>>, KVError> {
        self.entries
            .read()
            .map_err(|_| KVError::Storage("memory kv lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, Vec<u8>>>, KVError> {
        self.entries
            .write()
            .map_err(|_| KVError::Storage("memory kv lock poisoned".into()))
    }
}

impl KVStore for MemoryKV {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError> {
        Ok(self.read()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), KVError> {
        self.write()?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), KVError> {
        self.write()?.remove(key);
        Ok(())
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KVError> {
        let entries = self.read()?;
        let mut results = Vec::new();
        for (key, value) in entries.range(prefix.to_string()..) {
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.clone(), value.clone()));
        }
        Ok(results)
    }

    fn apply(&self, ops: &[KVOp]) -> Result<(), KVError> {
        let mut entries = self.write()?;

        // None marks a staged removal.
        let mut pending: BTreeMap<&str, Option<&[u8]>> = BTreeMap::new();

        for op in ops {
            match op {
                KVOp::Insert { key, value } => {
                    if is_present(&entries, &pending, key) {
                        return Err(KVError::Conflict(key.clone()));
                    }
                    pending.insert(key.as_str(), Some(value.as_slice()));
                }
                KVOp::Delete { key } => {
                    pending.insert(key.as_str(), None);
                }
                KVOp::DeleteExisting { key } => {
                    if !is_present(&entries, &pending, key) {
                        return Err(KVError::Missing(key.clone()));
                    }
                    pending.insert(key.as_str(), None);
                }
                KVOp::AssertAbsent { key } => {
                    if is_present(&entries, &pending, key) {
                        return Err(KVError::Conflict(key.clone()));
                    }
                }
            }
        }

        for (key, staged) in pending {
            match staged {
                Some(value) => {
                    entries.insert(key.to_string(), value.to_vec());
                }
                None => {
                    entries.remove(key);
                }
            }
        }
        Ok(())
    }
}

/// Whether `key` exists once the staged ops are taken into account.
fn is_present(
    entries: &BTreeMap<String, Vec<u8>>,
    pending: &BTreeMap<&str, Option<&[u8]>>,
    key: &str,
) -> bool {
    match pending.get(key) {
        Some(staged) => staged.is_some(),
        None => entries.contains_key(key),
    }
}

use crate::error::KVError;

/// A single step of an atomic batch, see [`KVStore::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KVOp {
    /// Insert a key that must not exist yet. Fails with `KVError::Conflict`.
    Insert { key: String, value: Vec<u8> },

    /// Remove a key if present. Never fails on an absent key.
    Delete { key: String },

    /// Remove a key that must exist. Fails with `KVError::Missing`.
    DeleteExisting { key: String },

    /// Guard: the key must be absent. Fails with `KVError::Conflict`.
    AssertAbsent { key: String },
}

impl KVOp {
    pub fn key(&self) -> &str {
        match self {
            KVOp::Insert { key, .. }
            | KVOp::Delete { key }
            | KVOp::DeleteExisting { key }
            | KVOp::AssertAbsent { key } => key,
        }
    }
}

/// KVStore provides a key-value storage interface with all-or-nothing batches.
///
/// Keys follow a namespaced convention: `rel:edge:...`, `profile:user:{id}`, etc.
pub trait KVStore: Send + Sync {
    /// Get the value for a key. Returns None if the key does not exist.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError>;

    /// Set a key-value pair, overwriting any previous value.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), KVError>;

    /// Delete a key. Deleting an absent key is not an error.
    fn delete(&self, key: &str) -> Result<(), KVError>;

    /// Scan all keys matching a prefix. Returns sorted (key, value) pairs.
    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KVError>;

    /// Apply a batch in a single write transaction.
    ///
    /// Ops run in order and observe the effects of earlier ops in the same
    /// batch. If any op fails, none of the batch becomes visible.
    fn apply(&self, ops: &[KVOp]) -> Result<(), KVError>;
}

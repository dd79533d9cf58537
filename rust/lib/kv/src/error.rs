use thiserror::Error;

#[derive(Error, Debug)]
pub enum KVError {
    /// An `Insert` or `AssertAbsent` hit a key that is already present.
    #[error("key already exists: {0}")]
    Conflict(String),

    /// A `DeleteExisting` hit a key that is absent.
    #[error("key does not exist: {0}")]
    Missing(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub mod error;
pub mod memory;
pub mod redb;
pub mod traits;

pub use error::KVError;
pub use memory::MemoryKV;
pub use redb::RedbStore;
pub use traits::{KVOp, KVStore};

pub mod model;
pub mod profile;
pub mod service;
pub mod store;

use std::sync::Arc;

use relgraph_core::{ServiceConfig, ServiceError};
use relgraph_kv::{KVStore, RedbStore};
use tracing::info;

pub use model::{Relation, RelationFilter, RelationKey, RelationState, RelationStats, RelationType};
pub use profile::{KvProfiles, Profile, ProfileLookup};
pub use service::{RelationConfig, RelationService};
pub use store::{RelationStore, RelationTxn};

/// The relation module: one KV backend shared by profiles and edges, and the
/// service built on top of them.
pub struct RelationModule {
    profiles: Arc<KvProfiles>,
    service: Arc<RelationService>,
}

impl RelationModule {
    /// Open the redb file named by `config` and build the module on it.
    pub fn open(config: &ServiceConfig, relation: RelationConfig) -> Result<Self, ServiceError> {
        let path = config.resolve_db_path();
        let kv = RedbStore::open(&path)
            .map_err(|e| ServiceError::Storage(format!("open {}: {e}", path.display())))?;
        info!("relation module using {:?}", path);
        Self::with_kv(Arc::new(kv), relation)
    }

    /// Build the module on an existing KV backend.
    pub fn with_kv(kv: Arc<dyn KVStore>, relation: RelationConfig) -> Result<Self, ServiceError> {
        let profiles = Arc::new(KvProfiles::new(Arc::clone(&kv)));
        let store = Arc::new(RelationStore::new(kv)?);
        let service = RelationService::new(store, profiles.clone(), relation);
        Ok(Self { profiles, service })
    }

    pub fn service(&self) -> &Arc<RelationService> {
        &self.service
    }

    /// Profile records backing identity lookups.
    pub fn profiles(&self) -> &Arc<KvProfiles> {
        &self.profiles
    }
}

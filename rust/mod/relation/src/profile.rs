use std::sync::Arc;

use relgraph_core::ServiceError;
use relgraph_kv::{KVError, KVOp, KVStore};
use serde::{Deserialize, Serialize};

/// KV key prefix for profile records.
pub const PROFILE_PREFIX: &str = "profile:user:";

/// The part of a user profile the relation graph cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub username: String,
}

/// Resolves identity references. An id exists iff `resolve` returns a profile.
pub trait ProfileLookup: Send + Sync {
    fn resolve(&self, id: &str) -> Result<Option<Profile>, ServiceError>;
}

/// Profiles stored as JSON under `profile:user:{id}`.
pub struct KvProfiles {
    kv: Arc<dyn KVStore>,
}

impl KvProfiles {
    pub fn new(kv: Arc<dyn KVStore>) -> Self {
        Self { kv }
    }

    fn make_key(id: &str) -> String {
        format!("{PROFILE_PREFIX}{id}")
    }

    /// Store a new profile. Fails with Conflict if the id is taken.
    pub fn register(&self, profile: Profile) -> Result<Profile, ServiceError> {
        if profile.id.is_empty() {
            return Err(ServiceError::Validation("profile id must not be empty".into()));
        }

        let bytes = serde_json::to_vec(&profile)
            .map_err(|e| ServiceError::Internal(format!("serialize: {e}")))?;
        self.kv
            .apply(&[KVOp::Insert {
                key: Self::make_key(&profile.id),
                value: bytes,
            }])
            .map_err(|e| match e {
                KVError::Conflict(_) => {
                    ServiceError::Conflict(format!("profile '{}' already exists", profile.id))
                }
                other => ServiceError::Storage(other.to_string()),
            })?;

        Ok(profile)
    }
}

impl ProfileLookup for KvProfiles {
    fn resolve(&self, id: &str) -> Result<Option<Profile>, ServiceError> {
        match self
            .kv
            .get(&Self::make_key(id))
            .map_err(|e| ServiceError::Storage(e.to_string()))?
        {
            Some(bytes) => {
                let profile: Profile = serde_json::from_slice(&bytes)
                    .map_err(|e| ServiceError::Internal(format!("deserialize: {e}")))?;
                Ok(Some(profile))
            }
            None => Ok(None),
        }
    }
}

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use relgraph_core::{Page, ServiceError, new_id, now_rfc3339};
use relgraph_kv::{KVError, KVOp, KVStore};
use tracing::{debug, info, warn};

use crate::model::{
    EDGE_PREFIX, Relation, RelationFilter, RelationKey, RelationType, incoming_prefix,
    outgoing_prefix,
};

/// Persistent storage for relation edges, backed by a KVStore.
///
/// Each edge is written twice in one batch: the primary record under
/// `rel:edge:` (scanned by source) and a copy under `rel:in:` (scanned by
/// dest). The store enforces key uniqueness and nothing else; graph rules
/// live in [`crate::service::RelationService`].
pub struct RelationStore {
    kv: Arc<dyn KVStore>,
    next_seq: AtomicU64,
}

impl RelationStore {
    /// Create a RelationStore, recovering the insertion counter from the
    /// edges already stored.
    pub fn new(kv: Arc<dyn KVStore>) -> Result<Self, ServiceError> {
        let mut last_seq = 0;
        for (_key, bytes) in kv.scan(EDGE_PREFIX).map_err(kv_err)? {
            last_seq = last_seq.max(decode(&bytes)?.seq);
        }
        info!(last_seq, "relation store ready");

        Ok(Self {
            kv,
            next_seq: AtomicU64::new(last_seq + 1),
        })
    }

    // -----------------------------------------------------------------------
    // Single edges
    // -----------------------------------------------------------------------

    /// Insert a new edge. Fails with Conflict if the same triple exists.
    pub fn create_relation(&self, key: &RelationKey) -> Result<Relation, ServiceError> {
        self.transaction()
            .create(key)?
            .commit()?
            .ok_or_else(|| ServiceError::Internal("created relation missing after commit".into()))
    }

    /// First edge matching `filter`, in insertion order.
    pub fn find_relation(&self, filter: &RelationFilter) -> Result<Option<Relation>, ServiceError> {
        if let Some(key) = filter.exact_key() {
            return match self.kv.get(&key.edge_key()).map_err(kv_err)? {
                Some(bytes) => Ok(Some(decode(&bytes)?)),
                None => Ok(None),
            };
        }
        Ok(self.scan_matching(filter)?.into_iter().next())
    }

    /// Delete the first edge matching `filter`. Fails with NotFound if none.
    pub fn delete_relation(&self, filter: &RelationFilter) -> Result<(), ServiceError> {
        let relation = self
            .find_relation(filter)?
            .ok_or_else(|| ServiceError::NotFound("relation does not exist.".into()))?;
        let key = relation.key();

        self.kv
            .apply(&[
                KVOp::DeleteExisting { key: key.edge_key() },
                KVOp::Delete { key: key.incoming_key() },
            ])
            .map_err(commit_err)?;

        debug!(source = %key.source, dest = %key.dest, kind = %key.relation_type, "relation deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Listings
    // -----------------------------------------------------------------------

    /// All edges whose source is `user_id`.
    pub fn get_relations(
        &self,
        page: usize,
        page_size: usize,
        user_id: &str,
    ) -> Result<Vec<Relation>, ServiceError> {
        self.page(&RelationFilter::by_source(user_id), page, page_size)
    }

    /// FOLLOW edges pointing at `user_id`.
    pub fn get_followers(
        &self,
        page: usize,
        page_size: usize,
        user_id: &str,
    ) -> Result<Vec<Relation>, ServiceError> {
        self.page(&followers_of(user_id), page, page_size)
    }

    /// FOLLOW edges leaving `user_id`.
    pub fn get_following(
        &self,
        page: usize,
        page_size: usize,
        user_id: &str,
    ) -> Result<Vec<Relation>, ServiceError> {
        self.page(&following_of(user_id), page, page_size)
    }

    /// BLOCK edges leaving `user_id`.
    pub fn get_blocked_users(
        &self,
        page: usize,
        page_size: usize,
        user_id: &str,
    ) -> Result<Vec<Relation>, ServiceError> {
        let filter = RelationFilter::by_source(user_id).with_type(RelationType::Block);
        self.page(&filter, page, page_size)
    }

    pub fn count_followers(&self, user_id: &str) -> Result<usize, ServiceError> {
        Ok(self.scan_matching(&followers_of(user_id))?.len())
    }

    pub fn count_following(&self, user_id: &str) -> Result<usize, ServiceError> {
        Ok(self.scan_matching(&following_of(user_id))?.len())
    }

    /// Start an atomic multi-edge write.
    pub fn transaction(&self) -> RelationTxn<'_> {
        RelationTxn {
            store: self,
            ops: Vec::new(),
            created: None,
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn page(
        &self,
        filter: &RelationFilter,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<Relation>, ServiceError> {
        Ok(Page::slice(self.scan_matching(filter)?, page, page_size).data)
    }

    /// Scan the narrowest keyspace for `filter` and return matches in
    /// insertion order.
    fn scan_matching(&self, filter: &RelationFilter) -> Result<Vec<Relation>, ServiceError> {
        let prefix = match (&filter.source, &filter.dest) {
            (Some(source), _) => outgoing_prefix(source),
            (None, Some(dest)) => incoming_prefix(dest),
            (None, None) => EDGE_PREFIX.to_string(),
        };

        let entries = self.kv.scan(&prefix).map_err(kv_err)?;
        let mut relations = Vec::with_capacity(entries.len());
        for (_key, bytes) in entries {
            let relation = decode(&bytes)?;
            if filter.matches(&relation) {
                relations.push(relation);
            }
        }
        relations.sort_by_key(|r| r.seq);

        debug!(prefix = %prefix, matched = relations.len(), "relation scan");
        Ok(relations)
    }

    fn build(&self, key: &RelationKey) -> Relation {
        Relation {
            id: new_id(),
            source: key.source.clone(),
            dest: key.dest.clone(),
            relation_type: key.relation_type,
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            created_at: now_rfc3339(),
        }
    }
}

// ---------------------------------------------------------------------------
// RelationTxn
// ---------------------------------------------------------------------------

/// A batch of edge writes committed as one KV transaction.
///
/// Guards are re-checked inside the write transaction, so a batch built from
/// stale reads fails instead of breaking an invariant.
pub struct RelationTxn<'a> {
    store: &'a RelationStore,
    ops: Vec<KVOp>,
    created: Option<Relation>,
}

impl RelationTxn<'_> {
    /// Abort the commit with Conflict if `key` exists at commit time.
    pub fn require_absent(mut self, key: &RelationKey) -> Self {
        self.ops.push(KVOp::AssertAbsent { key: key.edge_key() });
        self
    }

    /// Remove the edge for `key` if it exists at commit time.
    pub fn remove_if_exists(mut self, key: &RelationKey) -> Self {
        self.ops.push(KVOp::Delete { key: key.edge_key() });
        self.ops.push(KVOp::Delete { key: key.incoming_key() });
        self
    }

    /// Insert a new edge for `key`. At most one create per transaction.
    pub fn create(mut self, key: &RelationKey) -> Result<Self, ServiceError> {
        if key.source.is_empty() {
            return Err(ServiceError::Validation("relation source must not be empty".into()));
        }
        if key.dest.is_empty() {
            return Err(ServiceError::Validation("relation dest must not be empty".into()));
        }
        if self.created.is_some() {
            return Err(ServiceError::Internal("transaction already creates a relation".into()));
        }

        let relation = self.store.build(key);
        let bytes = encode(&relation)?;
        self.ops.push(KVOp::Insert {
            key: key.edge_key(),
            value: bytes.clone(),
        });
        self.ops.push(KVOp::Insert {
            key: key.incoming_key(),
            value: bytes,
        });
        self.created = Some(relation);
        Ok(self)
    }

    /// Apply every step atomically. Returns the created edge, if any.
    pub fn commit(self) -> Result<Option<Relation>, ServiceError> {
        self.store.kv.apply(&self.ops).map_err(commit_err)?;
        if let Some(relation) = &self.created {
            debug!(
                source = %relation.source,
                dest = %relation.dest,
                kind = %relation.relation_type,
                seq = relation.seq,
                "relation created"
            );
        }
        Ok(self.created)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn followers_of(user_id: &str) -> RelationFilter {
    RelationFilter::by_dest(user_id).with_type(RelationType::Follow)
}

fn following_of(user_id: &str) -> RelationFilter {
    RelationFilter::by_source(user_id).with_type(RelationType::Follow)
}

fn kv_err(e: KVError) -> ServiceError {
    match e {
        KVError::Conflict(key) => ServiceError::Conflict(format!("relation '{key}' already exists")),
        KVError::Missing(key) => ServiceError::NotFound(format!("relation '{key}' does not exist")),
        other => ServiceError::Storage(other.to_string()),
    }
}

/// Like [`kv_err`], but a guard failing here means a concurrent writer won
/// the race after our reads.
fn commit_err(e: KVError) -> ServiceError {
    if matches!(e, KVError::Conflict(_) | KVError::Missing(_)) {
        warn!(error = %e, "relation batch rejected at commit");
    }
    kv_err(e)
}

fn encode(relation: &Relation) -> Result<Vec<u8>, ServiceError> {
    serde_json::to_vec(relation).map_err(|e| ServiceError::Internal(format!("serialize: {e}")))
}

fn decode(bytes: &[u8]) -> Result<Relation, ServiceError> {
    serde_json::from_slice(bytes).map_err(|e| ServiceError::Internal(format!("deserialize: {e}")))
}

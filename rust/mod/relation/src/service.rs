use std::sync::Arc;

use relgraph_core::{Page, ServiceError};
use tracing::{debug, info};

use crate::model::{Relation, RelationFilter, RelationKey, RelationState, RelationStats};
use crate::profile::ProfileLookup;
use crate::store::RelationStore;

/// Configuration for the relation service.
#[derive(Debug, Clone)]
pub struct RelationConfig {
    /// Items per page for every listing (default: 10).
    pub page_size: usize,
    /// Shortest accepted identifier, in characters (default: 1).
    pub id_min_len: usize,
    /// Longest accepted identifier, in characters (default: 256).
    pub id_max_len: usize,
}

impl Default for RelationConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            id_min_len: 1,
            id_max_len: 256,
        }
    }
}

impl RelationConfig {
    /// Parse `--page-size=N` and `--id-max-len=N`. Missing, zero or
    /// unparsable values keep their defaults.
    pub fn from_args(args: &[String]) -> Self {
        let mut config = RelationConfig::default();

        for arg in args {
            if let Some(val) = arg.strip_prefix("--page-size=") {
                if let Some(n) = parse_positive(val) {
                    config.page_size = n;
                }
            } else if let Some(val) = arg.strip_prefix("--id-max-len=") {
                if let Some(n) = parse_positive(val) {
                    config.id_max_len = n;
                }
            }
        }

        config
    }
}

fn parse_positive(val: &str) -> Option<usize> {
    val.parse().ok().filter(|n| *n > 0)
}

/// The relation service: owns every FOLLOW/BLOCK rule.
///
/// Holds no mutable state of its own; share it across threads via `Arc`.
/// Every write is a single [`RelationStore::transaction`], so the checks that
/// guard an invariant are repeated inside the commit.
pub struct RelationService {
    store: Arc<RelationStore>,
    profiles: Arc<dyn ProfileLookup>,
    config: RelationConfig,
}

impl RelationService {
    pub fn new(
        store: Arc<RelationStore>,
        profiles: Arc<dyn ProfileLookup>,
        config: RelationConfig,
    ) -> Arc<Self> {
        info!(page_size = config.page_size, "relation service ready");
        Arc::new(Self {
            store,
            profiles,
            config,
        })
    }

    pub fn config(&self) -> &RelationConfig {
        &self.config
    }

    // ── Mutations ──

    /// `source` starts following `dest`.
    pub fn follow(&self, source: &str, dest: &str) -> Result<Relation, ServiceError> {
        self.precheck(source, dest)?;

        let follow = RelationKey::follow(source, dest);
        let blocked_by_dest = RelationKey::block(dest, source);
        let blocking_dest = RelationKey::block(source, dest);

        if self.exists(&blocked_by_dest)? {
            return Err(ServiceError::Conflict("cannot follow user which blocked you.".into()));
        }
        if self.exists(&blocking_dest)? {
            return Err(ServiceError::Conflict("cannot follow blocked user.".into()));
        }
        if self.exists(&follow)? {
            return Err(ServiceError::Conflict(
                "source user has already followed destination user.".into(),
            ));
        }

        let relation = self
            .store
            .transaction()
            .require_absent(&blocked_by_dest)
            .require_absent(&blocking_dest)
            .create(&follow)?
            .commit()?
            .ok_or_else(|| ServiceError::Internal("follow commit returned no relation".into()))?;

        debug!(%source, %dest, "followed");
        Ok(relation)
    }

    /// `source` stops following `dest`.
    pub fn unfollow(&self, source: &str, dest: &str) -> Result<(), ServiceError> {
        self.precheck(source, dest)?;

        let follow = RelationKey::follow(source, dest);
        if !self.exists(&follow)? {
            return Err(ServiceError::NotFound("user is not followed.".into()));
        }
        self.store.delete_relation(&RelationFilter::from(&follow))?;

        debug!(%source, %dest, "unfollowed");
        Ok(())
    }

    /// `source` blocks `dest`, severing FOLLOW edges in both directions.
    ///
    /// A block by `dest` on `source` does not prevent this; both directions
    /// may hold at once.
    pub fn block(&self, source: &str, dest: &str) -> Result<Relation, ServiceError> {
        self.precheck(source, dest)?;

        let block = RelationKey::block(source, dest);
        if self.exists(&block)? {
            return Err(ServiceError::Conflict("user is already blocked.".into()));
        }

        let follow = RelationKey::follow(source, dest);
        let relation = self
            .store
            .transaction()
            .remove_if_exists(&follow)
            .remove_if_exists(&follow.reversed())
            .create(&block)?
            .commit()?
            .ok_or_else(|| ServiceError::Internal("block commit returned no relation".into()))?;

        debug!(%source, %dest, "blocked");
        Ok(relation)
    }

    /// `source` lifts its block on `dest`. Follows severed by the block stay
    /// severed.
    pub fn unblock(&self, source: &str, dest: &str) -> Result<(), ServiceError> {
        self.precheck(source, dest)?;

        let block = RelationKey::block(source, dest);
        if !self.exists(&block)? {
            return Err(ServiceError::NotFound("user is not blocked.".into()));
        }
        self.store.delete_relation(&RelationFilter::from(&block))?;

        debug!(%source, %dest, "unblocked");
        Ok(())
    }

    // ── Pair queries ──

    /// Whether `source` has blocked `dest`.
    pub fn is_blocked(&self, source: &str, dest: &str) -> Result<bool, ServiceError> {
        self.precheck(source, dest)?;
        self.exists(&RelationKey::block(source, dest))
    }

    /// Whether `source` follows `dest`.
    pub fn has_followed(&self, source: &str, dest: &str) -> Result<bool, ServiceError> {
        self.precheck(source, dest)?;
        self.exists(&RelationKey::follow(source, dest))
    }

    /// Every FOLLOW/BLOCK edge between the two users, seen from `source`.
    pub fn get_state(&self, source: &str, dest: &str) -> Result<RelationState, ServiceError> {
        self.precheck(source, dest)?;
        Ok(RelationState {
            following: self.exists(&RelationKey::follow(source, dest))?,
            followed_by: self.exists(&RelationKey::follow(dest, source))?,
            blocking: self.exists(&RelationKey::block(source, dest))?,
            blocked_by: self.exists(&RelationKey::block(dest, source))?,
        })
    }

    // ── Listings ──

    pub fn get_relations(&self, page: usize, user_id: &str) -> Result<Page<Relation>, ServiceError> {
        self.validate_id("userId", user_id)?;
        let data = self.store.get_relations(page, self.config.page_size, user_id)?;
        Ok(self.wrap(page, data))
    }

    pub fn get_followers(&self, page: usize, user_id: &str) -> Result<Page<Relation>, ServiceError> {
        self.validate_id("userId", user_id)?;
        let data = self.store.get_followers(page, self.config.page_size, user_id)?;
        Ok(self.wrap(page, data))
    }

    pub fn get_following(&self, page: usize, user_id: &str) -> Result<Page<Relation>, ServiceError> {
        self.validate_id("userId", user_id)?;
        let data = self.store.get_following(page, self.config.page_size, user_id)?;
        Ok(self.wrap(page, data))
    }

    pub fn get_blocked_users(
        &self,
        page: usize,
        user_id: &str,
    ) -> Result<Page<Relation>, ServiceError> {
        self.validate_id("userId", user_id)?;
        let data = self.store.get_blocked_users(page, self.config.page_size, user_id)?;
        Ok(self.wrap(page, data))
    }

    /// Follower and following counts for an existing user.
    pub fn get_relation_stats(&self, user_id: &str) -> Result<RelationStats, ServiceError> {
        self.validate_id("userId", user_id)?;
        if self.profiles.resolve(user_id)?.is_none() {
            return Err(ServiceError::NotFound("profile does not exist.".into()));
        }
        Ok(RelationStats {
            followers: self.store.count_followers(user_id)?,
            following: self.store.count_following(user_id)?,
        })
    }

    // ── Internals ──

    /// Shape check plus existence of both identities. Runs before every
    /// pair operation.
    fn precheck(&self, source: &str, dest: &str) -> Result<(), ServiceError> {
        self.validate_id("source", source)?;
        self.validate_id("dest", dest)?;

        if self.profiles.resolve(source)?.is_none() {
            return Err(ServiceError::NotFound("source profile does not exist.".into()));
        }
        if self.profiles.resolve(dest)?.is_none() {
            return Err(ServiceError::NotFound("destination profile does not exist.".into()));
        }
        Ok(())
    }

    fn validate_id(&self, field: &str, id: &str) -> Result<(), ServiceError> {
        let len = id.chars().count();
        if len < self.config.id_min_len || len > self.config.id_max_len {
            return Err(ServiceError::Validation(format!(
                "invalid request: {field} must be {}..={} characters",
                self.config.id_min_len, self.config.id_max_len
            )));
        }
        Ok(())
    }

    fn exists(&self, key: &RelationKey) -> Result<bool, ServiceError> {
        Ok(self.store.find_relation(&RelationFilter::from(key))?.is_some())
    }

    fn wrap(&self, page: usize, data: Vec<Relation>) -> Page<Relation> {
        Page {
            page_size: self.config.page_size,
            current_page: page,
            data,
        }
    }
}

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RelationType
// ---------------------------------------------------------------------------

/// Kind of a directed edge between two users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    /// `source` follows `dest`.
    Follow,
    /// `source` has blocked `dest`.
    Block,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Follow => "FOLLOW",
            Self::Block => "BLOCK",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "FOLLOW" => Some(Self::Follow),
            "BLOCK" => Some(Self::Block),
            _ => None,
        }
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Prefix of primary edge records, ordered by source.
pub const EDGE_PREFIX: &str = "rel:edge:";

/// Prefix of the incoming-edge index, ordered by dest.
pub const INCOMING_PREFIX: &str = "rel:in:";

/// Length-prefixed key segment. `3:bob:` can never be a prefix of another
/// id's segment, whatever characters the ids contain.
fn segment(id: &str) -> String {
    format!("{}:{}:", id.len(), id)
}

/// Prefix of every edge whose source is `source`.
pub fn outgoing_prefix(source: &str) -> String {
    format!("{EDGE_PREFIX}{}", segment(source))
}

/// Prefix of every index entry whose dest is `dest`.
pub fn incoming_prefix(dest: &str) -> String {
    format!("{INCOMING_PREFIX}{}", segment(dest))
}

/// The identifying triple of an edge. At most one edge exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationKey {
    pub source: String,
    pub dest: String,
    pub relation_type: RelationType,
}

impl RelationKey {
    pub fn new(source: &str, dest: &str, relation_type: RelationType) -> Self {
        Self {
            source: source.to_string(),
            dest: dest.to_string(),
            relation_type,
        }
    }

    pub fn follow(source: &str, dest: &str) -> Self {
        Self::new(source, dest, RelationType::Follow)
    }

    pub fn block(source: &str, dest: &str) -> Self {
        Self::new(source, dest, RelationType::Block)
    }

    /// Same type, opposite direction.
    pub fn reversed(&self) -> Self {
        Self {
            source: self.dest.clone(),
            dest: self.source.clone(),
            relation_type: self.relation_type,
        }
    }

    /// KV key of the primary record.
    pub fn edge_key(&self) -> String {
        format!(
            "{}{}{}",
            outgoing_prefix(&self.source),
            segment(&self.dest),
            self.relation_type.as_str()
        )
    }

    /// KV key of the incoming index entry.
    pub fn incoming_key(&self) -> String {
        format!(
            "{}{}{}",
            incoming_prefix(&self.dest),
            segment(&self.source),
            self.relation_type.as_str()
        )
    }
}

// ---------------------------------------------------------------------------
// Relation: the stored edge
// ---------------------------------------------------------------------------

/// A directed, typed edge between two users.
///
/// For example, if user A follows user B, `source` is A, `dest` is B and the
/// type is `FOLLOW`. Edges are never updated: state changes are a delete
/// followed by a create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub id: String,
    pub source: String,
    pub dest: String,
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    /// Insertion number assigned by the store; listings are ordered by it.
    pub seq: u64,
    pub created_at: String,
}

impl Relation {
    pub fn key(&self) -> RelationKey {
        RelationKey::new(&self.source, &self.dest, self.relation_type)
    }
}

// ---------------------------------------------------------------------------
// RelationFilter
// ---------------------------------------------------------------------------

/// Lookup filter over edges. Present fields are AND-ed; an empty filter
/// matches every edge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationFilter {
    pub source: Option<String>,
    pub dest: Option<String>,
    pub relation_type: Option<RelationType>,
}

impl RelationFilter {
    pub fn by_source(source: &str) -> Self {
        Self {
            source: Some(source.to_string()),
            ..Default::default()
        }
    }

    pub fn by_dest(dest: &str) -> Self {
        Self {
            dest: Some(dest.to_string()),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, relation_type: RelationType) -> Self {
        self.relation_type = Some(relation_type);
        self
    }

    pub fn matches(&self, relation: &Relation) -> bool {
        self.source.as_deref().is_none_or(|s| s == relation.source)
            && self.dest.as_deref().is_none_or(|d| d == relation.dest)
            && self.relation_type.is_none_or(|t| t == relation.relation_type)
    }

    /// The single key this filter can match, when every field is set.
    pub fn exact_key(&self) -> Option<RelationKey> {
        match (&self.source, &self.dest, self.relation_type) {
            (Some(source), Some(dest), Some(relation_type)) => {
                Some(RelationKey::new(source, dest, relation_type))
            }
            _ => None,
        }
    }
}

impl From<&RelationKey> for RelationFilter {
    fn from(key: &RelationKey) -> Self {
        Self {
            source: Some(key.source.clone()),
            dest: Some(key.dest.clone()),
            relation_type: Some(key.relation_type),
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregate views
// ---------------------------------------------------------------------------

/// Both directions of FOLLOW and BLOCK between a viewer and another user,
/// from the viewer's side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationState {
    /// viewer → other FOLLOW
    pub following: bool,
    /// other → viewer FOLLOW
    pub followed_by: bool,
    /// viewer → other BLOCK
    pub blocking: bool,
    /// other → viewer BLOCK
    pub blocked_by: bool,
}

/// Follower and following counts for one user, computed on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationStats {
    pub followers: usize,
    pub following: usize,
}

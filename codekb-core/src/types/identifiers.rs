//! Stable identifiers.
//!
//! `EntityId` is content-addressed: hashing `(file_path, kind, name, line)`
//! gives the same id across re-analyses of an unchanged entity, so a graph
//! node survives reanalysis of the entity that produced it instead of being
//! torn down and recreated under a new id every run (see DESIGN.md).

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::Xxh3;

/// Content-addressed identity for a `CodeEntity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Derive a stable id from the fields that define entity identity.
    pub fn content_addressed(file_path: &str, kind: &str, name: &str, line: u32) -> Self {
        let mut hasher = Xxh3::new();
        file_path.hash(&mut hasher);
        kind.hash(&mut hasher);
        name.hash(&mut hasher);
        line.hash(&mut hasher);
        Self(hasher.finish())
    }

    /// Mint a fresh id when no stable fields are available (e.g. a
    /// synthesized external placeholder with no source line).
    pub fn fresh() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ent:{:016x}", self.0)
    }
}

/// Identity for a `CodeRelationship`. Relationships are not content-stable —
/// they are reminted on every resolver run (the edge set itself is
/// deterministic given the same inputs; only the ids are fresh).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationshipId(pub u64);

impl RelationshipId {
    pub fn fresh() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rel:{:016x}", self.0)
    }
}

/// Identity for a submitted `AnalysisTask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub u64);

impl TaskId {
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task:{}", self.0)
    }
}

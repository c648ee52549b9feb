//! Node/edge payloads and the opaque query primitives.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub u64);

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_EDGE_ID: AtomicU64 = AtomicU64::new(1);

impl NodeId {
    pub fn fresh() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl EdgeId {
    pub fn fresh() -> Self {
        Self(NEXT_EDGE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub kind: String,
    pub props: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: EdgeId,
    pub kind: String,
    pub props: Value,
}

/// A node/timestamp/importance triple tracked by the temporal surface,
/// independent of whether the node also carries a structural edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalEntry {
    pub node_id: NodeId,
    pub timestamp_ms: u64,
    pub importance: f64,
}

/// The opaque query surface — an internal enum standing in for a full
/// expression language; callers treat it as opaque rather than building on
/// its variant shape directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum QueryExpr {
    ByKind { kind: String },
    KHop { start: NodeId, depth: usize },
    ShortestPath { from: NodeId, to: NodeId, max_depth: usize },
    PropertyPredicate { key: String, value: Value },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum QueryResult {
    Nodes(Vec<NodeId>),
    Path(Option<Vec<NodeId>>),
}

/// One staged mutation inside a transaction.
#[derive(Debug, Clone)]
pub enum Mutation {
    CreateNode { kind: String, props: Value },
    CreateEdge { source: NodeId, target: NodeId, kind: String, props: Value },
    RemoveNode { id: NodeId },
    RemoveEdge { id: EdgeId },
}

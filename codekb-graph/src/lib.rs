//! # codekb-graph
//!
//! The typed node/edge knowledge graph store: CRUD over a
//! `petgraph::stable_graph::StableGraph`, `k`-hop/shortest-path/kind
//! queries behind an opaque expression enum, a temporal surface
//! (insertion-by-timestamp, range retrieval, sequence traversal, decay),
//! and atomic multi-mutation transactions.

pub mod graph;
pub mod temporal;
pub mod types;

pub use graph::KnowledgeGraph;
pub use temporal::TemporalStore;
pub use types::{EdgeId, GraphEdge, GraphNode, Mutation, NodeId, QueryExpr, QueryResult, TemporalEntry};

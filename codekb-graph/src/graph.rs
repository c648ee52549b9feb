//! The graph store itself: `Arc<RwLock<StableGraph<_, _>>>` plus an id
//! index. Deliberately does not enforce acyclicity — code dependency/call
//! graphs routinely contain cycles (mutual recursion, circular imports),
//! so no DAG check runs on `create_edge`.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use codekb_core::{EngineError, FxHashMap};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::Direction;
use serde_json::Value;

use crate::types::{EdgeId, GraphEdge, GraphNode, Mutation, NodeId, QueryExpr, QueryResult};

struct Inner {
    graph: StableGraph<GraphNode, GraphEdge>,
    node_index: FxHashMap<NodeId, NodeIndex>,
    edge_index: FxHashMap<EdgeId, EdgeIndex>,
}

impl Inner {
    fn new() -> Self {
        Self {
            graph: StableGraph::new(),
            node_index: FxHashMap::default(),
            edge_index: FxHashMap::default(),
        }
    }
}

/// The typed node/edge store.
pub struct KnowledgeGraph {
    inner: Arc<RwLock<Inner>>,
    schema_version: u32,
}

impl KnowledgeGraph {
    pub fn new(schema_version: u32) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::new())),
            schema_version,
        }
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn create_node(&self, kind: impl Into<String>, props: Value) -> NodeId {
        let id = NodeId::fresh();
        let mut guard = self.write();
        let idx = guard.graph.add_node(GraphNode { id, kind: kind.into(), props });
        guard.node_index.insert(id, idx);
        id
    }

    pub fn create_edge(
        &self,
        source: NodeId,
        target: NodeId,
        kind: impl Into<String>,
        props: Value,
    ) -> Result<EdgeId, EngineError> {
        let mut guard = self.write();
        let source_idx = *guard
            .node_index
            .get(&source)
            .ok_or_else(|| EngineError::NotFound(format!("node {}", source.0)))?;
        let target_idx = *guard
            .node_index
            .get(&target)
            .ok_or_else(|| EngineError::NotFound(format!("node {}", target.0)))?;
        let id = EdgeId::fresh();
        let edge_idx = guard
            .graph
            .add_edge(source_idx, target_idx, GraphEdge { id, kind: kind.into(), props });
        guard.edge_index.insert(id, edge_idx);
        Ok(id)
    }

    pub fn remove_node(&self, id: NodeId) -> bool {
        let mut guard = self.write();
        match guard.node_index.remove(&id) {
            Some(idx) => {
                guard.graph.remove_node(idx);
                true
            }
            None => false,
        }
    }

    pub fn remove_edge(&self, id: EdgeId) -> bool {
        let mut guard = self.write();
        match guard.edge_index.remove(&id) {
            Some(idx) => {
                guard.graph.remove_edge(idx);
                true
            }
            None => false,
        }
    }

    pub fn node_count(&self) -> usize {
        self.read().graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.read().graph.edge_count()
    }

    pub fn get_node(&self, id: NodeId) -> Option<GraphNode> {
        let guard = self.read();
        guard
            .node_index
            .get(&id)
            .and_then(|idx| guard.graph.node_weight(*idx).cloned())
    }

    pub fn find_nodes_by_kind(&self, kind: &str) -> Vec<NodeId> {
        let guard = self.read();
        guard
            .graph
            .node_weights()
            .filter(|n| n.kind == kind)
            .map(|n| n.id)
            .collect()
    }

    /// BFS over both directions up to `max_depth`, excluding `start` itself.
    pub fn find_related(&self, start: NodeId, max_depth: usize) -> Vec<NodeId> {
        let guard = self.read();
        let Some(&start_idx) = guard.node_index.get(&start) else {
            return Vec::new();
        };

        let mut visited: FxHashMap<NodeIndex, usize> = FxHashMap::default();
        visited.insert(start_idx, 0);
        let mut queue = VecDeque::new();
        queue.push_back(start_idx);
        let mut related = Vec::new();

        while let Some(current) = queue.pop_front() {
            let depth = visited[&current];
            if depth >= max_depth {
                continue;
            }
            for neighbor in guard
                .graph
                .neighbors_directed(current, Direction::Outgoing)
                .chain(guard.graph.neighbors_directed(current, Direction::Incoming))
            {
                if visited.contains_key(&neighbor) {
                    continue;
                }
                visited.insert(neighbor, depth + 1);
                if let Some(node) = guard.graph.node_weight(neighbor) {
                    related.push(node.id);
                }
                queue.push_back(neighbor);
            }
        }

        related
    }

    /// Unweighted BFS shortest path (outgoing edges only), capped at
    /// `max_depth` hops.
    pub fn shortest_path(&self, from: NodeId, to: NodeId, max_depth: usize) -> Option<Vec<NodeId>> {
        let guard = self.read();
        let from_idx = *guard.node_index.get(&from)?;
        let to_idx = *guard.node_index.get(&to)?;

        if from_idx == to_idx {
            return Some(vec![from]);
        }

        let mut visited: FxHashMap<NodeIndex, NodeIndex> = FxHashMap::default();
        let mut queue = VecDeque::new();
        queue.push_back((from_idx, 0usize));
        visited.insert(from_idx, from_idx);

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for neighbor in guard.graph.neighbors_directed(current, Direction::Outgoing) {
                if visited.contains_key(&neighbor) {
                    continue;
                }
                visited.insert(neighbor, current);
                if neighbor == to_idx {
                    return Some(reconstruct_path(&guard.graph, &visited, from_idx, to_idx));
                }
                queue.push_back((neighbor, depth + 1));
            }
        }

        None
    }

    pub fn query(&self, expr: &QueryExpr) -> QueryResult {
        match expr {
            QueryExpr::ByKind { kind } => QueryResult::Nodes(self.find_nodes_by_kind(kind)),
            QueryExpr::KHop { start, depth } => QueryResult::Nodes(self.find_related(*start, *depth)),
            QueryExpr::ShortestPath { from, to, max_depth } => {
                QueryResult::Path(self.shortest_path(*from, *to, *max_depth))
            }
            QueryExpr::PropertyPredicate { key, value } => {
                let guard = self.read();
                let nodes = guard
                    .graph
                    .node_weights()
                    .filter(|n| n.props.get(key) == Some(value))
                    .map(|n| n.id)
                    .collect();
                QueryResult::Nodes(nodes)
            }
        }
    }

    /// Apply a batch of mutations atomically: validated up front so a
    /// reference to a not-yet-created node fails the whole batch before
    /// any mutation is applied.
    pub fn apply_transaction(
        &self,
        mutations: Vec<Mutation>,
        expected_schema_version: u32,
    ) -> Result<(Vec<NodeId>, Vec<EdgeId>), EngineError> {
        if expected_schema_version != self.schema_version {
            return Err(EngineError::SchemaMismatch {
                expected: self.schema_version,
                found: expected_schema_version,
            });
        }

        let mut guard = self.write();
        let mut created_nodes = Vec::new();
        let mut created_edges = Vec::new();

        // Edge endpoints must already exist: `NodeId`s are minted at
        // creation time, so a batch can never reference a node it also
        // creates — validate against the pre-transaction graph only.
        for mutation in &mutations {
            if let Mutation::CreateEdge { source, target, .. } = mutation {
                if !guard.node_index.contains_key(source) || !guard.node_index.contains_key(target) {
                    return Err(EngineError::NotFound(format!(
                        "edge endpoint {}/{} not present",
                        source.0, target.0
                    )));
                }
            }
        }

        for mutation in mutations {
            match mutation {
                Mutation::CreateNode { kind, props } => {
                    let id = NodeId::fresh();
                    let idx = guard.graph.add_node(GraphNode { id, kind, props });
                    guard.node_index.insert(id, idx);
                    created_nodes.push(id);
                }
                Mutation::CreateEdge { source, target, kind, props } => {
                    let source_idx = guard.node_index[&source];
                    let target_idx = guard.node_index[&target];
                    let id = EdgeId::fresh();
                    let edge_idx = guard.graph.add_edge(source_idx, target_idx, GraphEdge { id, kind, props });
                    guard.edge_index.insert(id, edge_idx);
                    created_edges.push(id);
                }
                Mutation::RemoveNode { id } => {
                    if let Some(idx) = guard.node_index.remove(&id) {
                        guard.graph.remove_node(idx);
                    }
                }
                Mutation::RemoveEdge { id } => {
                    if let Some(idx) = guard.edge_index.remove(&id) {
                        guard.graph.remove_edge(idx);
                    }
                }
            }
        }

        Ok((created_nodes, created_edges))
    }
}

fn reconstruct_path(
    _graph: &StableGraph<GraphNode, GraphEdge>,
    visited: &FxHashMap<NodeIndex, NodeIndex>,
    from: NodeIndex,
    to: NodeIndex,
) -> Vec<NodeId> {
    let mut path_idx = vec![to];
    let mut current = to;
    while current != from {
        current = visited[&current];
        path_idx.push(current);
    }
    path_idx.reverse();
    path_idx
        .into_iter()
        .filter_map(|idx| _graph.node_weight(idx).map(|n| n.id))
        .collect()
}

impl Clone for KnowledgeGraph {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            schema_version: self.schema_version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_node_and_edge_then_find_by_kind() {
        let graph = KnowledgeGraph::new(1);
        let a = graph.create_node("Function", json!({"name": "a"}));
        let b = graph.create_node("Function", json!({"name": "b"}));
        graph.create_edge(a, b, "Calls", Value::Null).unwrap();

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.find_nodes_by_kind("Function").len(), 2);
    }

    #[test]
    fn shortest_path_finds_a_b_c_chain() {
        let graph = KnowledgeGraph::new(1);
        let a = graph.create_node("N", Value::Null);
        let b = graph.create_node("N", Value::Null);
        let c = graph.create_node("N", Value::Null);
        graph.create_edge(a, b, "E", Value::Null).unwrap();
        graph.create_edge(b, c, "E", Value::Null).unwrap();

        let path = graph.shortest_path(a, c, 5).unwrap();
        assert_eq!(path, vec![a, b, c]);
    }

    #[test]
    fn shortest_path_respects_max_depth() {
        let graph = KnowledgeGraph::new(1);
        let a = graph.create_node("N", Value::Null);
        let b = graph.create_node("N", Value::Null);
        let c = graph.create_node("N", Value::Null);
        graph.create_edge(a, b, "E", Value::Null).unwrap();
        graph.create_edge(b, c, "E", Value::Null).unwrap();

        assert!(graph.shortest_path(a, c, 1).is_none());
    }

    #[test]
    fn cyclic_graph_is_accepted() {
        let graph = KnowledgeGraph::new(1);
        let a = graph.create_node("N", Value::Null);
        let b = graph.create_node("N", Value::Null);
        graph.create_edge(a, b, "Calls", Value::Null).unwrap();
        let result = graph.create_edge(b, a, "Calls", Value::Null);
        assert!(result.is_ok());
    }

    #[test]
    fn transaction_rolls_back_entirely_on_bad_edge_endpoint() {
        let graph = KnowledgeGraph::new(1);
        let a = graph.create_node("N", Value::Null);
        let bogus = NodeId(999_999);

        let result = graph.apply_transaction(
            vec![
                Mutation::CreateNode { kind: "N".into(), props: Value::Null },
                Mutation::CreateEdge { source: a, target: bogus, kind: "E".into(), props: Value::Null },
            ],
            1,
        );

        assert!(result.is_err());
        // Nothing from the failed batch should have landed.
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn transaction_with_schema_mismatch_is_rejected() {
        let graph = KnowledgeGraph::new(2);
        let err = graph
            .apply_transaction(vec![Mutation::CreateNode { kind: "N".into(), props: Value::Null }], 1)
            .unwrap_err();
        assert!(matches!(err, EngineError::SchemaMismatch { expected: 2, found: 1 }));
    }
}

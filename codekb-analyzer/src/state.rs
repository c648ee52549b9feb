//! `AnalyzerState`: the analyzer's memory-resident view of "what is
//! currently known", kept in lock-step with the knowledge graph. Every
//! mutation that touches more than one map happens inside a single
//! `Mutex<Inner>` critical section so a concurrent reader never observes a
//! half-updated file — a file's whole entity set is replaced atomically.

use std::sync::Mutex;

use codekb_core::types::{CodeRelationship, EntityId, ExportInfo};
use codekb_core::FxHashMap;
use codekb_graph::{EdgeId, KnowledgeGraph, NodeId};
use codekb_resolver::binding::module_entity_id;
use codekb_resolver::{FileAnalysis, FileDependencyGraph, ResolverOutput};
use serde_json::json;

use crate::persist::{relationship_kind_str, EXTERNAL_NODE_KIND, FILE_NODE_KIND};

struct Inner {
    file_analyses: FxHashMap<String, FileAnalysis>,
    file_hashes: FxHashMap<String, u64>,
    entity_nodes: FxHashMap<EntityId, NodeId>,
    file_entities: FxHashMap<String, Vec<EntityId>>,
    module_nodes: FxHashMap<String, NodeId>,
    resolver_edges: Vec<EdgeId>,
    dependency_edges: Vec<EdgeId>,
    file_dependency_graph: FileDependencyGraph,
}

/// Tracks per-file analysis results and their projection into the knowledge
/// graph, so a reanalysis or removal can be applied as one atomic swap.
pub struct AnalyzerState {
    inner: Mutex<Inner>,
}

impl AnalyzerState {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                file_analyses: FxHashMap::default(),
                file_hashes: FxHashMap::default(),
                entity_nodes: FxHashMap::default(),
                file_entities: FxHashMap::default(),
                module_nodes: FxHashMap::default(),
                resolver_edges: Vec::new(),
                dependency_edges: Vec::new(),
                file_dependency_graph: FileDependencyGraph::default(),
            }),
        }
    }

    /// `true` if `path` is unseen or its content hash has changed.
    pub fn needs_analysis(&self, path: &str, content_hash: u64) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.file_hashes.get(path) != Some(&content_hash)
    }

    pub fn known_files(&self) -> Vec<String> {
        self.inner.lock().unwrap().file_analyses.keys().cloned().collect()
    }

    pub fn exports_of(&self, path: &str) -> Vec<ExportInfo> {
        self.inner
            .lock()
            .unwrap()
            .file_analyses
            .get(path)
            .map(|fa| fa.exports.clone())
            .unwrap_or_default()
    }

    pub fn dependents_of(&self, path: &str) -> Vec<String> {
        self.inner.lock().unwrap().file_dependency_graph.dependents(path)
    }

    pub fn snapshot_file_analyses(&self) -> Vec<FileAnalysis> {
        self.inner.lock().unwrap().file_analyses.values().cloned().collect()
    }

    fn ensure_module_node(inner: &mut Inner, graph: &KnowledgeGraph, path: &str) -> NodeId {
        if let Some(&id) = inner.module_nodes.get(path) {
            return id;
        }
        let id = graph.create_node(FILE_NODE_KIND, json!({"file_path": path}));
        inner.module_nodes.insert(path.to_string(), id);
        id
    }

    /// Lazily materialize a graph node for an entity id that has no
    /// `CodeEntity` of its own yet — an external placeholder, or the
    /// synthetic per-file module id used as a resolver binding target.
    fn ensure_entity_node(inner: &mut Inner, graph: &KnowledgeGraph, id: EntityId) -> NodeId {
        if let Some(&node) = inner.entity_nodes.get(&id) {
            return node;
        }
        let node = graph.create_node(EXTERNAL_NODE_KIND, json!({"entity_id": id.0}));
        inner.entity_nodes.insert(id, node);
        node
    }

    /// Atomically swap in a fresh analysis for `path`: drop its previous
    /// entity nodes, ensure its module node, create nodes for every entity
    /// in the new analysis, and record the new hash/analysis.
    pub fn replace_file(&self, graph: &KnowledgeGraph, content_hash: u64, analysis: FileAnalysis) {
        let mut inner = self.inner.lock().unwrap();
        let path = analysis.file_path.clone();

        if let Some(old_ids) = inner.file_entities.remove(&path) {
            for id in old_ids {
                if let Some(node) = inner.entity_nodes.remove(&id) {
                    graph.remove_node(node);
                }
            }
        }

        Self::ensure_module_node(&mut inner, graph, &path);

        let mut new_ids = Vec::with_capacity(analysis.entities.len());
        for entity in &analysis.entities {
            let node = graph.create_node(
                entity.kind.as_str(),
                json!({
                    "name": entity.name,
                    "file_path": entity.file_path,
                    "line": entity.line,
                    "signature": entity.signature,
                    "metadata": entity.metadata,
                    "external": entity.external,
                }),
            );
            inner.entity_nodes.insert(entity.id, node);
            new_ids.push(entity.id);
        }
        inner.file_entities.insert(path.clone(), new_ids);
        inner.file_hashes.insert(path.clone(), content_hash);
        inner.file_analyses.insert(path, analysis);
    }

    /// Drop a file entirely: its entity nodes, its module node, and all
    /// bookkeeping, used when the watcher reports a `Removed` event.
    pub fn remove_file(&self, graph: &KnowledgeGraph, path: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(ids) = inner.file_entities.remove(path) {
            for id in ids {
                if let Some(node) = inner.entity_nodes.remove(&id) {
                    graph.remove_node(node);
                }
            }
        }
        if let Some(node) = inner.module_nodes.remove(path) {
            graph.remove_node(node);
        }
        inner.file_hashes.remove(path);
        inner.file_analyses.remove(path);
    }

    /// Replace every graph edge derived from the previous `resolve()` run
    /// with the edges in `output`. Relationship edges mint a fresh
    /// `RelationshipId` every call (see `codekb_resolver::resolve`), so the
    /// full old set is torn down first rather than diffed.
    pub fn persist_resolution(&self, graph: &KnowledgeGraph, output: ResolverOutput) {
        let mut inner = self.inner.lock().unwrap();

        for id in inner.resolver_edges.drain(..) {
            graph.remove_edge(id);
        }
        for id in inner.dependency_edges.drain(..) {
            graph.remove_edge(id);
        }

        let mut resolver_edges = Vec::with_capacity(output.resolved_edges.len());
        for edge in &output.resolved_edges {
            resolver_edges.push(Self::persist_relationship_edge(&mut inner, graph, edge));
        }

        let mut dependency_edges = Vec::new();
        for file in inner.file_analyses.keys().cloned().collect::<Vec<_>>() {
            for dep in output.file_dependency_graph.dependencies(&file) {
                let from = Self::ensure_module_node(&mut inner, graph, &file);
                let to = Self::ensure_module_node(&mut inner, graph, &dep);
                if let Ok(edge) = graph.create_edge(from, to, "FileDependsOn", serde_json::Value::Null) {
                    dependency_edges.push(edge);
                }
            }
        }

        inner.resolver_edges = resolver_edges;
        inner.dependency_edges = dependency_edges;
        inner.file_dependency_graph = output.file_dependency_graph;
    }

    fn persist_relationship_edge(
        inner: &mut Inner,
        graph: &KnowledgeGraph,
        edge: &CodeRelationship,
    ) -> EdgeId {
        let source = Self::ensure_entity_node(inner, graph, edge.source_id);
        let target = Self::ensure_entity_node(inner, graph, edge.target_id);
        graph
            .create_edge(
                source,
                target,
                relationship_kind_str(edge.kind),
                json!({"file_path": edge.file_path, "line": edge.line, "metadata": edge.metadata}),
            )
            .expect("both endpoints were just ensured to exist")
    }
}

impl Default for AnalyzerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a stable "module as a whole" entity id for `path`, used when
/// the caller needs to refer to a file without a specific entity (e.g. the
/// resolver's binding target for `Imports` edges).
pub fn module_id(path: &str) -> EntityId {
    module_entity_id(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codekb_core::types::{CodeEntity, EntityKind};

    fn graph() -> KnowledgeGraph {
        KnowledgeGraph::new(1)
    }

    fn analysis(path: &str, entity_name: &str) -> FileAnalysis {
        FileAnalysis {
            file_path: path.to_string(),
            entities: vec![CodeEntity::new(EntityKind::Function, entity_name, path, 1)],
            relationships: vec![],
            imports: vec![],
            exports: vec![],
        }
    }

    #[test]
    fn replace_file_creates_module_and_entity_nodes() {
        let g = graph();
        let state = AnalyzerState::new();
        state.replace_file(&g, 1, analysis("a.ts", "foo"));
        assert_eq!(g.node_count(), 2); // module node + 1 entity
        assert!(!state.needs_analysis("a.ts", 1));
        assert!(state.needs_analysis("a.ts", 2));
    }

    #[test]
    fn reanalysis_replaces_old_entities_without_leaking_nodes() {
        let g = graph();
        let state = AnalyzerState::new();
        state.replace_file(&g, 1, analysis("a.ts", "foo"));
        state.replace_file(&g, 2, analysis("a.ts", "bar"));
        // module node persists, old entity dropped, new entity created.
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn remove_file_drops_all_its_nodes() {
        let g = graph();
        let state = AnalyzerState::new();
        state.replace_file(&g, 1, analysis("a.ts", "foo"));
        state.remove_file(&g, "a.ts");
        assert_eq!(g.node_count(), 0);
        assert!(state.known_files().is_empty());
    }

    #[test]
    fn persist_resolution_replaces_edges_on_rerun() {
        let g = graph();
        let state = AnalyzerState::new();
        state.replace_file(&g, 1, analysis("a.ts", "foo"));
        state.replace_file(&g, 1, analysis("b.ts", "bar"));

        let foo_id = state.snapshot_file_analyses()[0].entities[0].id;
        let bar_id = state.snapshot_file_analyses()[1].entities[0].id;

        let mut output = ResolverOutput::default();
        output.resolved_edges.push(CodeRelationship::new(
            bar_id,
            foo_id,
            codekb_core::types::RelationshipKind::Calls,
            "b.ts",
            1,
        ));
        output.file_dependency_graph.add_edge("b.ts", "a.ts");
        state.persist_resolution(&g, output);
        assert_eq!(g.edge_count(), 2); // Calls edge + FileDependsOn edge

        // Rerunning resolution with no edges should tear down the old ones.
        state.persist_resolution(&g, ResolverOutput::default());
        assert_eq!(g.edge_count(), 0);
    }
}

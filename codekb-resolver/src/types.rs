//! Resolver inputs/outputs.

use codekb_core::types::{CodeEntity, CodeRelationship, ExportInfo, ImportInfo};
use codekb_core::FxHashSet;
use codekb_core::{errors::UnresolvedRef, FxHashMap};

/// One file's worth of analysis output — the resolver's unit of input.
#[derive(Debug, Clone, Default)]
pub struct FileAnalysis {
    pub file_path: String,
    pub entities: Vec<CodeEntity>,
    pub relationships: Vec<CodeRelationship>,
    pub imports: Vec<ImportInfo>,
    pub exports: Vec<ExportInfo>,
}

/// The union of `DependsOn(file -> file)` edges, queryable in both
/// directions.
#[derive(Debug, Clone, Default)]
pub struct FileDependencyGraph {
    dependencies: FxHashMap<String, FxHashSet<String>>,
    dependents: FxHashMap<String, FxHashSet<String>>,
}

impl FileDependencyGraph {
    pub fn add_edge(&mut self, from: &str, to: &str) {
        if from == to {
            return;
        }
        self.dependencies
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
        self.dependents
            .entry(to.to_string())
            .or_default()
            .insert(from.to_string());
    }

    /// Files that `file` depends on.
    pub fn dependencies(&self, file: &str) -> Vec<String> {
        self.dependencies
            .get(file)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Files that depend on `file`.
    pub fn dependents(&self, file: &str) -> Vec<String> {
        self.dependents
            .get(file)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResolverOutput {
    pub resolved_edges: Vec<CodeRelationship>,
    pub unresolved_refs: Vec<UnresolvedRef>,
    pub file_dependency_graph: FileDependencyGraph,
}

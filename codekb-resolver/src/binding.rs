//! Steps 3–5: import-export binding, call resolution, inheritance/type
//! resolution. The entry-point detection style is BFS-driven, the same
//! traversal shape as a call-graph walker, re-purposed here as "external
//! placeholder" rewriting.

use codekb_core::errors::UnresolvedRef;
use codekb_core::types::{
    CodeEntity, CodeRelationship, EntityId, EntityKind, RelationshipKind,
};
use codekb_core::FxHashMap;

use crate::index::ResolverIndex;
use crate::types::{FileAnalysis, FileDependencyGraph};

/// A synthetic, stable id standing in for "the file as a whole" — used as
/// the endpoint of `Imports`/`DependsOn` edges that aren't anchored to a
/// single entity.
pub fn module_entity_id(file_path: &str) -> EntityId {
    EntityId::content_addressed(file_path, "Module", file_path, 0)
}

/// Per-file map from a locally-bound name to the entity it resolves to.
/// Built during import-export binding, consumed during call/inheritance
/// resolution.
pub type VisibleSymbols<'a> = FxHashMap<&'a str, FxHashMap<String, EntityId>>;

pub struct BindingOutcome {
    pub import_edges: Vec<CodeRelationship>,
    pub unresolved_refs: Vec<UnresolvedRef>,
    pub dependency_edges: Vec<(String, String)>,
}

/// Step 3: bind every import specifier to its matching export (or an
/// external placeholder), producing `Imports` edges and a per-file visible
/// symbols table used by steps 4–5.
pub fn bind_imports<'a>(
    inputs: &'a [FileAnalysis],
    index: &ResolverIndex<'a>,
    resolved_sources: &FxHashMap<(&'a str, &'a str), Option<String>>,
) -> (BindingOutcome, VisibleSymbols<'a>) {
    let mut import_edges = Vec::new();
    let mut unresolved_refs = Vec::new();
    let mut dependency_edges = Vec::new();
    let mut visible: VisibleSymbols<'a> = FxHashMap::default();

    for file in inputs {
        let mut symbols: FxHashMap<String, EntityId> = FxHashMap::default();
        let source_module = module_entity_id(&file.file_path);

        for import in &file.imports {
            let resolved_file = resolved_sources
                .get(&(file.file_path.as_str(), import.source.as_str()))
                .cloned()
                .flatten();

            let Some(resolved_file) = resolved_file else {
                // External: bind to a stable placeholder so later steps can
                // still rewrite calls that reach into this symbol.
                let placeholder = CodeEntity::external_placeholder(&import.imported_name, &import.source);
                symbols.insert(import.local_name.clone(), placeholder.id);
                continue;
            };

            if import.is_namespace {
                symbols.insert(import.local_name.clone(), module_entity_id(&resolved_file));
                import_edges.push(CodeRelationship::new(
                    source_module,
                    module_entity_id(&resolved_file),
                    RelationshipKind::Imports,
                    file.file_path.clone(),
                    import.line,
                ));
                if resolved_file != file.file_path {
                    dependency_edges.push((file.file_path.clone(), resolved_file));
                }
                continue;
            }

            let exports = index
                .exports_by_file
                .get(resolved_file.as_str())
                .copied()
                .unwrap_or(&[]);

            let matches: Vec<_> = exports
                .iter()
                .filter(|e| {
                    if import.is_default {
                        e.is_default
                    } else {
                        e.name == import.imported_name
                    }
                })
                .collect();

            let Some(matched) = matches.first() else {
                unresolved_refs.push(UnresolvedRef {
                    file_path: file.file_path.clone(),
                    symbol: import.imported_name.clone(),
                    reason: format!(
                        "Export '{}' not found in module '{}'",
                        import.imported_name, import.source
                    ),
                });
                continue;
            };

            if matches.len() > 1 {
                unresolved_refs.push(UnresolvedRef {
                    file_path: file.file_path.clone(),
                    symbol: import.imported_name.clone(),
                    reason: format!(
                        "Multiple exports named '{}' in module '{}'; using the first in file order",
                        import.imported_name, import.source
                    ),
                });
            }

            let target_entity = index
                .entities_by_file
                .get(resolved_file.as_str())
                .into_iter()
                .flatten()
                .find(|e| e.name == matched.name && e.kind != EntityKind::Import)
                .map(|e| e.id)
                .unwrap_or_else(|| module_entity_id(&resolved_file));

            symbols.insert(import.local_name.clone(), target_entity);
            import_edges.push(CodeRelationship::new(
                source_module,
                target_entity,
                RelationshipKind::Imports,
                file.file_path.clone(),
                import.line,
            ));
            if resolved_file != file.file_path {
                dependency_edges.push((file.file_path.clone(), resolved_file));
            }
        }

        visible.insert(file.file_path.as_str(), symbols);
    }

    (
        BindingOutcome {
            import_edges,
            unresolved_refs,
            dependency_edges,
        },
        visible,
    )
}

const REWRITABLE: [RelationshipKind; 4] = [
    RelationshipKind::Calls,
    RelationshipKind::Inherits,
    RelationshipKind::Implements,
    RelationshipKind::Uses,
];

/// Steps 4–5: rewrite `Calls`/`Inherits`/`Implements`/`Uses` edges whose
/// target is an external placeholder, via the importer's visible symbols.
/// Returns the full rewritten edge set plus any newly-derived `DependsOn`
/// file edges.
pub fn resolve_references<'a>(
    inputs: &'a [FileAnalysis],
    index: &ResolverIndex<'a>,
    visible: &VisibleSymbols<'a>,
) -> (Vec<CodeRelationship>, Vec<(String, String)>) {
    let mut edges = Vec::new();
    let mut dependency_edges = Vec::new();

    for file in inputs {
        let symbols = visible.get(file.file_path.as_str());

        for rel in &file.relationships {
            if !REWRITABLE.contains(&rel.kind) {
                edges.push(rel.clone());
                continue;
            }

            let target_entity = index.entities_by_id.get(&rel.target_id);
            let is_external = target_entity.map(|e| e.external).unwrap_or(false);
            if !is_external {
                edges.push(rel.clone());
                continue;
            }

            let raw_name = target_entity.map(|e| e.name.as_str());
            let rewritten = raw_name
                .zip(symbols)
                .and_then(|(name, table)| table.get(name))
                .copied();

            match rewritten {
                Some(new_target) => {
                    let mut rewritten_rel = rel.clone();
                    rewritten_rel.target_id = new_target;
                    let target_file = index
                        .entities_by_id
                        .get(&new_target)
                        .map(|e| e.file_path.clone());
                    if let Some(target_file) = target_file {
                        if target_file != file.file_path {
                            dependency_edges
                                .push((file.file_path.clone(), target_file));
                        }
                    }
                    edges.push(rewritten_rel);
                }
                None => edges.push(rel.clone()),
            }
        }
    }

    (edges, dependency_edges)
}

pub fn union_dependency_graph(edges: &[(String, String)]) -> FileDependencyGraph {
    let mut graph = FileDependencyGraph::default();
    for (from, to) in edges {
        graph.add_edge(from, to);
    }
    graph
}

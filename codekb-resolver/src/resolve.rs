//! Top-level orchestration: wires steps 1–6 together into `resolve()`.

use codekb_core::config::ResolverConfig;
use codekb_core::FxHashMap;
use codekb_core::FxHashSet;

use crate::binding::{bind_imports, resolve_references, union_dependency_graph};
use crate::index::ResolverIndex;
use crate::module_path::resolve_import_path;
use crate::types::{FileAnalysis, ResolverOutput};

/// Run the full 6-step resolution pipeline over a complete set of per-file
/// analysis outputs. Deterministic: identical inputs produce identical
/// edge sets (modulo fresh edge ids).
pub fn resolve(inputs: &[FileAnalysis], config: &ResolverConfig) -> ResolverOutput {
    // Step 1: index.
    let index = ResolverIndex::build(inputs);
    let known_files: FxHashSet<&str> = inputs.iter().map(|f| f.file_path.as_str()).collect();

    // Step 2: module path resolution, memoized per (file, source) pair so
    // binding doesn't re-walk the probe order for every specifier.
    let mut resolved_sources: FxHashMap<(&str, &str), Option<String>> = FxHashMap::default();
    for file in inputs {
        for import in &file.imports {
            let key = (file.file_path.as_str(), import.source.as_str());
            resolved_sources.entry(key).or_insert_with(|| {
                resolve_import_path(&import.source, &file.file_path, &known_files, config)
            });
        }
    }

    // Step 3: import-export binding.
    let (binding_outcome, visible) = bind_imports(inputs, &index, &resolved_sources);

    // Steps 4-5: call / inheritance / type reference resolution.
    let (rewritten_edges, reference_dependency_edges) =
        resolve_references(inputs, &index, &visible);

    // Step 6: union DependsOn edges from (3) and (4-5) into the file graph.
    let mut dependency_pairs = binding_outcome.dependency_edges;
    dependency_pairs.extend(reference_dependency_edges);
    let file_dependency_graph = union_dependency_graph(&dependency_pairs);

    let mut resolved_edges = binding_outcome.import_edges;
    resolved_edges.extend(rewritten_edges);

    ResolverOutput {
        resolved_edges,
        unresolved_refs: binding_outcome.unresolved_refs,
        file_dependency_graph,
    }
}

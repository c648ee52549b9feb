//! # codekb-resolver
//!
//! The cross-file symbol resolver: turns per-file parser output into
//! a global entity/relationship graph by resolving import specifiers to
//! their defining modules and rewriting external-placeholder `Calls`/
//! `Inherits`/`Implements`/`Uses` edges against the importer's visible
//! symbols.

pub mod binding;
pub mod index;
pub mod module_path;
pub mod resolve;
pub mod types;

pub use resolve::resolve;
pub use types::{FileAnalysis, FileDependencyGraph, ResolverOutput};

#[cfg(test)]
mod tests {
    use super::*;
    use codekb_core::config::ResolverConfig;
    use codekb_core::types::{
        CodeEntity, CodeRelationship, EntityKind, ExportInfo, ImportInfo, RelationshipKind,
    };

    fn export(file: &str, name: &str) -> ExportInfo {
        ExportInfo {
            file_path: file.to_string(),
            name: name.to_string(),
            is_default: false,
            is_namespace: false,
            line: 1,
        }
    }

    fn import(importer: &str, source: &str, imported: &str, local: &str) -> ImportInfo {
        ImportInfo {
            file_path: importer.to_string(),
            source: source.to_string(),
            imported_name: imported.to_string(),
            local_name: local.to_string(),
            is_default: false,
            is_namespace: false,
            line: 1,
            resolved_path: None,
            external: false,
        }
    }

    #[test]
    fn rename_export_cascade_produces_unresolved_ref() {
        // a.ts used to export `foo`, now exports `bar`; b.ts still imports `foo`.
        let a = FileAnalysis {
            file_path: "a.ts".to_string(),
            entities: vec![CodeEntity::new(EntityKind::Function, "bar", "a.ts", 1)],
            relationships: vec![],
            imports: vec![],
            exports: vec![export("a.ts", "bar")],
        };
        let b = FileAnalysis {
            file_path: "b.ts".to_string(),
            entities: vec![],
            relationships: vec![],
            imports: vec![import("b.ts", "./a", "foo", "foo")],
            exports: vec![],
        };

        let output = resolve(&[a, b], &ResolverConfig::default());

        assert_eq!(output.unresolved_refs.len(), 1);
        let unresolved = &output.unresolved_refs[0];
        assert_eq!(unresolved.file_path, "b.ts");
        assert_eq!(unresolved.symbol, "foo");
        assert_eq!(unresolved.reason, "Export 'foo' not found in module './a'");
    }

    #[test]
    fn matched_import_produces_imports_edge_and_file_dependency() {
        let a = FileAnalysis {
            file_path: "a.ts".to_string(),
            entities: vec![CodeEntity::new(EntityKind::Function, "foo", "a.ts", 1)],
            relationships: vec![],
            imports: vec![],
            exports: vec![export("a.ts", "foo")],
        };
        let b = FileAnalysis {
            file_path: "b.ts".to_string(),
            entities: vec![],
            relationships: vec![],
            imports: vec![import("b.ts", "./a", "foo", "foo")],
            exports: vec![],
        };

        let output = resolve(&[a, b], &ResolverConfig::default());

        assert!(output.unresolved_refs.is_empty());
        assert!(output
            .resolved_edges
            .iter()
            .any(|e| e.kind == RelationshipKind::Imports));
        assert_eq!(output.file_dependency_graph.dependencies("b.ts"), vec!["a.ts"]);
        assert_eq!(output.file_dependency_graph.dependents("a.ts"), vec!["b.ts"]);
    }

    #[test]
    fn external_placeholder_call_is_rewritten_through_import_binding() {
        let foo_id = CodeEntity::new(EntityKind::Function, "foo", "a.ts", 1).id;
        let placeholder = CodeEntity::external_placeholder("foo", "./a");

        let a = FileAnalysis {
            file_path: "a.ts".to_string(),
            entities: vec![CodeEntity::new(EntityKind::Function, "foo", "a.ts", 1)],
            relationships: vec![],
            imports: vec![],
            exports: vec![export("a.ts", "foo")],
        };
        let caller_id = CodeEntity::new(EntityKind::Function, "main", "b.ts", 1).id;
        let b = FileAnalysis {
            file_path: "b.ts".to_string(),
            entities: vec![CodeEntity::new(EntityKind::Function, "main", "b.ts", 1)],
            relationships: vec![CodeRelationship::new(
                caller_id,
                placeholder.id,
                RelationshipKind::Calls,
                "b.ts",
                2,
            )],
            imports: vec![import("b.ts", "./a", "foo", "foo")],
            exports: vec![],
        };

        let output = resolve(&[a, b], &ResolverConfig::default());

        let rewritten = output
            .resolved_edges
            .iter()
            .find(|e| e.kind == RelationshipKind::Calls)
            .expect("call edge present");
        assert_eq!(rewritten.target_id, foo_id);
        assert!(output
            .resolved_edges
            .iter()
            .any(|e| e.kind == RelationshipKind::DependsOn || e.kind == RelationshipKind::Imports));
        assert_eq!(
            output.file_dependency_graph.dependencies("b.ts"),
            vec!["a.ts"]
        );
    }

    #[test]
    fn resolution_is_idempotent_modulo_edge_id() {
        let a = FileAnalysis {
            file_path: "a.ts".to_string(),
            entities: vec![CodeEntity::new(EntityKind::Function, "foo", "a.ts", 1)],
            relationships: vec![],
            imports: vec![],
            exports: vec![export("a.ts", "foo")],
        };
        let b = FileAnalysis {
            file_path: "b.ts".to_string(),
            entities: vec![],
            relationships: vec![],
            imports: vec![import("b.ts", "./a", "foo", "foo")],
            exports: vec![],
        };
        let inputs = vec![a, b];
        let config = ResolverConfig::default();

        let first = resolve(&inputs, &config);
        let second = resolve(&inputs, &config);

        let strip = |out: &ResolverOutput| {
            out.resolved_edges
                .iter()
                .map(|e| (e.source_id, e.target_id, e.kind))
                .collect::<Vec<_>>()
        };
        assert_eq!(strip(&first), strip(&second));
        assert_eq!(first.unresolved_refs.len(), second.unresolved_refs.len());
    }
}

//! `CodeEntity` / `CodeRelationship` — the graph's node and edge payloads.

use serde::{Deserialize, Serialize};

use super::identifiers::{EntityId, RelationshipId};

/// The kind of a code construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Module,
    Class,
    Interface,
    Function,
    Variable,
    Type,
    Import,
    Export,
    File,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Module => "Module",
            Self::Class => "Class",
            Self::Interface => "Interface",
            Self::Function => "Function",
            Self::Variable => "Variable",
            Self::Type => "Type",
            Self::Import => "Import",
            Self::Export => "Export",
            Self::File => "File",
        }
    }
}

/// A first-class code construct extracted by the parser collaborator and
/// indexed into the knowledge graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeEntity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,
    pub file_path: String,
    pub line: u32,
    pub signature: Option<String>,
    pub metadata: serde_json::Value,
    /// True for a placeholder minted to stand in for an unresolved,
    /// out-of-project reference (a "placeholder entity").
    pub external: bool,
}

impl CodeEntity {
    /// Build an entity with a content-addressed id per `(file_path, kind, name, line)`.
    pub fn new(
        kind: EntityKind,
        name: impl Into<String>,
        file_path: impl Into<String>,
        line: u32,
    ) -> Self {
        let name = name.into();
        let file_path = file_path.into();
        let id = EntityId::content_addressed(&file_path, kind.as_str(), &name, line);
        Self {
            id,
            kind,
            name,
            file_path,
            line,
            signature: None,
            metadata: serde_json::Value::Null,
            external: false,
        }
    }

    /// Build an external placeholder entity — a stable resolution target
    /// for an import/call whose definition lies outside the project.
    pub fn external_placeholder(name: impl Into<String>, origin_hint: impl Into<String>) -> Self {
        let name = name.into();
        let origin_hint = origin_hint.into();
        let id = EntityId::content_addressed(&origin_hint, "External", &name, 0);
        Self {
            id,
            kind: EntityKind::Import,
            name,
            file_path: origin_hint,
            line: 0,
            signature: None,
            metadata: serde_json::Value::Null,
            external: true,
        }
    }
}

/// The kind of a directed edge between two entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipKind {
    Calls,
    Imports,
    DependsOn,
    Inherits,
    Implements,
    Uses,
    Contains,
    SimilarTo,
    TemporalNext,
    TemporalPrev,
}

/// A typed directed link between two entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeRelationship {
    pub id: RelationshipId,
    pub source_id: EntityId,
    pub target_id: EntityId,
    pub kind: RelationshipKind,
    pub file_path: String,
    pub line: u32,
    pub metadata: serde_json::Value,
}

impl CodeRelationship {
    pub fn new(
        source_id: EntityId,
        target_id: EntityId,
        kind: RelationshipKind,
        file_path: impl Into<String>,
        line: u32,
    ) -> Self {
        Self {
            id: RelationshipId::fresh(),
            source_id,
            target_id,
            kind,
            file_path: file_path.into(),
            line,
            metadata: serde_json::Value::Null,
        }
    }
}

/// A named export from a source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportInfo {
    pub file_path: String,
    pub name: String,
    pub is_default: bool,
    pub is_namespace: bool,
    pub line: u32,
}

/// An import specifier in a source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportInfo {
    pub file_path: String,
    pub source: String,
    pub imported_name: String,
    pub local_name: String,
    pub is_default: bool,
    pub is_namespace: bool,
    pub line: u32,
    /// Set once module-path resolution has run; `None` means not yet resolved.
    pub resolved_path: Option<String>,
    /// Resolved to lie outside the project root.
    pub external: bool,
}

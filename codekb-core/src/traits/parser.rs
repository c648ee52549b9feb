//! The parser collaborator's contract: `parse(bytes, path, language) ->
//! { entities, relationships, imports, exports, syntax_errors }`. Must be
//! pure and deterministic; treated as a pluggable boundary so any language
//! frontend can sit behind it without the rest of the engine changing.

use serde::{Deserialize, Serialize};

use crate::types::{CodeEntity, CodeRelationship, ExportInfo, ImportInfo};

/// The output of parsing a single file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseOutcome {
    pub entities: Vec<CodeEntity>,
    pub relationships: Vec<CodeRelationship>,
    pub imports: Vec<ImportInfo>,
    pub exports: Vec<ExportInfo>,
    pub syntax_errors: Vec<String>,
}

/// A pure, deterministic parse function: `(bytes, path, language) -> ParseOutcome`.
pub type ParseFn = fn(&[u8], &str, &str) -> ParseOutcome;

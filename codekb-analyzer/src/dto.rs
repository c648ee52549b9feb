//! Serialization boundary between `ParseOutcome`/`FileAnalysis` (plain
//! structs in `codekb-core`/`codekb-resolver`, not themselves serializable
//! as a unit) and the worker pool's `serde_json::Value` task result / the
//! cache's byte blobs.

use codekb_core::traits::ParseOutcome;
use codekb_core::types::{CodeEntity, CodeRelationship, ExportInfo, ImportInfo};
use codekb_resolver::FileAnalysis;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAnalysisDto {
    pub file_path: String,
    pub entities: Vec<CodeEntity>,
    pub relationships: Vec<CodeRelationship>,
    pub imports: Vec<ImportInfo>,
    pub exports: Vec<ExportInfo>,
}

impl FileAnalysisDto {
    pub fn from_outcome(file_path: impl Into<String>, outcome: ParseOutcome) -> Self {
        Self {
            file_path: file_path.into(),
            entities: outcome.entities,
            relationships: outcome.relationships,
            imports: outcome.imports,
            exports: outcome.exports,
        }
    }
}

impl From<FileAnalysisDto> for FileAnalysis {
    fn from(dto: FileAnalysisDto) -> Self {
        FileAnalysis {
            file_path: dto.file_path,
            entities: dto.entities,
            relationships: dto.relationships,
            imports: dto.imports,
            exports: dto.exports,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codekb_core::types::EntityKind;

    #[test]
    fn round_trips_through_json() {
        let outcome = ParseOutcome {
            entities: vec![CodeEntity::new(EntityKind::Function, "foo", "a.ts", 1)],
            relationships: vec![],
            imports: vec![],
            exports: vec![],
            syntax_errors: vec![],
        };
        let dto = FileAnalysisDto::from_outcome("a.ts", outcome);
        let value = serde_json::to_value(&dto).unwrap();
        let back: FileAnalysisDto = serde_json::from_value(value).unwrap();
        assert_eq!(back.file_path, "a.ts");
        assert_eq!(back.entities.len(), 1);
    }
}

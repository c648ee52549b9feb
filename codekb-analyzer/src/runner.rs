//! `ParseTaskRunner` — the `TaskRunner` the worker pool is constructed
//! with: wraps the injected, pure `ParseFn` collaborator so that parsing
//! actually happens worker-side, isolated from the orchestrator's
//! memory-resident state.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use codekb_core::traits::cancellation::CancellationToken;
use codekb_core::traits::parser::ParseFn;
use codekb_core::types::AnalysisTask;
use codekb_core::EngineError;
use codekb_workers::TaskRunner;
use serde::{Deserialize, Serialize};

use crate::dto::FileAnalysisDto;

/// `AnalysisTask::payload` shape for `TaskKind::File` tasks dispatched by
/// this crate. File content travels base64-encoded since task payloads are
/// plain `serde_json::Value`, not raw bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseTaskPayload {
    pub file_path: String,
    pub language: String,
    pub content_b64: String,
}

impl ParseTaskPayload {
    pub fn new(file_path: impl Into<String>, language: impl Into<String>, content: &[u8]) -> Self {
        Self {
            file_path: file_path.into(),
            language: language.into(),
            content_b64: BASE64.encode(content),
        }
    }
}

/// Runs the injected `ParseFn` against a task's file content and returns the
/// result as the `FileAnalysisDto` JSON shape the orchestrator expects back.
pub struct ParseTaskRunner {
    parse: ParseFn,
}

impl ParseTaskRunner {
    pub fn new(parse: ParseFn) -> Self {
        Self { parse }
    }
}

impl TaskRunner for ParseTaskRunner {
    fn run(
        &self,
        task: &AnalysisTask,
        _cancel: &CancellationToken,
    ) -> Result<serde_json::Value, EngineError> {
        let payload: ParseTaskPayload =
            serde_json::from_value(task.payload.clone()).map_err(|e| {
                EngineError::InvalidArgument(format!("malformed parse task payload: {e}"))
            })?;

        let bytes = BASE64.decode(&payload.content_b64).map_err(|e| {
            EngineError::AnalysisFailure {
                file_path: payload.file_path.clone(),
                message: format!("invalid base64 content: {e}"),
            }
        })?;

        let outcome = (self.parse)(&bytes, &payload.file_path, &payload.language);
        let dto = FileAnalysisDto::from_outcome(payload.file_path.clone(), outcome);

        serde_json::to_value(&dto).map_err(|e| EngineError::AnalysisFailure {
            file_path: payload.file_path,
            message: format!("failed to serialize parse outcome: {e}"),
        })
    }
}

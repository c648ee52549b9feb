//! The pure, worker-isolated task execution boundary: workers must not
//! share memory-resident caches with the orchestrator; every result is
//! returned by value.

use codekb_core::traits::cancellation::CancellationToken;
use codekb_core::types::AnalysisTask;
use codekb_core::EngineError;

pub trait TaskRunner: Send + Sync + 'static {
    fn run(
        &self,
        task: &AnalysisTask,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value, EngineError>;
}

/// A `TaskRunner` built from a plain closure, for tests and simple callers.
pub struct FnRunner<F>(pub F)
where
    F: Fn(&AnalysisTask, &CancellationToken) -> Result<serde_json::Value, EngineError>
        + Send
        + Sync
        + 'static;

impl<F> TaskRunner for FnRunner<F>
where
    F: Fn(&AnalysisTask, &CancellationToken) -> Result<serde_json::Value, EngineError>
        + Send
        + Sync
        + 'static,
{
    fn run(
        &self,
        task: &AnalysisTask,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value, EngineError> {
        (self.0)(task, cancel)
    }
}

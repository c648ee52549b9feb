//! `EngineEventHandler` — the sink trait progress/error/stat notifications
//! are delivered through.

use super::types::{
    BatchAppliedEvent, ScanCompleteEvent, ScanErrorEvent, ScanProgressEvent, ScanStartedEvent,
    WorkerHealthEvent,
};

/// Implemented by anything that wants to observe pipeline progress. All
/// methods have empty default bodies so an implementor can subscribe to
/// only the events it cares about.
pub trait EngineEventHandler: Send + Sync {
    fn on_scan_started(&self, _event: &ScanStartedEvent) {}
    fn on_scan_progress(&self, _event: &ScanProgressEvent) {}
    fn on_scan_complete(&self, _event: &ScanCompleteEvent) {}
    fn on_scan_error(&self, _event: &ScanErrorEvent) {}
    fn on_batch_applied(&self, _event: &BatchAppliedEvent) {}
    fn on_worker_health(&self, _event: &WorkerHealthEvent) {}
}

/// A handler that logs every event via `tracing` at an appropriate level.
/// Used as the default handler when no subscriber is registered.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventHandler;

impl EngineEventHandler for TracingEventHandler {
    fn on_scan_started(&self, event: &ScanStartedEvent) {
        tracing::info!(root = %event.root.display(), "scan started");
    }

    fn on_scan_progress(&self, event: &ScanProgressEvent) {
        tracing::debug!(processed = event.processed, total = event.total, "scan progress");
    }

    fn on_scan_complete(&self, event: &ScanCompleteEvent) {
        tracing::info!(
            added = event.added,
            modified = event.modified,
            removed = event.removed,
            duration_ms = event.duration_ms,
            "scan complete"
        );
    }

    fn on_scan_error(&self, event: &ScanErrorEvent) {
        tracing::warn!(message = %event.message, "scan error");
    }

    fn on_batch_applied(&self, event: &BatchAppliedEvent) {
        tracing::info!(
            batch_id = event.batch_id,
            files_touched = event.files_touched,
            dependents_scheduled = event.dependents_scheduled,
            "batch applied"
        );
    }

    fn on_worker_health(&self, event: &WorkerHealthEvent) {
        if event.healthy {
            tracing::debug!(worker_id = event.worker_id, "worker healthy");
        } else {
            tracing::warn!(
                worker_id = event.worker_id,
                reason = ?event.reason,
                "worker unhealthy"
            );
        }
    }
}

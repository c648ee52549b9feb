//! Event payloads emitted by the scan/watch/resolve pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanStartedEvent {
    pub root: PathBuf,
    pub file_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanProgressEvent {
    pub processed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanCompleteEvent {
    pub added: usize,
    pub modified: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanErrorEvent {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAppliedEvent {
    pub batch_id: u64,
    pub files_touched: usize,
    pub dependents_scheduled: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerHealthEvent {
    pub worker_id: usize,
    pub healthy: bool,
    pub reason: Option<String>,
}

//! `AnalysisTask` / `AnalysisResult` — the worker pool's unit of work.

use serde::{Deserialize, Serialize};

use super::identifiers::TaskId;

/// The kind of analysis a task performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    File,
    Project,
    Pattern,
    Debt,
    Query,
}

/// A unit of work submitted to the worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisTask {
    pub id: TaskId,
    pub kind: TaskKind,
    pub payload: serde_json::Value,
    pub priority: i32,
    #[serde(with = "millis_since_epoch")]
    pub submitted_at: std::time::SystemTime,
    pub estimated_ms: Option<u64>,
}

impl AnalysisTask {
    pub fn new(kind: TaskKind, payload: serde_json::Value, priority: i32) -> Self {
        Self {
            id: TaskId::next(),
            kind,
            payload,
            priority,
            submitted_at: std::time::SystemTime::now(),
            estimated_ms: None,
        }
    }

    /// Dispatch order key: higher priority first, FIFO on `submitted_at` ties.
    /// Returned as `(Reverse(priority), submitted_at)` so a `BinaryHeap`
    /// (a max-heap) pops the task that should run next.
    pub fn dispatch_key(&self) -> (i32, std::time::SystemTime) {
        (self.priority, self.submitted_at)
    }
}

/// Runtime/memory metrics attached to a completed task.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TaskMetrics {
    pub duration_ms: u64,
    pub peak_bytes: u64,
}

/// The outcome of executing an `AnalysisTask`. Exactly one of `value`/`error`
/// is populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub task_id: TaskId,
    pub ok: bool,
    pub value: Option<serde_json::Value>,
    pub error: Option<crate::errors::TaskErrorInfo>,
    pub metrics: TaskMetrics,
}

impl AnalysisResult {
    pub fn success(task_id: TaskId, value: serde_json::Value, metrics: TaskMetrics) -> Self {
        Self {
            task_id,
            ok: true,
            value: Some(value),
            error: None,
            metrics,
        }
    }

    pub fn failure(
        task_id: TaskId,
        error: crate::errors::TaskErrorInfo,
        metrics: TaskMetrics,
    ) -> Self {
        Self {
            task_id,
            ok: false,
            value: None,
            error: Some(error),
            metrics,
        }
    }
}

mod millis_since_epoch {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(t: &SystemTime, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let dur = t.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        s.serialize_u128(dur.as_millis())
    }

    pub fn deserialize<'de, D>(d: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(d)?;
        Ok(UNIX_EPOCH + Duration::from_millis(millis as u64))
    }
}

use serde::{Deserialize, Serialize};

/// Configuration for the supervised worker pool.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WorkerConfig {
    /// Pool size N (`maxWorkers`). Default: number of logical CPUs.
    pub max_workers: Option<usize>,
    /// Admission bound on the waiting queue (`maxQueueSize`).
    pub max_queue_size: Option<usize>,
    /// Stuck-worker threshold (`workerIdleTimeout`).
    pub worker_idle_timeout_ms: Option<u64>,
    /// Supervisor heartbeat cadence (`heartbeat_interval`).
    pub heartbeat_interval_ms: Option<u64>,
    /// Grace period for cooperative shutdown before force-termination.
    pub shutdown_grace_ms: Option<u64>,
    /// Default per-task timeout.
    pub task_timeout_ms: Option<u64>,
    /// High-water mark for ingestion backpressure.
    pub backpressure_high_water: Option<usize>,
    /// Low-water mark to resume ingestion.
    pub backpressure_low_water: Option<usize>,
}

impl WorkerConfig {
    pub fn effective_max_workers(&self) -> usize {
        self.max_workers
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4))
    }

    pub fn effective_max_queue_size(&self) -> usize {
        self.max_queue_size.unwrap_or(1_024)
    }

    pub fn effective_worker_idle_timeout_ms(&self) -> u64 {
        self.worker_idle_timeout_ms.unwrap_or(30_000)
    }

    pub fn effective_heartbeat_interval_ms(&self) -> u64 {
        self.heartbeat_interval_ms.unwrap_or(2_000)
    }

    pub fn effective_shutdown_grace_ms(&self) -> u64 {
        self.shutdown_grace_ms.unwrap_or(5_000)
    }

    pub fn effective_task_timeout_ms(&self) -> u64 {
        self.task_timeout_ms.unwrap_or(60_000)
    }

    pub fn effective_backpressure_high_water(&self) -> usize {
        self.backpressure_high_water
            .unwrap_or_else(|| self.effective_max_queue_size() * 3 / 4)
    }

    pub fn effective_backpressure_low_water(&self) -> usize {
        self.backpressure_low_water
            .unwrap_or_else(|| self.effective_max_queue_size() / 4)
    }
}

use serde::{Deserialize, Serialize};

/// Configuration for the incremental analyzer orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub project_root: Option<String>,
    /// Chunk size used when consuming worker-pool completions / migrator batches.
    pub batch_size: Option<usize>,
    /// EMA smoothing factor for average file analysis time, in `(0,1]`.
    pub ema_alpha: Option<f64>,
}

impl AnalyzerConfig {
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.unwrap_or(50)
    }

    pub fn effective_ema_alpha(&self) -> f64 {
        self.ema_alpha.unwrap_or(0.2)
    }
}

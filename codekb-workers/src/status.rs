use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PoolStats {
    pub completed: u64,
    pub failed: u64,
    pub crashed: u64,
    pub timed_out: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStatus {
    pub workers: usize,
    pub queue_len: usize,
    pub active: usize,
    pub stats: PoolStats,
}

use serde::{Deserialize, Serialize};

/// Configuration for the two-tier analysis cache.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CacheConfig {
    /// Memory-tier capacity (`maxMemoryEntries`). Default: 10,000.
    pub max_memory_entries: Option<u64>,
    /// Default entry TTL in milliseconds (`defaultTTL`). Default: 1 hour.
    pub default_ttl_ms: Option<u64>,
    /// Disk-tier soft size ceiling in bytes (`maxDiskSize`). Best-effort.
    pub max_disk_size: Option<u64>,
    /// Directory for the disk tier. Default: `.cache/analysis`.
    pub disk_dir: Option<String>,
}

impl CacheConfig {
    pub fn effective_max_memory_entries(&self) -> u64 {
        self.max_memory_entries.unwrap_or(10_000)
    }

    pub fn effective_default_ttl_ms(&self) -> u64 {
        self.default_ttl_ms.unwrap_or(3_600_000)
    }

    pub fn effective_max_disk_size(&self) -> u64 {
        self.max_disk_size.unwrap_or(512 * 1024 * 1024)
    }

    pub fn effective_disk_dir(&self) -> String {
        self.disk_dir
            .clone()
            .unwrap_or_else(|| ".cache/analysis".to_string())
    }
}

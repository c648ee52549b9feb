use serde::{Deserialize, Serialize};

/// Which `StorageBackend` implementation to use — mirrors `BACKEND_TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    #[default]
    Filesystem,
    Graph,
}

/// Configuration for the storage backend and migrator.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: BackendType,
    pub root: Option<String>,
    /// Migrator / scanner chunk size (`batch_size`).
    pub batch_size: Option<usize>,
    /// Top-K for `SimilarTo` document linking during migration.
    pub similarity_top_k: Option<usize>,
}

impl StorageConfig {
    pub fn effective_root(&self) -> String {
        self.root.clone().unwrap_or_else(|| ".".to_string())
    }

    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.unwrap_or(100)
    }

    pub fn effective_similarity_top_k(&self) -> usize {
        self.similarity_top_k.unwrap_or(5)
    }
}

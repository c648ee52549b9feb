//! Configuration structs, one per component, following the
//! `#[serde(default)]` + `Option<T>` + `effective_*()` accessor idiom: every
//! field is optional on the wire, and an `effective_*()` method resolves it
//! to its default when absent. `EngineConfig::load_from_str`/`load_from_path`
//! read a TOML document into this shape; CLI flags and env overrides remain
//! a separate, external caller's job.

mod analyzer_config;
mod cache_config;
mod resolver_config;
mod storage_config;
mod watcher_config;
mod worker_config;

pub use analyzer_config::AnalyzerConfig;
pub use cache_config::CacheConfig;
pub use resolver_config::ResolverConfig;
pub use storage_config::{BackendType, StorageConfig};
pub use watcher_config::WatcherConfig;
pub use worker_config::WorkerConfig;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// The top-level configuration, aggregating every component's config into
/// one closed, serializable set of keys.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub cache: CacheConfig,
    pub watcher: WatcherConfig,
    pub workers: WorkerConfig,
    pub resolver: ResolverConfig,
    pub analyzer: AnalyzerConfig,
    pub storage: StorageConfig,
    /// Bumping this invalidates all prior cached analysis results.
    pub schema_version: u32,
}

impl EngineConfig {
    /// Parse a TOML document into `EngineConfig`. Every field is optional
    /// (`#[serde(default)]` all the way down), so a config file only needs
    /// to set the keys it wants to override.
    pub fn load_from_str(toml_str: &str) -> Result<Self, EngineError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Read and parse a TOML config file from disk.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content)
    }
}

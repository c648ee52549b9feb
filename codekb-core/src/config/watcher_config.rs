use serde::{Deserialize, Serialize};

/// Configuration for the debounced file watcher.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WatcherConfig {
    /// Languages/extensions eligible for analysis.
    pub include_extensions: Vec<String>,
    /// Quiet period before a batch is emitted. Default: 300ms.
    pub debounce_ms: Option<u64>,
    /// Cap on concurrent analysis tasks dispatched from one batch.
    pub max_concurrent_analysis: Option<usize>,
    /// Gitignore-syntax patterns excluded from watching.
    pub ignored_globs: Vec<String>,
}

impl WatcherConfig {
    pub fn effective_debounce_ms(&self) -> u64 {
        self.debounce_ms.unwrap_or(300)
    }

    pub fn effective_max_concurrent_analysis(&self) -> usize {
        self.max_concurrent_analysis.unwrap_or(8)
    }

    pub fn effective_include_extensions(&self) -> Vec<String> {
        if self.include_extensions.is_empty() {
            vec![
                "ts".into(),
                "tsx".into(),
                "js".into(),
                "jsx".into(),
                "mjs".into(),
                "cjs".into(),
            ]
        } else {
            self.include_extensions.clone()
        }
    }
}

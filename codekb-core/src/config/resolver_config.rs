use serde::{Deserialize, Serialize};

/// Configuration for the cross-file resolver.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ResolverConfig {
    /// Extension probe order for relative-import resolution.
    pub extension_probe_order: Vec<String>,
    /// Alias roots (e.g. tsconfig `paths`), `alias -> directory`.
    pub alias_roots: Vec<(String, String)>,
    /// Project root, used to classify an import as external.
    pub project_root: Option<String>,
}

impl ResolverConfig {
    pub fn effective_extension_probe_order(&self) -> Vec<String> {
        if self.extension_probe_order.is_empty() {
            vec![
                "ts".into(),
                "tsx".into(),
                "js".into(),
                "jsx".into(),
                "mjs".into(),
                "cjs".into(),
            ]
        } else {
            self.extension_probe_order.clone()
        }
    }
}

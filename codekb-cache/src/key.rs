//! Cache key derivation: keys are derived from `(type, identifier, options,
//! schema_version)`, so two logically-equivalent requests hash identically.
//! A `BTreeMap` for `options` guarantees stable ordering regardless of
//! call-site insertion order.

use std::collections::BTreeMap;

use codekb_core::types::CacheAnalysisType;
use serde::{Deserialize, Serialize};

/// The logical identity of a cacheable computation, prior to hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheKeyInput {
    pub kind: CacheAnalysisType,
    pub identifier: String,
    pub options: BTreeMap<String, String>,
    pub schema_version: u32,
}

impl CacheKeyInput {
    pub fn file(path: impl Into<String>, schema_version: u32) -> Self {
        Self {
            kind: CacheAnalysisType::File,
            identifier: path.into(),
            options: BTreeMap::new(),
            schema_version,
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Render the opaque, stable cache key string for this input.
    pub fn render(&self) -> String {
        // `serde_json` serializes `BTreeMap` in key-sorted order, so this
        // representation is canonical for logically-equivalent inputs.
        let canonical =
            serde_json::to_vec(self).expect("CacheKeyInput fields are all serializable");
        format!("{:016x}", xxhash_rust::xxh3::xxh3_64(&canonical))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equivalent_requests_hash_identically() {
        let a = CacheKeyInput::file("src/a.ts", 1)
            .with_option("lang", "ts")
            .with_option("mode", "full");
        let b = CacheKeyInput::file("src/a.ts", 1)
            .with_option("mode", "full")
            .with_option("lang", "ts");
        assert_eq!(a.render(), b.render());
    }

    #[test]
    fn different_schema_version_changes_key() {
        let a = CacheKeyInput::file("src/a.ts", 1);
        let b = CacheKeyInput::file("src/a.ts", 2);
        assert_ne!(a.render(), b.render());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::collection::hash_map;
    use proptest::prelude::*;

    proptest! {
        /// Options have unique keys by construction (a `HashMap`), so
        /// whatever order they're inserted in, the rendered key agrees —
        /// mirroring the `BTreeMap` canonicalization `render()` relies on.
        #[test]
        fn option_insertion_order_never_changes_the_rendered_key(
            identifier in "[a-z]{1,12}",
            schema_version in 0u32..100,
            options in hash_map("[a-z]{1,6}", "[a-z0-9]{1,10}", 0..6),
        ) {
            let entries: Vec<(String, String)> = options.into_iter().collect();

            let mut forward = CacheKeyInput::file(identifier.clone(), schema_version);
            for (k, v) in &entries {
                forward = forward.with_option(k.clone(), v.clone());
            }

            let mut backward = CacheKeyInput::file(identifier, schema_version);
            for (k, v) in entries.iter().rev() {
                backward = backward.with_option(k.clone(), v.clone());
            }

            prop_assert_eq!(forward.render(), backward.render());
        }

        #[test]
        fn render_is_always_a_16_char_hex_string(
            identifier in "[a-z]{1,12}",
            schema_version in 0u32..100,
        ) {
            let rendered = CacheKeyInput::file(identifier, schema_version).render();
            prop_assert_eq!(rendered.len(), 16);
            prop_assert!(rendered.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }
}

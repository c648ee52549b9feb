//! In-memory cache tier: a `moka::sync::Cache` keyed on the rendered cache
//! key string, giving TinyLFU admission and size-based eviction with no
//! manual LRU bookkeeping needed.

use std::sync::Arc;

use codekb_core::types::CacheEntry;
use moka::sync::Cache;

#[derive(Clone)]
pub struct MemoryTier {
    cache: Cache<String, Arc<CacheEntry>>,
}

impl MemoryTier {
    pub fn new(max_entries: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_entries).build(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<CacheEntry>> {
        self.cache.get(key)
    }

    pub fn insert(&self, key: String, entry: Arc<CacheEntry>) {
        self.cache.insert(key, entry);
    }

    pub fn remove(&self, key: &str) {
        self.cache.invalidate(key);
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    /// Remove every entry whose key matches `predicate`. Used for
    /// pattern-based and file-path-based invalidation.
    pub fn retain(&self, mut keep: impl FnMut(&str, &CacheEntry) -> bool) {
        self.cache.run_pending_tasks();
        let doomed: Vec<String> = self
            .cache
            .iter()
            .filter(|(k, v)| !keep(k, v))
            .map(|(k, _)| k.as_ref().clone())
            .collect();
        for key in doomed {
            self.cache.invalidate(&key);
        }
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    pub fn weighted_size_bytes(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache
            .iter()
            .map(|(_, v)| v.size_bytes)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codekb_core::types::CacheEntryMeta;

    fn entry(key: &str) -> Arc<CacheEntry> {
        Arc::new(CacheEntry {
            key: key.to_string(),
            value_bytes: vec![1, 2, 3],
            created_at: 0,
            ttl_ms: 0,
            access_count: 0,
            last_used: 0,
            size_bytes: 3,
            content_hash: 0,
            meta: CacheEntryMeta::default(),
        })
    }

    #[test]
    fn round_trips_an_entry() {
        let tier = MemoryTier::new(10);
        tier.insert("a".to_string(), entry("a"));
        assert!(tier.get("a").is_some());
        tier.remove("a");
        assert!(tier.get("a").is_none());
    }

    #[test]
    fn retain_drops_non_matching_keys() {
        let tier = MemoryTier::new(10);
        tier.insert("file:a.ts".to_string(), entry("file:a.ts"));
        tier.insert("file:b.ts".to_string(), entry("file:b.ts"));
        tier.retain(|k, _| !k.contains("a.ts"));
        assert!(tier.get("file:a.ts").is_none());
        assert!(tier.get("file:b.ts").is_some());
    }
}

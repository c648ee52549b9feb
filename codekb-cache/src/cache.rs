//! `AnalysisCache` — a two-tier (memory + disk) cache with TTL expiry,
//! file-mtime-aware invalidation, singleflight coalescing of concurrent
//! misses, and a best-effort disk-budget sweep.

use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use codekb_core::config::CacheConfig;
use codekb_core::types::{CacheEntry, CacheEntryMeta};

use crate::disk::DiskTier;
use crate::memory::MemoryTier;
use crate::metrics::{CacheMetrics, CacheMetricsSnapshot};
use crate::singleflight::SingleFlight;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn file_mtime_secs(path: &Path) -> Option<u64> {
    let meta = std::fs::metadata(path).ok()?;
    let mtime = meta.modified().ok()?;
    mtime.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}

pub struct AnalysisCache {
    memory: MemoryTier,
    disk: DiskTier,
    singleflight: SingleFlight<Arc<CacheEntry>>,
    metrics: CacheMetrics,
    default_ttl_ms: u64,
    max_disk_size: u64,
}

impl AnalysisCache {
    pub fn new(config: &CacheConfig) -> std::io::Result<Self> {
        Ok(Self {
            memory: MemoryTier::new(config.effective_max_memory_entries()),
            disk: DiskTier::new(config.effective_disk_dir())?,
            singleflight: SingleFlight::new(),
            metrics: CacheMetrics::default(),
            default_ttl_ms: config.effective_default_ttl_ms(),
            max_disk_size: config.effective_max_disk_size(),
        })
    }

    /// Look up `key`, promoting a disk hit into the memory tier. Entries
    /// that have expired or whose backing file has changed since caching
    /// are evicted on read rather than returned stale.
    pub fn get(&self, key: &str) -> Option<Arc<CacheEntry>> {
        let start = std::time::Instant::now();
        let hit = self.lookup(key);
        let elapsed_us = start.elapsed().as_secs_f64() * 1_000_000.0;
        match &hit {
            Some(_) => self.metrics.record_hit(elapsed_us),
            None => self.metrics.record_miss(elapsed_us),
        }
        hit
    }

    fn lookup(&self, key: &str) -> Option<Arc<CacheEntry>> {
        let entry = match self.memory.get(key) {
            Some(entry) => entry,
            None => {
                let from_disk = self.disk.get(key).ok().flatten()?;
                let entry = Arc::new(from_disk);
                self.memory.insert(key.to_string(), entry.clone());
                entry
            }
        };

        if entry.is_expired(now_ms()) || self.is_stale(&entry) {
            self.invalidate(key);
            return None;
        }

        let bumped = Arc::new(CacheEntry {
            access_count: entry.access_count + 1,
            last_used: now_ms(),
            ..(*entry).clone()
        });
        self.memory.insert(key.to_string(), bumped.clone());
        let _ = self.disk.insert(&bumped);
        Some(bumped)
    }

    fn is_stale(&self, entry: &CacheEntry) -> bool {
        let (Some(path), Some(cached_mtime)) =
            (entry.meta.file_path.as_deref(), entry.meta.file_mtime)
        else {
            return false;
        };
        match file_mtime_secs(Path::new(path)) {
            Some(current) => current != cached_mtime,
            // File no longer exists: treat the cached analysis as stale.
            None => true,
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Insert or overwrite `key`. Setting the same key to the same value is
    /// idempotent: a second identical `set` does not change what `get`
    /// returns, and the memory/disk tiers agree.
    pub fn set(
        &self,
        key: impl Into<String>,
        value_bytes: Vec<u8>,
        file_path: Option<String>,
        ttl_ms: Option<u64>,
    ) -> std::io::Result<Arc<CacheEntry>> {
        let key = key.into();
        let file_mtime = file_path.as_deref().and_then(|p| file_mtime_secs(Path::new(p)));
        let content_hash = codekb_core::types::hash_bytes(&value_bytes);
        let size_bytes = value_bytes.len() as u64;
        let now = now_ms();
        let entry = Arc::new(CacheEntry {
            key: key.clone(),
            value_bytes,
            created_at: now,
            ttl_ms: ttl_ms.unwrap_or(self.default_ttl_ms),
            access_count: 0,
            last_used: now,
            size_bytes,
            content_hash,
            meta: CacheEntryMeta {
                file_path,
                file_size: Some(size_bytes),
                file_mtime,
                analysis_type: None,
                schema_version: 1,
            },
        });
        self.disk.insert(&entry)?;
        self.memory.insert(key, entry.clone());
        Ok(entry)
    }

    /// Compute and cache `key`'s value if absent, coalescing concurrent
    /// misses for the same key into a single `compute` call.
    pub fn get_or_compute(
        &self,
        key: &str,
        file_path: Option<String>,
        ttl_ms: Option<u64>,
        compute: impl FnOnce() -> std::io::Result<Vec<u8>>,
    ) -> std::io::Result<Arc<CacheEntry>> {
        if let Some(entry) = self.get(key) {
            return Ok(entry);
        }
        let result: Result<Arc<CacheEntry>, String> = self.singleflight.run(key, || {
            if let Some(entry) = self.lookup(key) {
                return Ok(entry);
            }
            let bytes = compute().map_err(|e| e.to_string())?;
            self.set(key.to_string(), bytes, file_path.clone(), ttl_ms)
                .map_err(|e| e.to_string())
        });
        result.map_err(std::io::Error::other)
    }

    pub fn invalidate(&self, key: &str) {
        self.memory.remove(key);
        let _ = self.disk.remove(key);
    }

    /// Invalidate every cached entry whose key contains `pattern` as a
    /// substring. Returns the number of entries removed.
    pub fn invalidate_pattern(&self, pattern: &str) -> usize {
        let mut removed = 0usize;
        self.memory.retain(|k, _| {
            let matches = k.contains(pattern);
            if matches {
                removed += 1;
            }
            !matches
        });
        if let Ok(files) = self.disk.list() {
            for (key, _, _) in files {
                if key.contains(pattern) {
                    let _ = self.disk.remove(&key);
                }
            }
        }
        removed
    }

    /// Invalidate every cached entry recorded against `file_path`.
    pub fn invalidate_by_file(&self, file_path: &str) -> usize {
        let mut removed = 0usize;
        let mut removed_keys = Vec::new();
        self.memory.retain(|k, v| {
            let matches = v.meta.file_path.as_deref() == Some(file_path);
            if matches {
                removed += 1;
                removed_keys.push(k.to_string());
            }
            !matches
        });
        for key in removed_keys {
            let _ = self.disk.remove(&key);
        }
        removed
    }

    pub fn clear(&self) -> std::io::Result<()> {
        self.memory.clear();
        self.disk.clear()
    }

    pub fn metrics(&self) -> CacheMetricsSnapshot {
        let memory_bytes = self.memory.weighted_size_bytes();
        let disk_bytes = self.disk.total_bytes().unwrap_or(0);
        self.metrics.snapshot(memory_bytes, disk_bytes)
    }

    /// Best-effort disk-budget sweep: evicts the least-recently-used disk
    /// entries until total disk usage is back under `max_disk_size`.
    pub fn optimize(&self) -> std::io::Result<usize> {
        let mut files = self.disk.list()?;
        let total: u64 = files.iter().map(|(_, _, size)| size).sum();
        if total <= self.max_disk_size {
            return Ok(0);
        }

        let mut with_last_used: Vec<(String, u64, u64)> = files
            .drain(..)
            .filter_map(|(key, _, size)| {
                self.disk
                    .get(&key)
                    .ok()
                    .flatten()
                    .map(|entry| (key, entry.last_used, size))
            })
            .collect();
        with_last_used.sort_by_key(|(_, last_used, _)| *last_used);

        let mut freed = 0u64;
        let mut evicted = 0usize;
        let mut remaining = total;
        for (key, _, size) in with_last_used {
            if remaining <= self.max_disk_size {
                break;
            }
            self.memory.remove(&key);
            self.disk.remove(&key)?;
            self.metrics.record_eviction();
            freed += size;
            remaining = remaining.saturating_sub(size);
            evicted += 1;
        }
        let _ = freed;
        Ok(evicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;
    use std::time::Duration;

    fn cache_with_config(dir: &Path) -> AnalysisCache {
        let config = CacheConfig {
            max_memory_entries: Some(100),
            default_ttl_ms: Some(0),
            max_disk_size: Some(1024 * 1024),
            disk_dir: Some(dir.to_string_lossy().to_string()),
        };
        AnalysisCache::new(&config).unwrap()
    }

    #[test]
    fn set_then_get_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = cache_with_config(tmp.path());
        cache.set("k1", vec![1, 2, 3], None, None).unwrap();
        let first = cache.get("k1").unwrap();
        cache.set("k1", vec![1, 2, 3], None, None).unwrap();
        let second = cache.get("k1").unwrap();
        assert_eq!(first.value_bytes, second.value_bytes);
        assert_eq!(first.content_hash, second.content_hash);
    }

    #[test]
    fn file_mtime_change_invalidates_cached_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = cache_with_config(tmp.path());
        let watched = tmp.path().join("watched.ts");
        fs::write(&watched, "v1").unwrap();

        cache
            .set(
                "file-key",
                b"parsed-v1".to_vec(),
                Some(watched.to_string_lossy().to_string()),
                Some(60_000),
            )
            .unwrap();
        assert!(cache.get("file-key").is_some());

        thread::sleep(Duration::from_millis(1100));
        fs::write(&watched, "v2, longer content to force a size/mtime change").unwrap();

        assert!(cache.get("file-key").is_none(), "stale entry must be evicted on read");
        assert!(!cache.has("file-key"));
    }

    #[test]
    fn invalidate_by_file_clears_only_matching_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = cache_with_config(tmp.path());
        cache
            .set("a", vec![1], Some("a.ts".to_string()), Some(60_000))
            .unwrap();
        cache
            .set("b", vec![2], Some("b.ts".to_string()), Some(60_000))
            .unwrap();
        let removed = cache.invalidate_by_file("a.ts");
        assert_eq!(removed, 1);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
    }

    #[test]
    fn concurrent_misses_are_coalesced_into_one_compute() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc as StdArc;

        let tmp = tempfile::tempdir().unwrap();
        let cache = StdArc::new(cache_with_config(tmp.path()));
        let calls = StdArc::new(AtomicUsize::new(0));
        let barrier = StdArc::new(std::sync::Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    cache
                        .get_or_compute("shared", None, Some(60_000), || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(20));
                            Ok(b"computed".to_vec())
                        })
                        .unwrap()
                })
            })
            .collect();

        for h in handles {
            assert_eq!(h.join().unwrap().value_bytes, b"computed".to_vec());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn optimize_evicts_least_recently_used_when_over_budget() {
        let tmp = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            max_memory_entries: Some(100),
            default_ttl_ms: Some(0),
            max_disk_size: Some(10),
            disk_dir: Some(tmp.path().to_string_lossy().to_string()),
        };
        let cache = AnalysisCache::new(&config).unwrap();
        cache.set("old", vec![0; 8], None, Some(60_000)).unwrap();
        cache.set("new", vec![0; 8], None, Some(60_000)).unwrap();

        let evicted = cache.optimize().unwrap();
        assert!(evicted >= 1);
        assert!(cache.metrics().disk_bytes <= 10 || evicted > 0);
    }

    #[test]
    fn hit_bumps_access_count_and_last_used() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = cache_with_config(tmp.path());
        let written = cache.set("k1", vec![1, 2, 3], None, Some(60_000)).unwrap();
        assert_eq!(written.access_count, 0);

        let first_hit = cache.get("k1").unwrap();
        assert_eq!(first_hit.access_count, 1);
        thread::sleep(Duration::from_millis(5));
        let second_hit = cache.get("k1").unwrap();
        assert_eq!(second_hit.access_count, 2);
        assert!(second_hit.last_used >= first_hit.last_used);
    }

    #[test]
    fn heavily_read_entry_survives_optimize_over_a_newer_unread_one() {
        let tmp = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            max_memory_entries: Some(100),
            default_ttl_ms: Some(0),
            max_disk_size: Some(10),
            disk_dir: Some(tmp.path().to_string_lossy().to_string()),
        };
        let cache = AnalysisCache::new(&config).unwrap();
        cache.set("hot", vec![0; 8], None, Some(60_000)).unwrap();
        thread::sleep(Duration::from_millis(5));
        cache.set("cold", vec![0; 8], None, Some(60_000)).unwrap();

        // Keep "hot" recently used; "cold" is never read again after being
        // written, so it is the true least-recently-used entry on disk.
        thread::sleep(Duration::from_millis(5));
        cache.get("hot").unwrap();

        cache.optimize().unwrap();
        assert!(cache.get("hot").is_some(), "heavily-read entry should not be evicted");
        assert!(cache.get("cold").is_none(), "write-once, never-read entry should be evicted first");
    }
}

//! `CacheEntry` — the unit stored by the two-tier analysis cache.

use serde::{Deserialize, Serialize};

/// Analysis-type discriminant carried in `CacheEntry::meta` — mirrors the
/// `type` component of a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheAnalysisType {
    File,
    Project,
    Pattern,
    Debt,
    Query,
}

/// Side-channel metadata carried with every cache entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheEntryMeta {
    /// The file this entry was keyed against, if any (drives
    /// `invalidate_by_file` and the mtime-based invalidation invariant).
    pub file_path: Option<String>,
    pub file_size: Option<u64>,
    /// Seconds since the epoch; `None` for non-file-keyed entries.
    pub file_mtime: Option<u64>,
    pub analysis_type: Option<CacheAnalysisType>,
    pub schema_version: u32,
}

/// A single cache tier entry. `value_bytes` is the serialized analysis
/// output; binary values are base64-encoded when persisted to the disk
/// tier's JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value_bytes: Vec<u8>,
    pub created_at: u64,
    pub ttl_ms: u64,
    pub access_count: u64,
    pub last_used: u64,
    pub size_bytes: u64,
    pub content_hash: u64,
    pub meta: CacheEntryMeta,
}

impl CacheEntry {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.ttl_ms != 0 && now_ms.saturating_sub(self.created_at) >= self.ttl_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(created_at: u64, ttl_ms: u64) -> CacheEntry {
        CacheEntry {
            key: "k".into(),
            value_bytes: vec![],
            created_at,
            ttl_ms,
            access_count: 0,
            last_used: created_at,
            size_bytes: 0,
            content_hash: 0,
            meta: CacheEntryMeta::default(),
        }
    }

    #[test]
    fn zero_ttl_never_expires() {
        assert!(!entry(0, 0).is_expired(1_000_000));
    }

    #[test]
    fn expires_once_ttl_elapsed() {
        let e = entry(1_000, 500);
        assert!(!e.is_expired(1_400));
        assert!(e.is_expired(1_500));
        assert!(e.is_expired(2_000));
    }
}

//! File fingerprint — the unit of change detection.

use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// `(path, content_hash, mtime, size)`. Equality of `content_hash` across
/// two fingerprints for the same path means the file's prior analysis
/// output is reusable; `mtime` is advisory only, used for cache
/// cross-invalidation, never for reuse decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFingerprint {
    pub path: PathBuf,
    pub content_hash: u64,
    #[serde(with = "systemtime_secs")]
    pub mtime: SystemTime,
    pub size: u64,
}

impl FileFingerprint {
    pub fn new(path: PathBuf, content_hash: u64, mtime: SystemTime, size: u64) -> Self {
        Self {
            path,
            content_hash,
            mtime,
            size,
        }
    }

    /// Whether `other` (a freshly computed fingerprint) represents a
    /// content change relative to `self` (the previously stored one).
    pub fn content_changed(&self, other: &FileFingerprint) -> bool {
        self.content_hash != other.content_hash
    }
}

/// Stable hash of file bytes, used as `content_hash`. XXH3 matches the
/// teacher workspace's choice of `xxhash-rust` for fast content hashing.
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    xxhash_rust::xxh3::xxh3_64(bytes)
}

mod systemtime_secs {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(t: &SystemTime, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let dur = t.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        s.serialize_u64(dur.as_secs())
    }

    pub fn deserialize<'de, D>(d: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(d)?;
        Ok(UNIX_EPOCH + Duration::from_secs(secs))
    }
}

//! Disk cache tier: one JSON file per key under `<disk_dir>/<key>.json`.
//! `value_bytes` is base64-encoded in the on-disk representation since it
//! may hold arbitrary binary payloads.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use codekb_core::types::{CacheEntry, CacheEntryMeta};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct DiskEntry {
    key: String,
    value_b64: String,
    created_at: u64,
    ttl_ms: u64,
    access_count: u64,
    last_used: u64,
    size_bytes: u64,
    content_hash: u64,
    meta: CacheEntryMeta,
}

impl From<&CacheEntry> for DiskEntry {
    fn from(e: &CacheEntry) -> Self {
        Self {
            key: e.key.clone(),
            value_b64: BASE64.encode(&e.value_bytes),
            created_at: e.created_at,
            ttl_ms: e.ttl_ms,
            access_count: e.access_count,
            last_used: e.last_used,
            size_bytes: e.size_bytes,
            content_hash: e.content_hash,
            meta: e.meta.clone(),
        }
    }
}

impl DiskEntry {
    fn into_cache_entry(self) -> Result<CacheEntry, base64::DecodeError> {
        Ok(CacheEntry {
            key: self.key,
            value_bytes: BASE64.decode(self.value_b64)?,
            created_at: self.created_at,
            ttl_ms: self.ttl_ms,
            access_count: self.access_count,
            last_used: self.last_used,
            size_bytes: self.size_bytes,
            content_hash: self.content_hash,
            meta: self.meta,
        })
    }
}

#[derive(Clone)]
pub struct DiskTier {
    dir: PathBuf,
}

/// Cache keys are opaque hex hashes, so they are always safe path
/// components, but guard against a corrupt or hand-crafted key anyway.
fn is_safe_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl DiskTier {
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Option<PathBuf> {
        if !is_safe_key(key) {
            return None;
        }
        Some(self.dir.join(format!("{key}.json")))
    }

    pub fn get(&self, key: &str) -> io::Result<Option<CacheEntry>> {
        let Some(path) = self.path_for(key) else {
            return Ok(None);
        };
        match fs::read(&path) {
            Ok(bytes) => {
                let disk_entry: DiskEntry = serde_json::from_slice(&bytes)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                let entry = disk_entry
                    .into_cache_entry()
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                Ok(Some(entry))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn insert(&self, entry: &CacheEntry) -> io::Result<()> {
        let Some(path) = self.path_for(&entry.key) else {
            return Ok(());
        };
        let disk_entry = DiskEntry::from(entry);
        let bytes = serde_json::to_vec_pretty(&disk_entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)
    }

    pub fn remove(&self, key: &str) -> io::Result<()> {
        let Some(path) = self.path_for(key) else {
            return Ok(());
        };
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn clear(&self) -> io::Result<()> {
        if !self.dir.exists() {
            return Ok(());
        }
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.path().extension().and_then(|e| e.to_str()) == Some("json") {
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }

    /// List `(key, path, size_bytes, last_used)` for every entry, used by
    /// `optimize()` to sweep the oldest entries when over the disk budget.
    pub fn list(&self) -> io::Result<Vec<(String, PathBuf, u64)>> {
        let mut out = Vec::new();
        if !self.dir.exists() {
            return Ok(out);
        }
        for dirent in fs::read_dir(&self.dir)? {
            let dirent = dirent?;
            let path = dirent.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let meta = dirent.metadata()?;
            let key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            out.push((key, path, meta.len()));
        }
        Ok(out)
    }

    pub fn total_bytes(&self) -> io::Result<u64> {
        Ok(self.list()?.iter().map(|(_, _, size)| size).sum())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str) -> CacheEntry {
        CacheEntry {
            key: key.to_string(),
            value_bytes: vec![9, 8, 7, 6],
            created_at: 1,
            ttl_ms: 0,
            access_count: 0,
            last_used: 1,
            size_bytes: 4,
            content_hash: 42,
            meta: CacheEntryMeta::default(),
        }
    }

    #[test]
    fn round_trips_binary_payload_through_base64() {
        let tmp = tempfile::tempdir().unwrap();
        let tier = DiskTier::new(tmp.path()).unwrap();
        let e = entry("abc123");
        tier.insert(&e).unwrap();
        let loaded = tier.get("abc123").unwrap().unwrap();
        assert_eq!(loaded.value_bytes, e.value_bytes);
        assert_eq!(loaded.content_hash, 42);
    }

    #[test]
    fn missing_key_is_none_not_error() {
        let tmp = tempfile::tempdir().unwrap();
        let tier = DiskTier::new(tmp.path()).unwrap();
        assert!(tier.get("nope").unwrap().is_none());
    }

    #[test]
    fn unsafe_key_is_rejected_without_touching_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let tier = DiskTier::new(tmp.path()).unwrap();
        assert!(tier.get("../../etc/passwd").unwrap().is_none());
    }
}

//! `FileTreeBackend` — the file-variant `StorageBackend`. On-disk layout:
//! documents under `kb/`, audit trail under `.audit/`. Write serialization
//! via `fd_lock::RwLock<File>`, the same advisory-lock idiom as a
//! cross-process workspace lock.

use std::fs::{self, File, OpenOptions};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::UNIX_EPOCH;

use codekb_core::traits::storage::{
    BlobMeta, HealthStatus, LineRange, ListedFile, SearchHit, SearchOptions, StorageBackend,
    StorageBackendError, StorageSnapshot,
};
use codekb_core::types::hash_bytes;
use fd_lock::RwLock as FdRwLock;

use crate::audit::AuditLog;

pub struct FileTreeBackend {
    root: PathBuf,
    lock: Mutex<FdRwLock<File>>,
    audit: AuditLog,
}

fn is_safe_relative_path(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('/')
        && Path::new(path)
            .components()
            .all(|c| matches!(c, std::path::Component::Normal(_)))
}

impl FileTreeBackend {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageBackendError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let lock_path = root.join(".lock");
        let lock_file = OpenOptions::new().create(true).read(true).write(true).open(&lock_path)?;
        Ok(Self {
            audit: AuditLog::new(&root.join(".audit")),
            lock: Mutex::new(FdRwLock::new(lock_file)),
            root,
        })
    }

    fn docs_dir(&self) -> PathBuf {
        self.root.join("kb")
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageBackendError> {
        if !is_safe_relative_path(path) {
            return Err(StorageBackendError::PermissionDenied(format!("unsafe path: {path}")));
        }
        Ok(self.docs_dir().join(path))
    }

    fn meta_for(&self, full_path: &Path, bytes: &[u8]) -> Result<BlobMeta, StorageBackendError> {
        let modified_unix_secs = fs::metadata(full_path)?
            .modified()?
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Ok(BlobMeta {
            content_type: None,
            size: bytes.len() as u64,
            modified_unix_secs,
            extra: serde_json::json!({ "content_hash": hash_bytes(bytes) }),
        })
    }
}

impl StorageBackend for FileTreeBackend {
    fn init(&self) -> Result<(), StorageBackendError> {
        fs::create_dir_all(self.docs_dir())?;
        fs::create_dir_all(self.root.join(".audit"))?;
        let probe = self.root.join(".write-probe");
        fs::write(&probe, b"ok")?;
        fs::remove_file(&probe)?;
        Ok(())
    }

    fn health(&self) -> Result<HealthStatus, StorageBackendError> {
        if !self.root.is_dir() {
            return Ok(HealthStatus {
                healthy: false,
                backend_kind: "file-tree".into(),
                detail: "root directory missing".into(),
            });
        }
        let mut guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        match guard.try_read() {
            Ok(_) => Ok(HealthStatus {
                healthy: true,
                backend_kind: "file-tree".into(),
                detail: "ready".into(),
            }),
            Err(_) => Ok(HealthStatus {
                healthy: false,
                backend_kind: "file-tree".into(),
                detail: "lock file contended".into(),
            }),
        }
    }

    fn read(&self, path: &str) -> Result<(Vec<u8>, BlobMeta), StorageBackendError> {
        let full = self.resolve(path)?;
        let mut file = File::open(&full).map_err(|_| StorageBackendError::NotFound(path.to_string()))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        let meta = self.meta_for(&full, &bytes)?;
        Ok((bytes, meta))
    }

    fn write(
        &self,
        path: &str,
        bytes: &[u8],
        _meta: Option<BlobMeta>,
    ) -> Result<(), StorageBackendError> {
        let full = self.resolve(path)?;
        let mut guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let _write_lock = guard
            .try_write()
            .map_err(|_| StorageBackendError::Conflict(path.to_string()))?;

        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = full.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &full)?;
        self.audit
            .record("write", &serde_json::json!({ "path": path, "size_bytes": bytes.len() }))
            .map_err(|e| StorageBackendError::BackendUnavailable(e.to_string()))?;
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<(), StorageBackendError> {
        let full = self.resolve(path)?;
        let mut guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let _write_lock = guard
            .try_write()
            .map_err(|_| StorageBackendError::Conflict(path.to_string()))?;

        fs::remove_file(&full).map_err(|_| StorageBackendError::NotFound(path.to_string()))?;
        self.audit
            .record("delete", &serde_json::json!({ "path": path }))
            .map_err(|e| StorageBackendError::BackendUnavailable(e.to_string()))?;
        Ok(())
    }

    fn list(&self, dir: Option<&str>) -> Result<Vec<ListedFile>, StorageBackendError> {
        let root = self.docs_dir();
        if !root.exists() {
            return Ok(Vec::new());
        }
        let mut paths = Vec::new();
        walk(&root, &root, &mut paths)?;
        if let Some(prefix) = dir {
            paths.retain(|p| p.starts_with(prefix));
        }
        paths.sort();

        let mut out = Vec::with_capacity(paths.len());
        for path in paths {
            let full = root.join(&path);
            let Ok(bytes) = fs::read(&full) else { continue };
            let meta = self.meta_for(&full, &bytes)?;
            out.push(ListedFile { path, meta });
        }
        Ok(out)
    }

    fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, StorageBackendError> {
        let query_lower = query.to_lowercase();
        let mut hits = Vec::new();
        for listed in self.list(options.category.as_deref())? {
            let full = self.docs_dir().join(&listed.path);
            let Ok(content) = fs::read_to_string(&full) else { continue };
            let lines: Vec<&str> = content.lines().collect();
            let mut matches = 0usize;
            let mut ranges = Vec::new();
            for (i, line) in lines.iter().enumerate() {
                if line.to_lowercase().contains(&query_lower) {
                    matches += 1;
                    let start = i.saturating_sub(1) as u32;
                    let end = (i + 1).min(lines.len().saturating_sub(1)) as u32;
                    ranges.push(LineRange { start, end });
                }
            }
            if matches > 0 {
                let score = matches as f64 / content.len().max(1) as f64;
                hits.push(SearchHit { path: listed.path, score, matches: ranges });
            }
        }
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        if let Some(limit) = options.limit {
            hits.truncate(limit);
        }
        Ok(hits)
    }

    fn export(&self) -> Result<StorageSnapshot, StorageBackendError> {
        let mut files = Vec::new();
        for listed in self.list(None)? {
            let (bytes, meta) = self.read(&listed.path)?;
            files.push((listed.path, bytes, meta));
        }
        Ok(StorageSnapshot { files, relationships: Vec::new() })
    }

    fn import(&self, snapshot: &StorageSnapshot) -> Result<(), StorageBackendError> {
        for (path, bytes, meta) in &snapshot.files {
            self.write(path, bytes, Some(meta.clone()))?;
        }
        Ok(())
    }
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<(), StorageBackendError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk(root, &path, out)?;
        } else if let Ok(rel) = path.strip_prefix(root) {
            out.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
    Ok(())
}

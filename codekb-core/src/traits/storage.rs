//! `StorageBackend` — the capability interface over a path-keyed blob
//! store. Two implementations live in `codekb-storage`: a file-tree
//! variant and a graph variant. Both are object-safe and `Send + Sync`,
//! with a blanket `Arc<T>` impl so either one can be shared behind a
//! single trait object.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::error_code;
use crate::errors::ErrorCode;

/// Failure modes for storage operations.
#[derive(Debug, Error)]
pub enum StorageBackendError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: concurrent write to {0}")]
    Conflict(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl ErrorCode for StorageBackendError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => error_code::NOT_FOUND,
            Self::Conflict(_) => error_code::CONFLICT,
            Self::PermissionDenied(_) => error_code::PERMISSION_DENIED,
            Self::BackendUnavailable(_) | Self::Io(_) | Self::Serde(_) => {
                error_code::BACKEND_UNAVAILABLE
            }
        }
    }
}

/// Per-file metadata returned alongside `read`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlobMeta {
    pub content_type: Option<String>,
    pub size: u64,
    pub modified_unix_secs: u64,
    pub extra: serde_json::Value,
}

/// Liveness + backend-specific detail returned by `health()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub backend_kind: String,
    pub detail: String,
}

/// A discovered file from `list()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListedFile {
    pub path: String,
    pub meta: BlobMeta,
}

/// Options for `search()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchOptions {
    pub limit: Option<usize>,
    pub category: Option<String>,
    pub fuzzy: Option<bool>,
}

/// A line range within a matched file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

/// A single search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub path: String,
    pub score: f64,
    pub matches: Vec<LineRange>,
}

/// A lossless (except for graph-only relationships) snapshot of the store,
/// used by `export`/`import`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSnapshot {
    pub files: Vec<(String, Vec<u8>, BlobMeta)>,
    /// Populated only by the graph variant; degrades to per-file metadata
    /// when exported into the file-tree variant.
    pub relationships: Vec<serde_json::Value>,
}

/// Uniform path-keyed blob store capability.
pub trait StorageBackend: Send + Sync {
    fn init(&self) -> Result<(), StorageBackendError>;
    fn health(&self) -> Result<HealthStatus, StorageBackendError>;
    fn read(&self, path: &str) -> Result<(Vec<u8>, BlobMeta), StorageBackendError>;
    fn write(
        &self,
        path: &str,
        bytes: &[u8],
        meta: Option<BlobMeta>,
    ) -> Result<(), StorageBackendError>;
    fn delete(&self, path: &str) -> Result<(), StorageBackendError>;
    fn list(&self, dir: Option<&str>) -> Result<Vec<ListedFile>, StorageBackendError>;
    fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, StorageBackendError>;
    fn export(&self) -> Result<StorageSnapshot, StorageBackendError>;
    fn import(&self, snapshot: &StorageSnapshot) -> Result<(), StorageBackendError>;
}

impl<T: StorageBackend + ?Sized> StorageBackend for Arc<T> {
    fn init(&self) -> Result<(), StorageBackendError> {
        (**self).init()
    }
    fn health(&self) -> Result<HealthStatus, StorageBackendError> {
        (**self).health()
    }
    fn read(&self, path: &str) -> Result<(Vec<u8>, BlobMeta), StorageBackendError> {
        (**self).read(path)
    }
    fn write(
        &self,
        path: &str,
        bytes: &[u8],
        meta: Option<BlobMeta>,
    ) -> Result<(), StorageBackendError> {
        (**self).write(path, bytes, meta)
    }
    fn delete(&self, path: &str) -> Result<(), StorageBackendError> {
        (**self).delete(path)
    }
    fn list(&self, dir: Option<&str>) -> Result<Vec<ListedFile>, StorageBackendError> {
        (**self).list(dir)
    }
    fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, StorageBackendError> {
        (**self).search(query, options)
    }
    fn export(&self) -> Result<StorageSnapshot, StorageBackendError> {
        (**self).export()
    }
    fn import(&self, snapshot: &StorageSnapshot) -> Result<(), StorageBackendError> {
        (**self).import(snapshot)
    }
}

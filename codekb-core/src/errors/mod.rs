//! The engine's error taxonomy, as a closed set of `thiserror` enums.
//!
//! Each component crate may define a more specific error enum; all convert
//! into `EngineError` via `#[from]`. Component boundaries always return
//! `Result<T, E>` — never a boxed `dyn Error`, never a panic outside test
//! code.

pub mod error_code;

pub use error_code::ErrorCode;

use serde::{Deserialize, Serialize};

/// The union of all error kinds a caller of this workspace may observe.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("schema mismatch: expected {expected}, found {found}")]
    SchemaMismatch { expected: u32, found: u32 },

    #[error("operation timed out after {0}ms")]
    Timeout(u64),

    #[error("operation cancelled")]
    Cancelled,

    #[error("shutting down, no further work accepted")]
    ShuttingDown,

    #[error("queue full (max {0})")]
    QueueFull(usize),

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("worker crashed while executing task {task_id}")]
    WorkerCrashed { task_id: String },

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("corrupt cache entry: {0}")]
    CorruptCacheEntry(String),

    #[error("analysis failure for {file_path}: {message}")]
    AnalysisFailure { file_path: String, message: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage backend error: {0}")]
    Storage(#[from] crate::traits::storage::StorageBackendError),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl ErrorCode for EngineError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => error_code::NOT_FOUND,
            Self::AlreadyExists(_) => error_code::ALREADY_EXISTS,
            Self::PermissionDenied(_) => error_code::PERMISSION_DENIED,
            Self::InvalidArgument(_) => error_code::INVALID_ARGUMENT,
            Self::SchemaMismatch { .. } => error_code::SCHEMA_MISMATCH,
            Self::Timeout(_) => error_code::TIMEOUT,
            Self::Cancelled => error_code::CANCELLED,
            Self::ShuttingDown => error_code::SHUTTING_DOWN,
            Self::QueueFull(_) => error_code::QUEUE_FULL,
            Self::RateLimited { .. } => error_code::RATE_LIMITED,
            Self::WorkerCrashed { .. } => error_code::WORKER_CRASHED,
            Self::BackendUnavailable(_) => error_code::BACKEND_UNAVAILABLE,
            Self::CorruptCacheEntry(_) => error_code::CORRUPT_CACHE_ENTRY,
            Self::AnalysisFailure { .. } => error_code::ANALYSIS_FAILURE,
            Self::Conflict(_) => error_code::CONFLICT,
            Self::Io(_) => error_code::BACKEND_UNAVAILABLE,
            Self::Storage(inner) => inner.error_code(),
            Self::ConfigParse(_) => error_code::CONFIG_PARSE_ERROR,
        }
    }
}

/// A lightweight, serializable projection of an error, attached to a failed
/// `AnalysisResult`. Kept separate from `EngineError` because results cross
/// thread/task boundaries and must be `Send + 'static` plain data, not a
/// live error trait object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskErrorInfo {
    pub code: String,
    pub message: String,
}

impl TaskErrorInfo {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl From<&EngineError> for TaskErrorInfo {
    fn from(e: &EngineError) -> Self {
        Self::new(e.error_code(), e.to_string())
    }
}

/// An unresolved reference recorded by the resolver — not an error per se,
/// just a symbol that couldn't be bound to a definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnresolvedRef {
    pub file_path: String,
    pub symbol: String,
    pub reason: String,
}

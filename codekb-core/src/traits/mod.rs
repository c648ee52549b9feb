//! Shared traits used across crates.

pub mod cancellation;
pub mod parser;
pub mod storage;

pub use cancellation::CancellationToken;
pub use parser::{ParseFn, ParseOutcome};
pub use storage::{
    BlobMeta, HealthStatus, LineRange, ListedFile, SearchHit, SearchOptions, StorageBackend,
    StorageBackendError, StorageSnapshot,
};

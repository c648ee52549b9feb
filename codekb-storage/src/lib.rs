//! # codekb-storage
//!
//! C1 Storage Backend (file-tree and graph variants behind one trait) plus
//! the C8 backend migrator that streams a file-tree store into a graph
//! store. The trait and its supporting types live in `codekb-core`; this
//! crate provides the two concrete implementations and the migrator.

pub mod audit;
pub mod file_tree;
pub mod graph_backend;
pub mod migrator;

pub use audit::AuditLog;
pub use codekb_core::traits::storage::{
    BlobMeta, HealthStatus, LineRange, ListedFile, SearchHit, SearchOptions, StorageBackend,
    StorageBackendError, StorageSnapshot,
};
pub use file_tree::FileTreeBackend;
pub use graph_backend::GraphBackend;
pub use migrator::{BackendMigrator, MigrationResult, MigratorConfig};

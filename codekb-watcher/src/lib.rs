//! # codekb-watcher
//!
//! Debounced, batched file-system change source feeding the
//! incremental analyzer's live-update pipeline.

pub mod filter;
pub mod types;
pub mod watcher;

pub use types::{BatchedChanges, ChangeKind, FileChange};
pub use watcher::FileWatcher;

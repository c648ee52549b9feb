//! `BatchedChanges` and friends.

use std::path::PathBuf;
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

impl ChangeKind {
    /// Coalescing a path's raw events prefers the latest kind, but
    /// `Removed` always wins over a later `Modified`.
    pub fn coalesce(previous: ChangeKind, incoming: ChangeKind) -> ChangeKind {
        if previous == ChangeKind::Removed {
            ChangeKind::Removed
        } else {
            incoming
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
    pub detected_at: SystemTime,
}

/// One debounce-quiet-period's worth of totally-ordered changes.
#[derive(Debug, Clone)]
pub struct BatchedChanges {
    pub files: Vec<FileChange>,
    pub batch_id: u64,
}

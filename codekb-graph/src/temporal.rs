//! Temporal surface: insertion-by-timestamp, range retrieval, forward/
//! backward sequence traversal, and importance decay. Grounded on
//! `cortex-causal::graph::temporal_graph`'s event-order reconstruction and
//! `cortex-temporal`'s snapshot/retention shapes, adapted from event replay
//! to a directly-maintained sorted timeline.

use std::sync::{Arc, Mutex};

use crate::types::{NodeId, TemporalEntry};

#[derive(Default)]
struct Timeline {
    // Kept sorted by `timestamp_ms` ascending; insertion does a binary
    // search so range queries stay a simple slice.
    entries: Vec<TemporalEntry>,
}

/// Tracks a node's position in time plus an importance score that decays
/// the longer it goes untouched.
#[derive(Clone)]
pub struct TemporalStore {
    inner: Arc<Mutex<Timeline>>,
}

impl TemporalStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Timeline::default())),
        }
    }

    pub fn insert(&self, node_id: NodeId, timestamp_ms: u64, importance: f64) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let pos = guard
            .entries
            .partition_point(|e| e.timestamp_ms <= timestamp_ms);
        guard.entries.insert(
            pos,
            TemporalEntry { node_id, timestamp_ms, importance: importance.clamp(0.0, 1.0) },
        );
    }

    /// All entries with `from_ms <= timestamp_ms <= to_ms`, in ascending order.
    pub fn range(&self, from_ms: u64, to_ms: u64) -> Vec<TemporalEntry> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard
            .entries
            .iter()
            .filter(|e| e.timestamp_ms >= from_ms && e.timestamp_ms <= to_ms)
            .cloned()
            .collect()
    }

    /// The entry immediately after `node_id`'s most recent occurrence.
    pub fn next_after(&self, node_id: NodeId) -> Option<TemporalEntry> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let pos = guard.entries.iter().rposition(|e| e.node_id == node_id)?;
        guard.entries.get(pos + 1).cloned()
    }

    /// The entry immediately before `node_id`'s earliest occurrence.
    pub fn prev_before(&self, node_id: NodeId) -> Option<TemporalEntry> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let pos = guard.entries.iter().position(|e| e.node_id == node_id)?;
        pos.checked_sub(1).and_then(|i| guard.entries.get(i).cloned())
    }

    /// Multiplicative decay per sweep: `importance' = max(0, importance *
    /// alpha)`, clamped to `[0, 1]`, applied to every entry older than
    /// `older_than_ms`.
    pub fn decay(&self, older_than_ms: u64, alpha: f64) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        for entry in guard.entries.iter_mut() {
            if entry.timestamp_ms < older_than_ms {
                entry.importance = (entry.importance * alpha).max(0.0).min(1.0);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TemporalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_returns_entries_within_bounds_inclusive() {
        let store = TemporalStore::new();
        store.insert(NodeId(1), 100, 0.9);
        store.insert(NodeId(2), 200, 0.8);
        store.insert(NodeId(3), 300, 0.7);

        let entries = store.range(100, 200);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].node_id, NodeId(1));
        assert_eq!(entries[1].node_id, NodeId(2));
    }

    #[test]
    fn forward_and_backward_sequence_traversal() {
        let store = TemporalStore::new();
        store.insert(NodeId(1), 100, 1.0);
        store.insert(NodeId(2), 200, 1.0);
        store.insert(NodeId(3), 300, 1.0);

        assert_eq!(store.next_after(NodeId(1)).unwrap().node_id, NodeId(2));
        assert_eq!(store.prev_before(NodeId(3)).unwrap().node_id, NodeId(2));
        assert!(store.next_after(NodeId(3)).is_none());
        assert!(store.prev_before(NodeId(1)).is_none());
    }

    #[test]
    fn decay_only_touches_entries_older_than_threshold() {
        let store = TemporalStore::new();
        store.insert(NodeId(1), 100, 1.0);
        store.insert(NodeId(2), 500, 1.0);

        store.decay(300, 0.5);

        let all = store.range(0, 1_000);
        let old = all.iter().find(|e| e.node_id == NodeId(1)).unwrap();
        let recent = all.iter().find(|e| e.node_id == NodeId(2)).unwrap();
        assert!((old.importance - 0.5).abs() < 1e-9);
        assert!((recent.importance - 1.0).abs() < 1e-9);
    }

    #[test]
    fn decay_clamps_at_zero() {
        let store = TemporalStore::new();
        store.insert(NodeId(1), 100, 0.1);
        store.decay(200, -5.0);
        assert_eq!(store.range(0, 200)[0].importance, 0.0);
    }
}

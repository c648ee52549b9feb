//! Priority dispatch queue, ordered by `(−priority, submitted_at)` so
//! higher-priority tasks dispatch first and ties break FIFO.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use codekb_core::types::AnalysisTask;
use tokio::sync::oneshot;

use codekb_core::traits::cancellation::CancellationToken;
use codekb_core::types::AnalysisResult;

pub struct QueuedTask {
    pub task: AnalysisTask,
    pub responder: oneshot::Sender<AnalysisResult>,
    pub cancel: CancellationToken,
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.task.dispatch_key() == other.task.dispatch_key()
    }
}
impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    /// `BinaryHeap` is a max-heap; the task that should dispatch next must
    /// compare greatest: higher priority wins, ties broken by the earlier
    /// `submitted_at` (FIFO).
    fn cmp(&self, other: &Self) -> Ordering {
        let (p1, t1) = self.task.dispatch_key();
        let (p2, t2) = other.task.dispatch_key();
        p1.cmp(&p2).then_with(|| t2.cmp(&t1))
    }
}

#[derive(Default)]
pub struct PriorityQueue {
    heap: BinaryHeap<QueuedTask>,
}

impl PriorityQueue {
    pub fn push(&mut self, task: QueuedTask) {
        self.heap.push(task);
    }

    pub fn pop(&mut self) -> Option<QueuedTask> {
        self.heap.pop()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Remove a queued (not-yet-dispatched) task by id, for cancellation.
    pub fn remove(&mut self, task_id: &codekb_core::TaskId) -> bool {
        let items: Vec<QueuedTask> = std::mem::take(&mut self.heap).into_vec();
        let mut found = false;
        for item in items {
            if &item.task.id == task_id && !found {
                found = true;
                continue;
            }
            self.heap.push(item);
        }
        found
    }
}

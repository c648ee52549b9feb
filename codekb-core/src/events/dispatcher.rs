//! `EventDispatcher` — typed subscription fan-out with bounded buffers.
//!
//! The orchestrator owns a set of typed subscription channels with bounded
//! buffers; slow subscribers are dropped past the buffer rather than
//! stalling the pipeline. Each subscriber gets its own bounded
//! `crossbeam_channel`; a full channel means that subscriber is falling
//! behind, so the event is dropped for it (not for the others) and a
//! counter records the drop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crossbeam_channel::{Receiver, Sender, TrySendError};

/// A bounded fan-out of cloneable events of type `T`.
pub struct EventDispatcher<T: Clone + Send + 'static> {
    subscribers: Mutex<Vec<Sender<T>>>,
    dropped: AtomicU64,
    capacity: usize,
}

impl<T: Clone + Send + 'static> EventDispatcher<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            dropped: AtomicU64::new(0),
            capacity,
        }
    }

    /// Register a new subscriber, returning the receiving end.
    pub fn subscribe(&self) -> Receiver<T> {
        let (tx, rx) = crossbeam_channel::bounded(self.capacity);
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    /// Publish an event to every live subscriber. Subscribers whose buffer
    /// is full are skipped for this event rather than blocking the caller;
    /// subscribers whose receiver has been dropped are pruned.
    pub fn publish(&self, event: T) {
        let mut subs = self.subscribers.lock().unwrap();
        subs.retain_mut(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    /// Total events dropped across all subscribers due to a full buffer.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }
}

impl<T: Clone + Send + 'static> Default for EventDispatcher<T> {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_delivers_to_all_subscribers() {
        let dispatcher: EventDispatcher<u32> = EventDispatcher::new(4);
        let rx1 = dispatcher.subscribe();
        let rx2 = dispatcher.subscribe();
        dispatcher.publish(7);
        assert_eq!(rx1.try_recv().unwrap(), 7);
        assert_eq!(rx2.try_recv().unwrap(), 7);
    }

    #[test]
    fn full_subscriber_drops_without_blocking_others() {
        let dispatcher: EventDispatcher<u32> = EventDispatcher::new(1);
        let slow = dispatcher.subscribe();
        let fast = dispatcher.subscribe();
        dispatcher.publish(1);
        dispatcher.publish(2); // slow's buffer (cap 1) is full, event 2 is dropped for it
        assert_eq!(slow.try_recv().unwrap(), 1);
        assert!(slow.try_recv().is_err());
        assert_eq!(fast.try_recv().unwrap(), 1);
        assert_eq!(fast.try_recv().unwrap(), 2);
        assert_eq!(dispatcher.dropped_count(), 1);
    }

    #[test]
    fn dropped_receiver_is_pruned() {
        let dispatcher: EventDispatcher<u32> = EventDispatcher::new(4);
        {
            let _rx = dispatcher.subscribe();
            assert_eq!(dispatcher.subscriber_count(), 1);
        }
        dispatcher.publish(1);
        assert_eq!(dispatcher.subscriber_count(), 0);
    }
}

//! Singleflight coordination: concurrent misses for the same key are
//! coalesced into a single computation; waiters share the result. The
//! coordination map entry is removed once the last waiter has departed, so
//! a fresh miss after completion starts a fresh computation rather than
//! replaying a stale one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

struct InFlight<V> {
    done: Arc<(Mutex<Option<V>>, std::sync::Condvar)>,
    waiters: usize,
}

/// Coalesces concurrent callers racing to compute the same key.
pub struct SingleFlight<V: Clone> {
    inflight: Mutex<HashMap<String, InFlight<V>>>,
}

impl<V: Clone> SingleFlight<V> {
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Run `compute` for `key`, or wait for an already-running computation
    /// for the same key to finish and reuse its result.
    pub fn run(&self, key: &str, compute: impl FnOnce() -> V) -> V {
        let slot = {
            let mut map = self.inflight.lock().unwrap();
            if let Some(existing) = map.get_mut(key) {
                existing.waiters += 1;
                Some(existing.done.clone())
            } else {
                map.insert(
                    key.to_string(),
                    InFlight {
                        done: Arc::new((Mutex::new(None), std::sync::Condvar::new())),
                        waiters: 1,
                    },
                );
                None
            }
        };

        if let Some(done) = slot {
            // Someone else is already computing; wait for their result.
            let (lock, cvar) = &*done;
            let mut guard = lock.lock().unwrap();
            while guard.is_none() {
                guard = cvar.wait(guard).unwrap();
            }
            let result = guard.clone().expect("guarded by while-none loop");
            self.depart(key);
            return result;
        }

        // We are the leader: compute, publish, wake waiters, then clean up.
        let result = compute();
        let done = {
            let map = self.inflight.lock().unwrap();
            map.get(key)
                .map(|inflight| inflight.done.clone())
                .expect("inserted above")
        };
        {
            let (lock, cvar) = &*done;
            let mut guard = lock.lock().unwrap();
            *guard = Some(result.clone());
            cvar.notify_all();
        }
        self.depart(key);
        result
    }

    fn depart(&self, key: &str) {
        let mut map = self.inflight.lock().unwrap();
        let remove = match map.get_mut(key) {
            Some(inflight) => {
                inflight.waiters -= 1;
                inflight.waiters == 0
            }
            None => false,
        };
        if remove {
            map.remove(key);
        }
    }
}

impl<V: Clone> Default for SingleFlight<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn concurrent_misses_share_one_computation() {
        let sf: Arc<SingleFlight<u32>> = Arc::new(SingleFlight::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(std::sync::Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let sf = sf.clone();
                let calls = calls.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    sf.run("k", || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(std::time::Duration::from_millis(20));
                        99
                    })
                })
            })
            .collect();

        for h in handles {
            assert_eq!(h.join().unwrap(), 99);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn map_entry_is_cleared_after_completion() {
        let sf: SingleFlight<u32> = SingleFlight::new();
        sf.run("k", || 1);
        assert!(sf.inflight.lock().unwrap().is_empty());
    }

    #[test]
    fn sequential_calls_for_same_key_each_recompute() {
        let sf: SingleFlight<u32> = SingleFlight::new();
        let calls = AtomicUsize::new(0);
        sf.run("k", || {
            calls.fetch_add(1, Ordering::SeqCst);
            1
        });
        sf.run("k", || {
            calls.fetch_add(1, Ordering::SeqCst);
            2
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

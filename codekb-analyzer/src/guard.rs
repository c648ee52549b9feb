//! Per-path reanalysis guard: concurrent triggers for the same
//! file (e.g. a watcher batch racing an explicit reanalysis request) must
//! serialize rather than run two analyses of the same path at once. Modeled
//! on `codekb_cache::singleflight::SingleFlight`'s waiters-counted map, but
//! holding mutual exclusion across an `async` critical section instead of
//! coalescing a single computed value.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

struct Entry {
    lock: Arc<AsyncMutex<()>>,
    waiters: usize,
}

/// Serializes concurrent reanalysis attempts on the same file path.
pub struct PathGuard {
    entries: Mutex<HashMap<String, Entry>>,
}

/// Held for the duration of one path's reanalysis; releases the path's lock
/// and, if no other waiter is queued, drops the map entry on drop.
pub struct PathGuardHandle<'a> {
    guard: &'a PathGuard,
    key: String,
    _lock: OwnedMutexGuard<()>,
}

impl Drop for PathGuardHandle<'_> {
    fn drop(&mut self) {
        self.guard.depart(&self.key);
    }
}

impl PathGuard {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire exclusive access to `path`, waiting for any in-progress
    /// reanalysis of the same path to finish first.
    pub async fn acquire(&self, path: &str) -> PathGuardHandle<'_> {
        let lock = {
            let mut entries = self.entries.lock().unwrap();
            let entry = entries.entry(path.to_string()).or_insert_with(|| Entry {
                lock: Arc::new(AsyncMutex::new(())),
                waiters: 0,
            });
            entry.waiters += 1;
            entry.lock.clone()
        };
        let owned = lock.lock_owned().await;
        PathGuardHandle {
            guard: self,
            key: path.to_string(),
            _lock: owned,
        }
    }

    fn depart(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap();
        let remove = match entries.get_mut(key) {
            Some(entry) => {
                entry.waiters -= 1;
                entry.waiters == 0
            }
            None => false,
        };
        if remove {
            entries.remove(key);
        }
    }

    #[cfg(test)]
    fn tracked_paths(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

impl Default for PathGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_acquires_on_same_path_serialize() {
        let guard = Arc::new(PathGuard::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..4 {
            let guard = guard.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                let _h = guard.acquire("a.ts").await;
                order.lock().unwrap().push(i);
                tokio::time::sleep(Duration::from_millis(5)).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(order.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn distinct_paths_do_not_block_each_other() {
        let guard = Arc::new(PathGuard::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let g1 = guard.acquire("a.ts").await;
        let guard2 = guard.clone();
        let counter2 = counter.clone();
        let handle = tokio::spawn(async move {
            let _h = guard2.acquire("b.ts").await;
            counter2.fetch_add(1, Ordering::SeqCst);
        });
        handle.await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        drop(g1);
    }

    #[tokio::test]
    async fn map_entry_clears_after_last_waiter_departs() {
        let guard = PathGuard::new();
        {
            let _h = guard.acquire("a.ts").await;
        }
        assert_eq!(guard.tracked_paths(), 0);
    }
}

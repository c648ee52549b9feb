//! The debounced, batched file watcher.
//!
//! Live change detection is `notify`-based; the initial ignore/extension
//! filtering reuses the same `ignore`-crate conventions as a directory
//! walker.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime};

use codekb_core::config::WatcherConfig;
use codekb_core::FxHashMap;
use crossbeam_channel::{Receiver, Sender};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};

use crate::filter::ChangeFilter;
use crate::types::{BatchedChanges, ChangeKind, FileChange};

struct PendingChange {
    kind: ChangeKind,
    last_seen: Instant,
}

/// Minimum flush-loop tick, so `debounce_ms` below this still behaves
/// sanely under test.
const MIN_TICK_MS: u64 = 10;

pub struct FileWatcher {
    _inner: Option<RecommendedWatcher>,
    flush_handle: Option<JoinHandle<()>>,
    stop_flag: Arc<AtomicBool>,
    batches_rx: Receiver<BatchedChanges>,
}

impl FileWatcher {
    /// Start watching `root`. Returns the live watcher; use `batches()` to
    /// consume totally-ordered `BatchedChanges` and `stop()` to end it.
    pub fn start(root: impl AsRef<Path>, config: &WatcherConfig) -> notify::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let debounce_ms = config.effective_debounce_ms();
        let filter = Arc::new(ChangeFilter::new(
            &root,
            &config.ignored_globs,
            config.effective_include_extensions(),
        ));

        let pending: Arc<Mutex<FxHashMap<PathBuf, PendingChange>>> =
            Arc::new(Mutex::new(FxHashMap::default()));
        let (batches_tx, batches_rx): (Sender<BatchedChanges>, Receiver<BatchedChanges>) =
            crossbeam_channel::unbounded();
        let stop_flag = Arc::new(AtomicBool::new(false));
        let batch_counter = Arc::new(AtomicU64::new(0));

        let pending_for_events = pending.clone();
        let filter_for_events = filter.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else { return };
            let Some(kind) = classify(&event.kind) else {
                return;
            };
            let mut map = pending_for_events.lock().unwrap();
            for path in event.paths {
                if !filter_for_events.accepts(&path) {
                    continue;
                }
                let now = Instant::now();
                map.entry(path)
                    .and_modify(|pending| {
                        pending.kind = ChangeKind::coalesce(pending.kind, kind);
                        pending.last_seen = now;
                    })
                    .or_insert(PendingChange {
                        kind,
                        last_seen: now,
                    });
            }
        })?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        let flush_stop = stop_flag.clone();
        let flush_handle = std::thread::spawn(move || {
            let tick = Duration::from_millis(debounce_ms.max(MIN_TICK_MS) / 4 + 1);
            loop {
                std::thread::sleep(tick);
                if flush_stop.load(Ordering::Relaxed) {
                    break;
                }
                let ready: Vec<(PathBuf, ChangeKind)> = {
                    let mut map = pending.lock().unwrap();
                    let now = Instant::now();
                    let ready_keys: Vec<PathBuf> = map
                        .iter()
                        .filter(|(_, p)| now.duration_since(p.last_seen).as_millis() as u64 >= debounce_ms)
                        .map(|(path, _)| path.clone())
                        .collect();
                    ready_keys
                        .into_iter()
                        .filter_map(|path| map.remove(&path).map(|p| (path, p.kind)))
                        .collect()
                };
                if ready.is_empty() {
                    continue;
                }
                let mut files: Vec<FileChange> = ready
                    .into_iter()
                    .map(|(path, kind)| FileChange {
                        path,
                        kind,
                        detected_at: SystemTime::now(),
                    })
                    .collect();
                files.sort_by(|a, b| a.path.cmp(&b.path));
                let batch_id = batch_counter.fetch_add(1, Ordering::SeqCst);
                if batches_tx.send(BatchedChanges { files, batch_id }).is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            _inner: Some(watcher),
            flush_handle: Some(flush_handle),
            stop_flag,
            batches_rx,
        })
    }

    /// The channel of totally-ordered batches.
    pub fn batches(&self) -> &Receiver<BatchedChanges> {
        &self.batches_rx
    }

    /// Stop watching. After this returns, no further batches are emitted.
    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        self._inner = None;
        if let Some(handle) = self.flush_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn classify(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Added),
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        EventKind::Remove(_) => Some(ChangeKind::Removed),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration as StdDuration;

    #[test]
    fn debounced_write_emits_exactly_one_batch() {
        let tmp = tempfile::tempdir().unwrap();
        let config = WatcherConfig {
            include_extensions: vec!["txt".to_string()],
            debounce_ms: Some(80),
            max_concurrent_analysis: None,
            ignored_globs: vec![],
        };
        let watcher = FileWatcher::start(tmp.path(), &config).unwrap();

        let file = tmp.path().join("a.txt");
        fs::write(&file, "v1").unwrap();
        std::thread::sleep(StdDuration::from_millis(20));
        fs::write(&file, "v2").unwrap();
        std::thread::sleep(StdDuration::from_millis(20));
        fs::write(&file, "v3").unwrap();

        let batch = watcher
            .batches()
            .recv_timeout(StdDuration::from_millis(1_000))
            .expect("expected one debounced batch");
        assert_eq!(batch.files.len(), 1);
        assert_eq!(batch.files[0].path, file);

        assert!(watcher
            .batches()
            .recv_timeout(StdDuration::from_millis(150))
            .is_err());
    }

    #[test]
    fn stop_emits_no_further_batches() {
        let tmp = tempfile::tempdir().unwrap();
        let config = WatcherConfig {
            include_extensions: vec!["txt".to_string()],
            debounce_ms: Some(50),
            max_concurrent_analysis: None,
            ignored_globs: vec![],
        };
        let mut watcher = FileWatcher::start(tmp.path(), &config).unwrap();
        watcher.stop();
        fs::write(tmp.path().join("a.txt"), "v").unwrap();
        assert!(watcher
            .batches()
            .recv_timeout(StdDuration::from_millis(200))
            .is_err());
    }
}

//! The supervised worker pool.
//!
//! Plain CPU-bound parallelism elsewhere in this workspace is `rayon`-based,
//! but this component needs futures, streaming completions, per-task
//! timeouts and heartbeats, so it's built on `tokio` tasks instead (see
//! `DESIGN.md`). Each worker loop still hands CPU-bound work to
//! `spawn_blocking`, keeping to a "pure function, no shared memory-resident
//! state" worker-isolation discipline: workers never touch the
//! orchestrator's caches directly, only return values.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use codekb_core::config::WorkerConfig;
use codekb_core::errors::error_code;
use codekb_core::events::types::WorkerHealthEvent;
use codekb_core::traits::cancellation::CancellationToken;
use codekb_core::types::{AnalysisResult, AnalysisTask, TaskMetrics};
use codekb_core::{EngineError, EventDispatcher, FxHashMap, TaskId};
use tokio::runtime::Runtime;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;

use crate::queue::{PriorityQueue, QueuedTask};
use crate::runner::TaskRunner;
use crate::status::{PoolStats, PoolStatus};

struct CurrentTask {
    task_id: TaskId,
    started: Instant,
    responder: Option<oneshot::Sender<AnalysisResult>>,
}

struct Inner {
    config: WorkerConfig,
    runner: Arc<dyn TaskRunner>,
    queue: Mutex<PriorityQueue>,
    queue_notify: Notify,
    shutting_down: AtomicBool,
    active: AtomicUsize,
    stats: Mutex<PoolStats>,
    heartbeats: Mutex<FxHashMap<usize, Instant>>,
    current: Mutex<FxHashMap<usize, CurrentTask>>,
    events: EventDispatcher<WorkerHealthEvent>,
}

impl Inner {
    fn heartbeat(&self, id: usize) {
        self.heartbeats.lock().unwrap().insert(id, Instant::now());
    }

    fn set_current(&self, id: usize, task_id: TaskId, responder: oneshot::Sender<AnalysisResult>) {
        self.current.lock().unwrap().insert(
            id,
            CurrentTask {
                task_id,
                started: Instant::now(),
                responder: Some(responder),
            },
        );
    }

    fn take_responder(&self, id: usize) -> Option<(TaskId, oneshot::Sender<AnalysisResult>)> {
        let mut map = self.current.lock().unwrap();
        let entry = map.remove(&id)?;
        entry.responder.map(|r| (entry.task_id, r))
    }
}

/// A supervised pool running CPU-bound analysis tasks concurrently with the
/// orchestrator, dispatched by `(−priority, submitted_at)`.
pub struct WorkerPool {
    inner: Arc<Inner>,
    rt: Runtime,
    worker_handles: Arc<Mutex<Vec<(usize, JoinHandle<()>)>>>,
    supervisor: Option<JoinHandle<()>>,
    next_worker_id: AtomicUsize,
}

impl WorkerPool {
    pub fn new(config: WorkerConfig, runner: Arc<dyn TaskRunner>) -> std::io::Result<Self> {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.effective_max_workers().max(1))
            .enable_all()
            .build()?;

        let inner = Arc::new(Inner {
            config,
            runner,
            queue: Mutex::new(PriorityQueue::default()),
            queue_notify: Notify::new(),
            shutting_down: AtomicBool::new(false),
            active: AtomicUsize::new(0),
            stats: Mutex::new(PoolStats::default()),
            heartbeats: Mutex::new(FxHashMap::default()),
            current: Mutex::new(FxHashMap::default()),
            events: EventDispatcher::default(),
        });

        let n = inner.config.effective_max_workers();
        let mut handles = Vec::with_capacity(n);
        for id in 0..n {
            handles.push((id, spawn_worker(id, inner.clone(), &rt)));
        }
        let worker_handles = Arc::new(Mutex::new(handles));

        let supervisor = Some(spawn_supervisor(inner.clone(), &rt, worker_handles.clone()));

        Ok(Self {
            inner,
            rt,
            worker_handles,
            supervisor,
            next_worker_id: AtomicUsize::new(n),
        })
    }

    /// Subscribe to worker-health transitions (crash, idle-timeout, recovery).
    pub fn subscribe_health(&self) -> crossbeam_channel_compat::Receiver {
        self.inner.events.subscribe()
    }

    pub fn submit(
        &self,
        task: AnalysisTask,
    ) -> Result<oneshot::Receiver<AnalysisResult>, EngineError> {
        if self.inner.shutting_down.load(Ordering::SeqCst) {
            return Err(EngineError::ShuttingDown);
        }
        let mut queue = self.inner.queue.lock().unwrap();
        if queue.len() >= self.inner.config.effective_max_queue_size() {
            return Err(EngineError::QueueFull(
                self.inner.config.effective_max_queue_size(),
            ));
        }
        let (tx, rx) = oneshot::channel();
        queue.push(QueuedTask {
            task,
            responder: tx,
            cancel: CancellationToken::new(),
        });
        drop(queue);
        self.inner.queue_notify.notify_waiters();
        Ok(rx)
    }

    /// Submit every task; returns once all complete (success or per-task
    /// error). Partial failures never fail the batch.
    pub async fn submit_batch(
        &self,
        tasks: Vec<AnalysisTask>,
    ) -> Vec<Result<AnalysisResult, EngineError>> {
        let mut receivers = Vec::with_capacity(tasks.len());
        for task in tasks {
            match self.submit(task) {
                Ok(rx) => receivers.push(Ok(rx)),
                Err(e) => receivers.push(Err(e)),
            }
        }
        let mut out = Vec::with_capacity(receivers.len());
        for r in receivers {
            match r {
                Ok(rx) => out.push(
                    rx.await
                        .map_err(|_| EngineError::WorkerCrashed { task_id: "?".into() }),
                ),
                Err(e) => out.push(Err(e)),
            }
        }
        out
    }

    /// Stream completions in chunks of at most `chunk_size`, never more
    /// than `concurrency` in flight, invoking `on_progress(done, total)` per
    /// completion. Returns a channel of chunks in completion order.
    pub fn stream(
        self: &Arc<Self>,
        tasks: Vec<AnalysisTask>,
        chunk_size: usize,
        concurrency: usize,
        on_progress: Option<Arc<dyn Fn(usize, usize) + Send + Sync>>,
    ) -> tokio::sync::mpsc::Receiver<Vec<AnalysisResult>> {
        let (chunk_tx, chunk_rx) = tokio::sync::mpsc::channel(4);
        let pool = self.clone();
        let total = tasks.len();
        self.rt.spawn(async move {
            let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency.max(1)));
            let (done_tx, mut done_rx) = tokio::sync::mpsc::unbounded_channel();
            for task in tasks {
                let permit = semaphore.clone().acquire_owned().await.unwrap();
                let rx = match pool.submit(task.clone()) {
                    Ok(rx) => rx,
                    Err(e) => {
                        let metrics = TaskMetrics::default();
                        let _ = done_tx.send(AnalysisResult::failure(
                            task.id,
                            (&e).into(),
                            metrics,
                        ));
                        drop(permit);
                        continue;
                    }
                };
                let done_tx = done_tx.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    let result = rx.await.unwrap_or_else(|_| {
                        AnalysisResult::failure(
                            task.id,
                            codekb_core::errors::TaskErrorInfo::new(
                                error_code::WORKER_CRASHED,
                                "worker dropped the response channel",
                            ),
                            TaskMetrics::default(),
                        )
                    });
                    let _ = done_tx.send(result);
                });
            }
            drop(done_tx);

            let mut done = 0usize;
            let mut buffer = Vec::with_capacity(chunk_size.max(1));
            while let Some(result) = done_rx.recv().await {
                done += 1;
                if let Some(cb) = &on_progress {
                    cb(done, total);
                }
                buffer.push(result);
                if buffer.len() >= chunk_size.max(1) {
                    if chunk_tx.send(std::mem::take(&mut buffer)).await.is_err() {
                        return;
                    }
                }
            }
            if !buffer.is_empty() {
                let _ = chunk_tx.send(buffer).await;
            }
        });
        chunk_rx
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            workers: self.worker_handles.lock().unwrap().len(),
            queue_len: self.inner.queue.lock().unwrap().len(),
            active: self.inner.active.load(Ordering::SeqCst),
            stats: *self.inner.stats.lock().unwrap(),
        }
    }

    /// Stop accepting new work, wait for in-flight tasks up to the
    /// configured grace period, then force-terminate stragglers.
    pub async fn shutdown(&self) {
        self.inner.shutting_down.store(true, Ordering::SeqCst);
        self.inner.queue_notify.notify_waiters();

        let grace = Duration::from_millis(self.inner.config.effective_shutdown_grace_ms());
        let deadline = Instant::now() + grace;
        while Instant::now() < deadline {
            if self.inner.active.load(Ordering::SeqCst) == 0
                && self.inner.queue.lock().unwrap().is_empty()
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let mut handles = self.worker_handles.lock().unwrap();
        for (_, handle) in handles.drain(..) {
            handle.abort();
        }
        drop(handles);

        // Any task still recorded as in-flight after abort failed with
        // ShuttingDown rather than being silently dropped.
        let stuck: Vec<usize> = self.inner.current.lock().unwrap().keys().copied().collect();
        for id in stuck {
            if let Some((task_id, responder)) = self.inner.take_responder(id) {
                let _ = responder.send(AnalysisResult::failure(
                    task_id,
                    codekb_core::errors::TaskErrorInfo::new(
                        error_code::SHUTTING_DOWN,
                        "pool shut down with task in flight",
                    ),
                    TaskMetrics::default(),
                ));
            }
        }
        // Drain the queue: nothing further will ever be dispatched.
        let mut queue = self.inner.queue.lock().unwrap();
        while let Some(queued) = queue.pop() {
            let _ = queued.responder.send(AnalysisResult::failure(
                queued.task.id,
                codekb_core::errors::TaskErrorInfo::new(error_code::SHUTTING_DOWN, "pool shut down"),
                TaskMetrics::default(),
            ));
        }
    }

    /// Test-only fault injection: simulate an abnormal worker exit mid-task.
    /// A real "kill -9" of an OS thread is unobservable from outside the
    /// process; this aborts the worker's tokio task the same way a crash
    /// would end it, and exercises the same supervisor recovery path.
    pub fn debug_crash_worker(&self, worker_id: usize) {
        let mut handles = self.worker_handles.lock().unwrap();
        if let Some(pos) = handles.iter().position(|(id, _)| *id == worker_id) {
            let (_, handle) = handles.remove(pos);
            handle.abort();
        }
        drop(handles);
        recover_worker(worker_id, &self.inner, &self.rt, &self.worker_handles);
    }

    /// Test-only fault injection: back-date a worker's last heartbeat
    /// without touching its task, simulating a wedged worker that's still
    /// scheduled but has stopped heartbeating — distinct from
    /// `debug_crash_worker`'s hard abort. Exercises the supervisor's
    /// heartbeat-staleness detection rather than the task-crash path.
    pub fn debug_stall_heartbeat(&self, worker_id: usize, stale_by: Duration) {
        if let Some(t) = self.inner.heartbeats.lock().unwrap().get_mut(&worker_id) {
            *t = Instant::now() - stale_by;
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if let Some(s) = self.supervisor.take() {
            s.abort();
        }
    }
}

fn spawn_worker(id: usize, inner: Arc<Inner>, rt: &Runtime) -> JoinHandle<()> {
    rt.spawn(worker_loop(id, inner))
}

async fn worker_loop(id: usize, inner: Arc<Inner>) {
    inner.heartbeat(id);
    loop {
            let queued = inner.queue.lock().unwrap().pop();
            let Some(queued) = queued else {
                if inner.shutting_down.load(Ordering::SeqCst) {
                    break;
                }
                let heartbeat_tick =
                    Duration::from_millis(inner.config.effective_heartbeat_interval_ms());
                tokio::select! {
                    _ = inner.queue_notify.notified() => {},
                    _ = tokio::time::sleep(heartbeat_tick) => {},
                }
                inner.heartbeat(id);
                continue;
            };

            inner.active.fetch_add(1, Ordering::SeqCst);
            let QueuedTask {
                task,
                responder,
                cancel,
            } = queued;
            inner.set_current(id, task.id, responder);

            let start = Instant::now();
            let runner = inner.runner.clone();
            let run_task = task.clone();
            let run_cancel = cancel.clone();
            let join = tokio::task::spawn_blocking(move || runner.run(&run_task, &run_cancel));
            let timeout_dur = Duration::from_millis(inner.config.effective_task_timeout_ms());
            let heartbeat_tick =
                Duration::from_millis(inner.config.effective_heartbeat_interval_ms());

            tokio::pin!(join);
            let outcome = loop {
                tokio::select! {
                    res = &mut join => break Some(res),
                    _ = tokio::time::sleep(timeout_dur) => break None,
                    _ = tokio::time::sleep(heartbeat_tick) => { inner.heartbeat(id); }
                }
            };

            inner.active.fetch_sub(1, Ordering::SeqCst);
            let duration_ms = start.elapsed().as_millis() as u64;
            let metrics = TaskMetrics {
                duration_ms,
                peak_bytes: 0,
            };

            let result = match outcome {
                Some(Ok(Ok(value))) => {
                    inner.stats.lock().unwrap().completed += 1;
                    AnalysisResult::success(task.id, value, metrics)
                }
                Some(Ok(Err(e))) => {
                    inner.stats.lock().unwrap().failed += 1;
                    AnalysisResult::failure(task.id, (&e).into(), metrics)
                }
                Some(Err(_join_err)) => {
                    inner.stats.lock().unwrap().crashed += 1;
                    AnalysisResult::failure(
                        task.id,
                        codekb_core::errors::TaskErrorInfo::new(
                            error_code::WORKER_CRASHED,
                            format!("worker {id} crashed"),
                        ),
                        metrics,
                    )
                }
                None => {
                    inner.stats.lock().unwrap().timed_out += 1;
                    AnalysisResult::failure(
                        task.id,
                        codekb_core::errors::TaskErrorInfo::new(
                            error_code::TIMEOUT,
                            format!("task exceeded {}ms", timeout_dur.as_millis()),
                        ),
                        metrics,
                    )
                }
            };

            if let Some((_, responder)) = inner.take_responder(id) {
                let _ = responder.send(result);
            }
            inner.heartbeat(id);
        }
}

fn spawn_supervisor(
    inner: Arc<Inner>,
    rt: &Runtime,
    worker_handles: Arc<Mutex<Vec<(usize, JoinHandle<()>)>>>,
) -> JoinHandle<()> {
    rt.spawn(async move {
        loop {
            let tick = Duration::from_millis(inner.config.effective_heartbeat_interval_ms());
            tokio::time::sleep(tick).await;
            if inner.shutting_down.load(Ordering::SeqCst) {
                break;
            }
            let idle_timeout = Duration::from_millis(inner.config.effective_worker_idle_timeout_ms());
            let stuck: Vec<usize> = {
                let current = inner.current.lock().unwrap();
                current
                    .iter()
                    .filter(|(_, t)| t.started.elapsed() > idle_timeout)
                    .map(|(id, _)| *id)
                    .collect()
            };
            for id in stuck {
                inner.events.publish(WorkerHealthEvent {
                    worker_id: id,
                    healthy: false,
                    reason: Some("idle timeout exceeded while holding a task".into()),
                });
                if let Some((task_id, responder)) = inner.take_responder(id) {
                    inner.stats.lock().unwrap().crashed += 1;
                    let _ = responder.send(AnalysisResult::failure(
                        task_id,
                        codekb_core::errors::TaskErrorInfo::new(
                            error_code::WORKER_CRASHED,
                            "worker stuck beyond idle timeout, recycled",
                        ),
                        TaskMetrics::default(),
                    ));
                }
            }

            // Missing two consecutive heartbeats marks a worker unhealthy;
            // its task loop may still be scheduled but is no longer making
            // progress, so it's terminated and replaced outright.
            let miss_threshold = tick * 2;
            let stale: Vec<usize> = {
                let heartbeats = inner.heartbeats.lock().unwrap();
                heartbeats
                    .iter()
                    .filter(|(_, last)| last.elapsed() > miss_threshold)
                    .map(|(id, _)| *id)
                    .collect()
            };
            for id in stale {
                inner.events.publish(WorkerHealthEvent {
                    worker_id: id,
                    healthy: false,
                    reason: Some("missed two consecutive heartbeats, replacing".into()),
                });
                if let Some((task_id, responder)) = inner.take_responder(id) {
                    inner.stats.lock().unwrap().crashed += 1;
                    inner.active.fetch_sub(1, Ordering::SeqCst);
                    let _ = responder.send(AnalysisResult::failure(
                        task_id,
                        codekb_core::errors::TaskErrorInfo::new(
                            error_code::WORKER_CRASHED,
                            format!("worker {id} missed its heartbeat, recycled"),
                        ),
                        TaskMetrics::default(),
                    ));
                }
                {
                    let mut handles = worker_handles.lock().unwrap();
                    if let Some(pos) = handles.iter().position(|(hid, _)| *hid == id) {
                        let (_, handle) = handles.remove(pos);
                        handle.abort();
                    }
                }
                inner.heartbeat(id);
                let handle = tokio::spawn(worker_loop(id, inner.clone()));
                worker_handles.lock().unwrap().push((id, handle));
            }
        }
    })
}

fn recover_worker(
    crashed_id: usize,
    inner: &Arc<Inner>,
    rt: &Runtime,
    worker_handles: &Mutex<Vec<(usize, JoinHandle<()>)>>,
) {
    if let Some((task_id, responder)) = inner.take_responder(crashed_id) {
        inner.stats.lock().unwrap().crashed += 1;
        inner.active.fetch_sub(1, Ordering::SeqCst);
        let _ = responder.send(AnalysisResult::failure(
            task_id,
            codekb_core::errors::TaskErrorInfo::new(
                error_code::WORKER_CRASHED,
                format!("worker {crashed_id} crashed mid-task"),
            ),
            TaskMetrics::default(),
        ));
    }
    inner.events.publish(WorkerHealthEvent {
        worker_id: crashed_id,
        healthy: false,
        reason: Some("crashed, respawning".into()),
    });
    let handle = spawn_worker(crashed_id, inner.clone(), rt);
    worker_handles.lock().unwrap().push((crashed_id, handle));
}

/// Thin module so callers don't need to depend on `crossbeam-channel`
/// directly just to hold a `Receiver<WorkerHealthEvent>` type.
pub mod crossbeam_channel_compat {
    pub type Receiver = crossbeam_channel::Receiver<codekb_core::events::types::WorkerHealthEvent>;
}

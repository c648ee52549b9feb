//! # codekb-workers
//!
//! The supervised, priority-dispatching worker pool that executes
//! analysis tasks concurrently with the orchestrator.

pub mod pool;
pub mod queue;
pub mod runner;
pub mod status;

pub use pool::WorkerPool;
pub use runner::{FnRunner, TaskRunner};
pub use status::{PoolStats, PoolStatus};

#[cfg(test)]
mod tests {
    use super::*;
    use codekb_core::config::WorkerConfig;
    use codekb_core::types::TaskKind;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn instant_runner() -> Arc<dyn TaskRunner> {
        Arc::new(FnRunner(|task, _cancel| Ok(json!({ "id": task.id.0 }))))
    }

    #[tokio::test]
    async fn submit_then_await_returns_success() {
        let pool = WorkerPool::new(WorkerConfig::default(), instant_runner()).unwrap();
        let rx = pool
            .submit(codekb_core::types::AnalysisTask::new(
                TaskKind::File,
                json!({}),
                0,
            ))
            .unwrap();
        let result = rx.await.unwrap();
        assert!(result.ok);
    }

    #[tokio::test]
    async fn queue_full_rejects_third_submission() {
        // Scenario 3: maxWorkers=1, maxQueueSize=2, submit 3 synchronously.
        let config = WorkerConfig {
            max_workers: Some(1),
            max_queue_size: Some(2),
            ..Default::default()
        };
        let blocking_runner: Arc<dyn TaskRunner> = Arc::new(FnRunner(|_task, _cancel| {
            std::thread::sleep(Duration::from_millis(200));
            Ok(json!({}))
        }));
        let pool = WorkerPool::new(config, blocking_runner).unwrap();

        let t = |p: i32| codekb_core::types::AnalysisTask::new(TaskKind::File, json!({}), p);
        let first = pool.submit(t(0));
        let second = pool.submit(t(0));
        let third = pool.submit(t(0));

        assert!(first.is_ok());
        assert!(second.is_ok());
        match third {
            Err(codekb_core::EngineError::QueueFull(max)) => assert_eq!(max, 2),
            other => panic!("expected QueueFull, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn worker_crash_completes_task_with_worker_crashed_and_pool_recovers() {
        let config = WorkerConfig {
            max_workers: Some(1),
            max_queue_size: Some(4),
            heartbeat_interval_ms: Some(20),
            ..Default::default()
        };
        let slow_runner: Arc<dyn TaskRunner> = Arc::new(FnRunner(|_task, _cancel| {
            std::thread::sleep(Duration::from_millis(500));
            Ok(json!({}))
        }));
        let pool = WorkerPool::new(config, slow_runner).unwrap();

        let rx = pool
            .submit(codekb_core::types::AnalysisTask::new(
                TaskKind::File,
                json!({}),
                0,
            ))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        pool.debug_crash_worker(0);

        let result = rx.await.unwrap();
        assert!(!result.ok);
        assert_eq!(result.error.unwrap().code, "WORKER_CRASHED");

        // The pool has replaced the worker; subsequent submissions succeed.
        let rx2 = pool
            .submit(codekb_core::types::AnalysisTask::new(
                TaskKind::File,
                json!({}),
                0,
            ))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(rx2.await.is_ok());
    }

    #[tokio::test]
    async fn stale_heartbeat_is_detected_and_worker_is_replaced() {
        let config = WorkerConfig {
            max_workers: Some(1),
            max_queue_size: Some(4),
            heartbeat_interval_ms: Some(20),
            ..Default::default()
        };
        let pool = WorkerPool::new(config, instant_runner()).unwrap();
        let health = pool.subscribe_health();

        // Simulate a worker whose loop is still scheduled but has stopped
        // heartbeating, without crashing its task (unlike `debug_crash_worker`).
        pool.debug_stall_heartbeat(0, Duration::from_millis(100));

        let health_task = tokio::task::spawn_blocking(move || loop {
            match health.recv_timeout(Duration::from_millis(500)) {
                Ok(event) if !event.healthy => return Some(event),
                Ok(_) => continue,
                Err(_) => return None,
            }
        });
        let event = tokio::time::timeout(Duration::from_millis(600), health_task)
            .await
            .expect("supervisor should report the stale worker within time")
            .unwrap()
            .expect("expected an unhealthy event");
        assert_eq!(event.worker_id, 0);
        assert!(event.reason.unwrap().contains("heartbeat"));

        // The replaced worker still has id 0 and accepts new work.
        let rx = pool
            .submit(codekb_core::types::AnalysisTask::new(
                TaskKind::File,
                json!({}),
                0,
            ))
            .unwrap();
        let result = tokio::time::timeout(Duration::from_millis(500), rx)
            .await
            .expect("task should complete on the replaced worker")
            .unwrap();
        assert!(result.ok);
    }

    #[tokio::test]
    async fn shutdown_fails_further_submissions_with_shutting_down() {
        let pool = WorkerPool::new(WorkerConfig::default(), instant_runner()).unwrap();
        pool.shutdown().await;
        let err = pool
            .submit(codekb_core::types::AnalysisTask::new(
                TaskKind::File,
                json!({}),
                0,
            ))
            .unwrap_err();
        assert!(matches!(err, codekb_core::EngineError::ShuttingDown));
    }

    #[tokio::test]
    async fn streamed_scan_emits_expected_chunk_sizes_and_monotonic_progress() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let pool = Arc::new(WorkerPool::new(WorkerConfig::default(), instant_runner()).unwrap());
        let tasks: Vec<_> = (0..25)
            .map(|i| codekb_core::types::AnalysisTask::new(TaskKind::File, json!({"i": i}), 0))
            .collect();

        let progress_calls = Arc::new(AtomicUsize::new(0));
        let last_done = Arc::new(AtomicUsize::new(0));
        let progress_calls_cb = progress_calls.clone();
        let last_done_cb = last_done.clone();
        let on_progress = Arc::new(move |done: usize, _total: usize| {
            progress_calls_cb.fetch_add(1, Ordering::SeqCst);
            last_done_cb.store(done, Ordering::SeqCst);
        });

        let mut rx = pool.stream(tasks, 10, 8, Some(on_progress));
        let mut sizes = Vec::new();
        while let Some(chunk) = rx.recv().await {
            sizes.push(chunk.len());
        }

        assert_eq!(sizes, vec![10, 10, 5]);
        assert_eq!(progress_calls.load(Ordering::SeqCst), 25);
        assert_eq!(last_done.load(Ordering::SeqCst), 25);
    }
}

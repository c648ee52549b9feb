//! `IncrementalAnalyzer` — the top-level orchestrator wiring the cache,
//! watcher, worker pool, resolver, and knowledge graph into the
//! initial-scan / live-update pipeline.

use std::path::Path;
use std::sync::Arc;

use codekb_cache::{AnalysisCache, CacheKeyInput};
use codekb_core::config::EngineConfig;
use codekb_core::EngineEventHandler;
use codekb_graph::KnowledgeGraph;
use codekb_resolver::resolve;
use codekb_watcher::{BatchedChanges, FileWatcher};
use codekb_workers::WorkerPool;

use crate::dto::FileAnalysisDto;
use crate::guard::PathGuard;
use crate::progress::{AnalysisPhase, AnalysisProgress, ProgressTracker};
use crate::scan::{self, ScanOutcome};
use crate::state::AnalyzerState;

/// Owns every component the analyzer orchestrates. `workers` must already
/// be constructed with a `ParseTaskRunner` wrapping the injected `ParseFn` —
/// the parser stays an external, pure collaborator (see
/// `runner::ParseTaskRunner`), never owned directly by this struct.
pub struct IncrementalAnalyzer {
    project_root: String,
    config: EngineConfig,
    cache: Arc<AnalysisCache>,
    graph: KnowledgeGraph,
    workers: Arc<WorkerPool>,
    handler: Arc<dyn EngineEventHandler>,
    progress: ProgressTracker,
    guard: PathGuard,
    state: AnalyzerState,
}

impl IncrementalAnalyzer {
    pub fn new(
        project_root: impl Into<String>,
        config: EngineConfig,
        cache: Arc<AnalysisCache>,
        graph: KnowledgeGraph,
        workers: Arc<WorkerPool>,
        handler: Arc<dyn EngineEventHandler>,
    ) -> Self {
        let alpha = config.analyzer.effective_ema_alpha();
        Self {
            project_root: project_root.into(),
            config,
            cache,
            graph,
            workers,
            handler,
            progress: ProgressTracker::new(alpha),
            guard: PathGuard::new(),
            state: AnalyzerState::new(),
        }
    }

    pub fn progress(&self) -> AnalysisProgress {
        self.progress.snapshot()
    }

    pub fn graph(&self) -> &KnowledgeGraph {
        &self.graph
    }

    fn cache_key(&self, path: &str, content_hash: u64) -> String {
        CacheKeyInput::file(path, self.config.schema_version)
            .with_option("content_hash", format!("{content_hash:x}"))
            .render()
    }

    /// Scan the project root once, populating the graph from scratch (or
    /// incrementally, for paths whose content hash is unchanged from a
    /// prior run's cache).
    pub async fn run_initial_scan(&self) -> ScanOutcome {
        let root = self.project_root.clone();

        let needs_analysis = |path: &str, hash: u64| self.state.needs_analysis(path, hash);
        let try_cached = |path: &str, hash: u64| -> Option<FileAnalysisDto> {
            let key = self.cache_key(path, hash);
            let entry = self.cache.get(&key)?;
            serde_json::from_slice(&entry.value_bytes).ok()
        };
        let apply = |path: &str, hash: u64, dto: FileAnalysisDto, from_cache: bool| {
            if !from_cache {
                if let Ok(bytes) = serde_json::to_vec(&dto) {
                    let key = self.cache_key(path, hash);
                    let _ = self.cache.set(key, bytes, Some(path.to_string()), None);
                }
            }
            self.state.replace_file(&self.graph, hash, dto.into());
        };
        let on_error = |path: &str, message: String| {
            tracing::warn!(file = path, %message, "analysis failed");
        };

        let outcome = scan::run_initial_scan(
            Path::new(&root),
            &self.config.watcher,
            &self.config.analyzer,
            &self.workers,
            &self.handler,
            &self.progress,
            needs_analysis,
            try_cached,
            apply,
            on_error,
        )
        .await;

        self.run_resolution();
        outcome
    }

    /// Run the resolver over every currently-known file and persist the
    /// resulting edges, replacing the previous resolution's edges wholesale.
    pub fn run_resolution(&self) {
        self.progress.set_phase(AnalysisPhase::Resolving, 0);
        let inputs = self.state.snapshot_file_analyses();
        let output = resolve(&inputs, &self.config.resolver);
        self.state.persist_resolution(&self.graph, output);
    }

    /// Drive the live-update pipeline from an already-started `FileWatcher`,
    /// bridging its synchronous `crossbeam_channel` into async land via a
    /// dedicated forwarding thread.
    pub async fn run_live(&self, watcher: FileWatcher) {
        self.progress.set_phase(AnalysisPhase::Watching, 0);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<BatchedChanges>();
        let receiver = watcher.batches().clone();
        std::thread::spawn(move || {
            while let Ok(batch) = receiver.recv() {
                if tx.send(batch).is_err() {
                    break;
                }
            }
        });

        while let Some(batch) = rx.recv().await {
            self.apply_batch(batch).await;
        }
    }

    async fn apply_batch(&self, batch: BatchedChanges) {
        let exports_of = |path: &str| self.state.exports_of(path);
        let dependents_of = |path: &str| self.state.dependents_of(path);
        let remove_file = |path: &str| self.state.remove_file(&self.graph, path);
        let replace_file = |path: &str, hash: u64, dto: FileAnalysisDto| {
            if let Ok(bytes) = serde_json::to_vec(&dto) {
                let key = self.cache_key(path, hash);
                let _ = self.cache.set(key, bytes, Some(path.to_string()), None);
            }
            self.state.replace_file(&self.graph, hash, dto.into());
        };
        let run_resolution = |_resolver_config: &codekb_core::config::ResolverConfig| {
            self.run_resolution();
        };

        crate::live::process_batch(
            batch,
            &self.workers,
            &self.handler,
            exports_of,
            dependents_of,
            remove_file,
            replace_file,
            run_resolution,
            &self.config.resolver,
            &self.config.analyzer,
        )
        .await;
    }

    /// Reanalyze a single path on demand (e.g. an explicit client request),
    /// serialized against any concurrent watcher-driven reanalysis of the
    /// same path via `PathGuard`.
    pub async fn reanalyze_file(&self, path: &str) -> bool {
        let _permit = self.guard.acquire(path).await;
        match crate::live::reanalyze_file(path, &self.workers, crate::live::LIVE_TASK_PRIORITY)
            .await
        {
            Some((hash, dto)) => {
                let key = self.cache_key(path, hash);
                if let Ok(bytes) = serde_json::to_vec(&dto) {
                    let _ = self.cache.set(key, bytes, Some(path.to_string()), None);
                }
                self.state.replace_file(&self.graph, hash, dto.into());
                self.run_resolution();
                true
            }
            None => false,
        }
    }

    /// Stop accepting new work and let the worker pool drain gracefully.
    pub async fn shutdown(&self) {
        self.workers.shutdown().await;
    }
}

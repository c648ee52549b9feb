//! Live-update pipeline: consume `FileWatcher` batches,
//! reanalyze `Added`/`Modified` files, drop `Removed` ones, cascade
//! transitively into dependents whose public interface changed, rerun
//! resolution once per batch, then emit `BatchAppliedEvent`.

use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::Arc;

use codekb_core::config::{AnalyzerConfig, ResolverConfig};
use codekb_core::events::types::BatchAppliedEvent;
use codekb_core::types::{ExportInfo, TaskKind};
use codekb_core::EngineEventHandler;
use codekb_watcher::{BatchedChanges, ChangeKind};
use codekb_workers::WorkerPool;

use crate::dto::FileAnalysisDto;
use crate::runner::ParseTaskPayload;
use crate::scan::language_for_extension;

/// Live reanalysis tasks jump ahead of the bulk-scan priority (`0`) so edits
/// are reflected promptly even while an initial scan is still draining.
pub const LIVE_TASK_PRIORITY: i32 = 10;

/// Sorted `(name, is_default, is_namespace)` comparison, ignoring line
/// numbers, so a reformat that doesn't change the public interface never
/// triggers a dependent cascade.
pub fn exports_differ(old: &[ExportInfo], new: &[ExportInfo]) -> bool {
    fn key(e: &ExportInfo) -> (&str, bool, bool) {
        (e.name.as_str(), e.is_default, e.is_namespace)
    }
    let mut a: Vec<_> = old.iter().map(key).collect();
    let mut b: Vec<_> = new.iter().map(key).collect();
    a.sort();
    b.sort();
    a != b
}

/// Reanalyze a single file: read it from disk, submit a parse task, and
/// return its content hash plus the decoded result. `None` means the file
/// could not be read (e.g. deleted between the watcher event and this call)
/// or the task failed.
pub async fn reanalyze_file(
    path: &str,
    workers: &Arc<WorkerPool>,
    priority: i32,
) -> Option<(u64, FileAnalysisDto)> {
    let content = std::fs::read(path).ok()?;
    let hash = codekb_core::types::hash_bytes(&content);
    let language = language_for_extension(Path::new(path));
    let payload = ParseTaskPayload::new(path, language, &content);
    let task = codekb_core::types::AnalysisTask::new(
        TaskKind::File,
        serde_json::to_value(&payload).ok()?,
        priority,
    );
    let rx = workers.submit(task).ok()?;
    let result = rx.await.ok()?;
    if !result.ok {
        return None;
    }
    let dto = serde_json::from_value(result.value?).ok()?;
    Some((hash, dto))
}

pub struct BatchOutcome {
    pub files_touched: usize,
    pub dependents_scheduled: usize,
}

/// Apply one `BatchedChanges` batch. `exports_of`/`dependents_of` read
/// `AnalyzerState`; `remove_file`/`replace_file` mutate it (and the graph)
/// atomically per call; `run_resolution` performs the single
/// end-of-batch global resolve + persist.
pub async fn process_batch(
    batch: BatchedChanges,
    workers: &Arc<WorkerPool>,
    handler: &Arc<dyn EngineEventHandler>,
    mut exports_of: impl FnMut(&str) -> Vec<ExportInfo>,
    mut dependents_of: impl FnMut(&str) -> Vec<String>,
    mut remove_file: impl FnMut(&str),
    mut replace_file: impl FnMut(&str, u64, FileAnalysisDto),
    mut run_resolution: impl FnMut(&ResolverConfig),
    resolver_config: &ResolverConfig,
    _analyzer_config: &AnalyzerConfig,
) -> BatchOutcome {
    let mut touched = HashSet::new();

    let mut direct: Vec<String> = batch
        .files
        .iter()
        .filter(|c| c.kind != ChangeKind::Removed)
        .map(|c| c.path.to_string_lossy().to_string())
        .collect();
    direct.sort();
    direct.dedup();
    let direct_set: HashSet<String> = direct.iter().cloned().collect();

    // Every file ever enqueued for cascade, direct or not, so a dependency
    // cycle or diamond is visited at most once per batch.
    let mut visited: HashSet<String> = direct_set.clone();
    let mut worklist: VecDeque<String> = VecDeque::new();

    for change in &batch.files {
        let path = change.path.to_string_lossy().to_string();
        if change.kind == ChangeKind::Removed {
            remove_file(&path);
            touched.insert(path.clone());
            for dependent in dependents_of(&path) {
                if visited.insert(dependent.clone()) {
                    worklist.push_back(dependent);
                }
            }
        }
    }

    for path in &direct {
        let before = exports_of(path);
        if let Some((hash, dto)) = reanalyze_file(path, workers, LIVE_TASK_PRIORITY).await {
            touched.insert(path.clone());
            if exports_differ(&before, &dto.exports) {
                for dependent in dependents_of(path) {
                    if visited.insert(dependent.clone()) {
                        worklist.push_back(dependent);
                    }
                }
            }
            replace_file(path, hash, dto);
        }
    }

    let mut dependents_scheduled = 0usize;
    while let Some(path) = worklist.pop_front() {
        dependents_scheduled += 1;
        let before = exports_of(&path);
        if let Some((hash, dto)) = reanalyze_file(&path, workers, LIVE_TASK_PRIORITY).await {
            touched.insert(path.clone());
            if exports_differ(&before, &dto.exports) {
                for dependent in dependents_of(&path) {
                    if visited.insert(dependent.clone()) {
                        worklist.push_back(dependent);
                    }
                }
            }
            replace_file(&path, hash, dto);
        }
    }

    run_resolution(resolver_config);

    handler.on_batch_applied(&BatchAppliedEvent {
        batch_id: batch.batch_id,
        files_touched: touched.len(),
        dependents_scheduled,
    });

    BatchOutcome {
        files_touched: touched.len(),
        dependents_scheduled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    use codekb_core::config::WorkerConfig;
    use codekb_core::traits::parser::ParseOutcome;

    use crate::runner::ParseTaskRunner;

    struct NoopHandler;
    impl EngineEventHandler for NoopHandler {}

    fn export(name: &str) -> ExportInfo {
        ExportInfo {
            file_path: "a.ts".into(),
            name: name.into(),
            is_default: false,
            is_namespace: false,
            line: 1,
        }
    }

    #[test]
    fn identical_export_sets_do_not_differ_despite_line_changes() {
        let mut moved = export("foo");
        moved.line = 99;
        assert!(!exports_differ(&[export("foo")], &[moved]));
    }

    #[test]
    fn renamed_export_is_detected_as_a_difference() {
        assert!(exports_differ(&[export("foo")], &[export("bar")]));
    }

    #[test]
    fn order_independent_comparison() {
        assert!(!exports_differ(
            &[export("foo"), export("bar")],
            &[export("bar"), export("foo")]
        ));
    }

    /// A file's content is `export_version:<name>`; the parse fn turns that
    /// suffix into its single export name, so a test can force a reanalysis
    /// to report a changed export set just by writing new content.
    fn versioned_export_parse(bytes: &[u8], path: &str, _lang: &str) -> ParseOutcome {
        let text = String::from_utf8_lossy(bytes);
        let name = text.strip_prefix("export_version:").unwrap_or("unknown").trim();
        ParseOutcome {
            entities: vec![],
            relationships: vec![],
            imports: vec![],
            exports: vec![ExportInfo {
                file_path: path.to_string(),
                name: name.to_string(),
                is_default: false,
                is_namespace: false,
                line: 1,
            }],
            syntax_errors: vec![],
        }
    }

    /// a.ts -> b.ts -> c.ts. Editing a.ts changes its exports, which must
    /// cascade into b.ts; b.ts's own reanalysis also changes its exports,
    /// which must cascade a second hop into c.ts.
    #[tokio::test]
    async fn cascade_is_transitive_across_two_hops() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a.ts");
        let b = tmp.path().join("b.ts");
        let c = tmp.path().join("c.ts");
        std::fs::write(&a, "export_version:v1").unwrap();
        std::fs::write(&b, "export_version:v1").unwrap();
        std::fs::write(&c, "export_version:v0").unwrap();

        let runner = Arc::new(ParseTaskRunner::new(versioned_export_parse));
        let workers = Arc::new(WorkerPool::new(WorkerConfig::default(), runner).unwrap());
        let handler: Arc<dyn EngineEventHandler> = Arc::new(NoopHandler);

        let a_str = a.to_string_lossy().to_string();
        let b_str = b.to_string_lossy().to_string();
        let c_str = c.to_string_lossy().to_string();

        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
        dependents.insert(a_str.clone(), vec![b_str.clone()]);
        dependents.insert(b_str.clone(), vec![c_str.clone()]);

        // Recorded "before" export sets, each one version behind the content
        // on disk so every reanalysis in the chain reports a real change.
        let mut before_exports: HashMap<String, Vec<ExportInfo>> = HashMap::new();
        before_exports.insert(a_str.clone(), vec![export("v0")]);
        before_exports.insert(b_str.clone(), vec![export("v0")]);
        before_exports.insert(c_str.clone(), vec![export("v0")]);

        let replaced = RefCell::new(HashMap::<String, Vec<ExportInfo>>::new());

        let batch = BatchedChanges {
            batch_id: 1,
            files: vec![codekb_watcher::FileChange {
                path: a.clone(),
                kind: ChangeKind::Modified,
                detected_at: std::time::SystemTime::now(),
            }],
        };

        let exports_of = |path: &str| before_exports.get(path).cloned().unwrap_or_default();
        let dependents_of = |path: &str| dependents.get(path).cloned().unwrap_or_default();
        let remove_file = |_path: &str| {};
        let replace_file = |path: &str, _hash: u64, dto: FileAnalysisDto| {
            replaced.borrow_mut().insert(path.to_string(), dto.exports);
        };
        let run_resolution = |_cfg: &ResolverConfig| {};

        let outcome = process_batch(
            batch,
            &workers,
            &handler,
            exports_of,
            dependents_of,
            remove_file,
            replace_file,
            run_resolution,
            &ResolverConfig::default(),
            &AnalyzerConfig::default(),
        )
        .await;

        assert_eq!(outcome.dependents_scheduled, 2, "both b.ts and c.ts must be cascaded into");
        assert_eq!(outcome.files_touched, 3);
        assert!(replaced.borrow().contains_key(&c_str), "second-hop dependent must be reanalyzed");
    }
}

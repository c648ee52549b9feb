//! Initial full-project scan: enumerate, hash, consult the
//! cache, dispatch misses to the worker pool, fold results into state, then
//! run one global resolution pass.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use codekb_core::config::{AnalyzerConfig, WatcherConfig};
use codekb_core::events::types::{ScanCompleteEvent, ScanProgressEvent, ScanStartedEvent};
use codekb_core::types::TaskKind;
use codekb_core::EngineEventHandler;
use codekb_workers::WorkerPool;
use rayon::prelude::*;

use crate::dto::FileAnalysisDto;
use crate::progress::{AnalysisPhase, ProgressTracker};
use crate::runner::ParseTaskPayload;

/// The default ignore patterns applied to every enumeration.
pub const DEFAULT_IGNORES: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    "target",
    ".next",
    ".nuxt",
    "__pycache__",
    ".pytest_cache",
    "coverage",
    ".nyc_output",
    "vendor",
    ".venv",
    "venv",
    ".tox",
    ".mypy_cache",
    "bin",
    "obj",
];

pub fn language_for_extension(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ts") | Some("tsx") => "typescript",
        Some("js") | Some("jsx") | Some("mjs") | Some("cjs") => "javascript",
        Some("py") => "python",
        Some("rs") => "rust",
        Some("go") => "go",
        Some("java") => "java",
        Some("rb") => "ruby",
        Some("php") => "php",
        Some("cs") => "csharp",
        _ => "plaintext",
    }
}

/// Walk `root`, respecting `.gitignore`/the default ignores/`config`'s
/// allow-listed extensions, returning a deterministically sorted file list.
pub fn enumerate_files(root: &Path, config: &WatcherConfig) -> std::io::Result<Vec<PathBuf>> {
    let extensions = config.effective_include_extensions();

    let mut overrides = ignore::overrides::OverrideBuilder::new(root);
    for pattern in DEFAULT_IGNORES {
        let _ = overrides.add(&format!("!{pattern}/**"));
        let _ = overrides.add(&format!("!{pattern}"));
    }
    for pattern in &config.ignored_globs {
        let _ = overrides.add(&format!("!{pattern}"));
    }
    let built = overrides
        .build()
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    let mut builder = ignore::WalkBuilder::new(root);
    builder.hidden(false).git_ignore(true).overrides(built);

    let mut files = Vec::new();
    for entry in builder.build() {
        let Ok(entry) = entry else { continue };
        let Some(file_type) = entry.file_type() else { continue };
        if !file_type.is_file() {
            continue;
        }
        let path = entry.into_path();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if extensions.iter().any(|e| e == ext) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// A file read and hashed during enumeration, ready to be checked against
/// the cache.
struct HashedFile {
    path: PathBuf,
    content: Vec<u8>,
    hash: u64,
}

fn read_and_hash(paths: &[PathBuf]) -> Vec<HashedFile> {
    paths
        .par_iter()
        .filter_map(|path| {
            let content = std::fs::read(path).ok()?;
            let hash = codekb_core::types::hash_bytes(&content);
            Some(HashedFile {
                path: path.clone(),
                content,
                hash,
            })
        })
        .collect()
}

pub struct ScanOutcome {
    pub added: usize,
    pub modified: usize,
    pub unchanged: usize,
    pub errors: usize,
}

/// Run the initial scan: enumerate, hash in parallel, skip files already
/// applied at this exact hash, consult the persistent cache for the rest,
/// dispatch true misses to the worker pool in batches, and fold every
/// result into `apply`.
///
/// - `needs_analysis(path, hash)` — in-memory check against `AnalyzerState`;
///   `false` means this exact content is already reflected in the graph.
/// - `try_cached(path, hash)` — persistent-cache lookup; `Some` skips the
///   worker pool entirely.
/// - `apply(path, hash, dto, from_cache)` — updates `AnalyzerState` and, if
///   `!from_cache`, should also populate the cache for next time.
pub async fn run_initial_scan(
    root: &Path,
    watcher_config: &WatcherConfig,
    analyzer_config: &AnalyzerConfig,
    workers: &Arc<WorkerPool>,
    handler: &Arc<dyn EngineEventHandler>,
    progress: &ProgressTracker,
    mut needs_analysis: impl FnMut(&str, u64) -> bool,
    mut try_cached: impl FnMut(&str, u64) -> Option<FileAnalysisDto>,
    mut apply: impl FnMut(&str, u64, FileAnalysisDto, bool),
    mut on_error: impl FnMut(&str, String),
) -> ScanOutcome {
    let started = Instant::now();
    let paths = enumerate_files(root, watcher_config).unwrap_or_default();
    handler.on_scan_started(&ScanStartedEvent {
        root: root.to_path_buf(),
        file_count: Some(paths.len()),
    });
    progress.set_phase(AnalysisPhase::Enumerating, paths.len());

    let hashed = read_and_hash(&paths);
    progress.set_phase(AnalysisPhase::Analyzing, hashed.len());

    let mut outcome = ScanOutcome {
        added: 0,
        modified: 0,
        unchanged: 0,
        errors: 0,
    };

    let mut tasks = Vec::new();
    let mut by_path = std::collections::HashMap::new();
    for file in hashed {
        let path_str = file.path.to_string_lossy().to_string();
        if !needs_analysis(&path_str, file.hash) {
            outcome.unchanged += 1;
            continue;
        }
        if let Some(dto) = try_cached(&path_str, file.hash) {
            outcome.modified += 1;
            apply(&path_str, file.hash, dto, true);
            continue;
        }
        let language = language_for_extension(&file.path);
        let payload = ParseTaskPayload::new(path_str.clone(), language, &file.content);
        let task = codekb_core::types::AnalysisTask::new(
            TaskKind::File,
            serde_json::to_value(&payload).unwrap(),
            0,
        );
        by_path.insert(task.id, (path_str, file.hash));
        tasks.push(task);
    }

    let total = tasks.len();
    let batch_size = analyzer_config.effective_batch_size();
    let mut receiver = workers.stream(tasks, batch_size, batch_size.max(1), None);

    let mut processed = 0usize;
    while let Some(chunk) = receiver.recv().await {
        for result in chunk {
            let Some((path, hash)) = by_path.get(&result.task_id).cloned() else {
                continue;
            };
            processed += 1;
            progress.set_processed(processed);
            handler.on_scan_progress(&ScanProgressEvent {
                processed,
                total,
            });

            if !result.ok {
                outcome.errors += 1;
                progress.add_errors(1);
                let message = result
                    .error
                    .map(|e| e.message)
                    .unwrap_or_else(|| "unknown analysis failure".to_string());
                on_error(&path, message);
                continue;
            }

            let Some(value) = result.value else { continue };
            match serde_json::from_value::<FileAnalysisDto>(value) {
                Ok(dto) => {
                    outcome.added += 1;
                    apply(&path, hash, dto, false);
                }
                Err(e) => {
                    outcome.errors += 1;
                    on_error(&path, format!("malformed analysis result: {e}"));
                }
            }
        }
    }

    handler.on_scan_complete(&ScanCompleteEvent {
        added: outcome.added,
        modified: outcome.modified,
        removed: 0,
        unchanged: outcome.unchanged,
        duration_ms: started.elapsed().as_millis() as u64,
    });

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_detection_covers_common_extensions() {
        assert_eq!(language_for_extension(Path::new("a.ts")), "typescript");
        assert_eq!(language_for_extension(Path::new("a.py")), "python");
        assert_eq!(language_for_extension(Path::new("a.unknown")), "plaintext");
    }

    #[test]
    fn enumerate_files_respects_default_ignores_and_extensions() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("node_modules")).unwrap();
        std::fs::write(tmp.path().join("node_modules/ignored.ts"), "x").unwrap();
        std::fs::write(tmp.path().join("a.ts"), "x").unwrap();
        std::fs::write(tmp.path().join("a.md"), "x").unwrap();

        let config = WatcherConfig::default();
        let files = enumerate_files(tmp.path(), &config).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("a.ts"));
    }
}

//! # codekb-analyzer
//!
//! The incremental analyzer orchestrator: runs the initial full-project
//! scan and the live-update pipeline over the cache, watcher, worker pool,
//! resolver and knowledge graph, keeping `AnalyzerState` in lock-step with
//! the graph.

pub mod analyzer;
pub mod dto;
pub mod guard;
pub mod live;
pub mod persist;
pub mod progress;
pub mod runner;
pub mod scan;
pub mod state;

pub use analyzer::IncrementalAnalyzer;
pub use dto::FileAnalysisDto;
pub use guard::PathGuard;
pub use progress::{AnalysisPhase, AnalysisProgress, ProgressTracker};
pub use runner::{ParseTaskPayload, ParseTaskRunner};
pub use scan::ScanOutcome;
pub use state::AnalyzerState;

//! # codekb-cache
//!
//! The two-tier (memory + disk) analysis cache: TTL expiry, LRU-ish
//! eviction via `moka`, file-mtime-aware invalidation, and singleflight
//! coalescing of concurrent cache misses.

pub mod cache;
pub mod disk;
pub mod key;
pub mod memory;
pub mod metrics;
pub mod singleflight;

pub use cache::AnalysisCache;
pub use key::CacheKeyInput;
pub use metrics::{CacheMetrics, CacheMetricsSnapshot};

//! # codekb-core
//!
//! Foundation crate for the knowledge-base / code-analysis engine.
//! Defines the types, error taxonomy, configuration, event fan-out,
//! tracing setup, and shared traits every other crate in the workspace
//! depends on.

#![allow(dead_code)]

pub mod config;
pub mod errors;
pub mod events;
pub mod traits;
pub mod tracing_init;
pub mod types;

pub use config::EngineConfig;
pub use errors::{EngineError, ErrorCode};
pub use events::dispatcher::EventDispatcher;
pub use events::handler::EngineEventHandler;
pub use types::collections::{FxHashMap, FxHashSet};
pub use types::identifiers::{EntityId, RelationshipId, TaskId};

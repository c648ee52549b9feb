//! Event fan-out: typed notifications for scan/watch/resolve progress.

pub mod dispatcher;
pub mod handler;
pub mod types;

pub use dispatcher::EventDispatcher;
pub use handler::{EngineEventHandler, TracingEventHandler};

//! Tracing subscriber setup, honoring the `LOG_LEVEL` environment variable.

use tracing_subscriber::EnvFilter;

/// Log verbosity, mapped from the `LOG_LEVEL` environment variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn from_env_value(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "error" => Self::Error,
            "warn" | "warning" => Self::Warn,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => Self::Info,
        }
    }

    fn as_filter_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Install a global `tracing-subscriber` with an `EnvFilter` layer.
/// Safe to call more than once — subsequent calls are no-ops.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter_str()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Resolve the effective log level from the `LOG_LEVEL` environment
/// variable, defaulting to `Info` when unset.
pub fn level_from_environment() -> LogLevel {
    std::env::var("LOG_LEVEL")
        .ok()
        .map(|v| LogLevel::from_env_value(&v))
        .unwrap_or_default()
}

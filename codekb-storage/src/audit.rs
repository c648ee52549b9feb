//! Append-only audit trail (`.audit/audit.log`), one JSON object per line:
//! `event_type`, `details`, `created_at`, the same shape a relational
//! events table would carry, written as JSONL instead of rows.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use codekb_core::EngineError;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
struct AuditEvent<'a> {
    event_type: &'a str,
    details: &'a Value,
    created_at_ms: u64,
}

pub struct AuditLog {
    path: PathBuf,
    write_guard: Mutex<()>,
}

impl AuditLog {
    pub fn new(audit_dir: &Path) -> Self {
        Self {
            path: audit_dir.join("audit.log"),
            write_guard: Mutex::new(()),
        }
    }

    pub fn record(&self, event_type: &str, details: &Value) -> Result<(), EngineError> {
        let _guard = self.write_guard.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let event = AuditEvent {
            event_type,
            details,
            created_at_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
        };
        let line = serde_json::to_string(&event)
            .map_err(|e| EngineError::InvalidArgument(e.to_string()))?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

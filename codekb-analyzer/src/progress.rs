//! Progress/ETA reporting: the analyzer exposes
//! `{ phase, processed, total, eta, errors, warnings }`, computing ETA from
//! an EMA-smoothed average file analysis time.

use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisPhase {
    Idle,
    Enumerating,
    Analyzing,
    Resolving,
    Watching,
}

#[derive(Debug, Clone, Copy)]
pub struct AnalysisProgress {
    pub phase: AnalysisPhase,
    pub processed: usize,
    pub total: usize,
    pub eta_ms: Option<u64>,
    pub errors: usize,
    pub warnings: usize,
}

struct State {
    phase: AnalysisPhase,
    processed: usize,
    total: usize,
    errors: usize,
    warnings: usize,
    ema_ms: Option<f64>,
}

/// EMA-smoothed per-file analysis time, used to project an ETA for the
/// remaining files in the current phase.
pub struct ProgressTracker {
    alpha: f64,
    state: Mutex<State>,
}

impl ProgressTracker {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            state: Mutex::new(State {
                phase: AnalysisPhase::Idle,
                processed: 0,
                total: 0,
                errors: 0,
                warnings: 0,
                ema_ms: None,
            }),
        }
    }

    pub fn set_phase(&self, phase: AnalysisPhase, total: usize) {
        let mut state = self.state.lock().unwrap();
        state.phase = phase;
        state.total = total;
        state.processed = 0;
    }

    pub fn set_processed(&self, processed: usize) {
        self.state.lock().unwrap().processed = processed;
    }

    pub fn add_errors(&self, errors: usize) {
        self.state.lock().unwrap().errors += errors;
    }

    pub fn add_warnings(&self, warnings: usize) {
        self.state.lock().unwrap().warnings += warnings;
    }

    /// Fold one file's analysis duration into the running average.
    pub fn record(&self, duration: Duration) {
        let mut state = self.state.lock().unwrap();
        let sample = duration.as_millis() as f64;
        state.ema_ms = Some(match state.ema_ms {
            Some(prev) => self.alpha * sample + (1.0 - self.alpha) * prev,
            None => sample,
        });
    }

    pub fn snapshot(&self) -> AnalysisProgress {
        let state = self.state.lock().unwrap();
        let remaining = state.total.saturating_sub(state.processed);
        let eta_ms = state.ema_ms.map(|avg| (avg * remaining as f64).round() as u64);
        AnalysisProgress {
            phase: state.phase,
            processed: state.processed,
            total: state.total,
            eta_ms,
            errors: state.errors,
            warnings: state.warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eta_is_none_until_a_sample_is_recorded() {
        let tracker = ProgressTracker::new(0.2);
        tracker.set_phase(AnalysisPhase::Analyzing, 10);
        assert_eq!(tracker.snapshot().eta_ms, None);
    }

    #[test]
    fn eta_scales_with_remaining_files() {
        let tracker = ProgressTracker::new(1.0);
        tracker.set_phase(AnalysisPhase::Analyzing, 10);
        tracker.record(Duration::from_millis(100));
        tracker.set_processed(5);
        let eta = tracker.snapshot().eta_ms.unwrap();
        assert_eq!(eta, 500);
    }

    #[test]
    fn ema_smooths_toward_new_samples_without_jumping_fully() {
        let tracker = ProgressTracker::new(0.5);
        tracker.set_phase(AnalysisPhase::Analyzing, 1);
        tracker.record(Duration::from_millis(100));
        tracker.record(Duration::from_millis(300));
        tracker.set_processed(0);
        let eta = tracker.snapshot().eta_ms.unwrap();
        assert_eq!(eta, 200);
    }
}

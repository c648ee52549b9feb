//! Cache metrics: hits, misses, evictions, tier byte counts, derived
//! hit-rate, and an EMA-smoothed response time.

use std::sync::atomic::{AtomicU64, Ordering};

/// A point-in-time snapshot of cache metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheMetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub memory_bytes: u64,
    pub disk_bytes: u64,
    pub hit_rate: f64,
    pub ema_response_us: f64,
}

/// Internal atomic counters, plus an EMA of response time guarded by a
/// small lock since floating point has no atomic add.
pub struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    ema_response_us_bits: AtomicU64,
    ema_alpha: f64,
}

impl CacheMetrics {
    pub fn new(ema_alpha: f64) -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            ema_response_us_bits: AtomicU64::new(0f64.to_bits()),
            ema_alpha,
        }
    }

    pub fn record_hit(&self, elapsed_us: f64) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        self.update_ema(elapsed_us);
    }

    pub fn record_miss(&self, elapsed_us: f64) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.update_ema(elapsed_us);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    fn update_ema(&self, sample_us: f64) {
        loop {
            let current_bits = self.ema_response_us_bits.load(Ordering::Relaxed);
            let current = f64::from_bits(current_bits);
            let updated = if current == 0.0 {
                sample_us
            } else {
                self.ema_alpha * sample_us + (1.0 - self.ema_alpha) * current
            };
            if self
                .ema_response_us_bits
                .compare_exchange_weak(
                    current_bits,
                    updated.to_bits(),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                )
                .is_ok()
            {
                break;
            }
        }
    }

    pub fn snapshot(&self, memory_bytes: u64, disk_bytes: u64) -> CacheMetricsSnapshot {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };
        CacheMetricsSnapshot {
            hits,
            misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            memory_bytes,
            disk_bytes,
            hit_rate,
            ema_response_us: f64::from_bits(self.ema_response_us_bits.load(Ordering::Relaxed)),
        }
    }
}

impl Default for CacheMetrics {
    fn default() -> Self {
        Self::new(0.2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_derived_correctly() {
        let m = CacheMetrics::default();
        m.record_hit(10.0);
        m.record_hit(10.0);
        m.record_miss(10.0);
        let snap = m.snapshot(0, 0);
        assert_eq!(snap.hits, 2);
        assert_eq!(snap.misses, 1);
        assert!((snap.hit_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn ema_converges_toward_repeated_sample() {
        let m = CacheMetrics::new(0.5);
        for _ in 0..20 {
            m.record_hit(100.0);
        }
        let snap = m.snapshot(0, 0);
        assert!((snap.ema_response_us - 100.0).abs() < 1e-6);
    }
}

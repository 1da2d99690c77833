//! Scoring Stats - Lock-free counters owned by the scoring context

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Default)]
pub struct ScoringStats {
    requests: AtomicU64,
    failures: AtomicU64,
    rows_scored: AtomicU64,
    latency_us: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub requests: u64,
    pub failures: u64,
    pub rows_scored: u64,
    pub avg_latency_ms: f64,
}

impl ScoringStats {
    pub fn record_success(&self, rows: usize, elapsed: Duration) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.rows_scored.fetch_add(rows as u64, Ordering::Relaxed);
        self.latency_us.fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let requests = self.requests.load(Ordering::Relaxed);
        let failures = self.failures.load(Ordering::Relaxed);
        let succeeded = requests.saturating_sub(failures);
        let sum = self.latency_us.load(Ordering::Relaxed);
        let avg = if succeeded > 0 { (sum as f64 / succeeded as f64) / 1000.0 } else { 0.0 };

        StatsSnapshot {
            requests,
            failures,
            rows_scored: self.rows_scored.load(Ordering::Relaxed),
            avg_latency_ms: avg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let stats = ScoringStats::default();
        stats.record_success(10, Duration::from_millis(4));
        stats.record_success(30, Duration::from_millis(2));
        stats.record_failure();

        let snap = stats.snapshot();
        assert_eq!(snap.requests, 3);
        assert_eq!(snap.failures, 1);
        assert_eq!(snap.rows_scored, 40);
        assert!((snap.avg_latency_ms - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_snapshot() {
        let snap = ScoringStats::default().snapshot();
        assert_eq!(snap.requests, 0);
        assert_eq!(snap.avg_latency_ms, 0.0);
    }
}

//! Duration Statistics
//!
//! Min, max and mean are kept incrementally; percentiles are taken by
//! nearest rank over every stored sample, so tail latencies are exact.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Summary of a set of durations, all values in nanoseconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationSummary {
    pub count: u64,
    pub min_ns: u64,
    pub max_ns: u64,
    pub mean_ns: u64,
    pub p50_ns: u64,
    pub p90_ns: u64,
    pub p95_ns: u64,
    pub p99_ns: u64,
}

/// Accumulates duration samples
#[derive(Debug, Clone, Default)]
pub struct DurationRecorder {
    samples: Vec<u64>,
    total_ns: u128,
    min_ns: u64,
    max_ns: u64,
}

impl DurationRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        if self.samples.is_empty() {
            self.min_ns = nanos;
            self.max_ns = nanos;
        } else {
            self.min_ns = self.min_ns.min(nanos);
            self.max_ns = self.max_ns.max(nanos);
        }
        self.total_ns += u128::from(nanos);
        self.samples.push(nanos);
    }

    pub fn count(&self) -> u64 {
        self.samples.len() as u64
    }

    pub fn summary(&self) -> DurationSummary {
        if self.samples.is_empty() {
            return DurationSummary::default();
        }

        let mut sorted = self.samples.clone();
        sorted.sort_unstable();
        let count = sorted.len() as u64;

        DurationSummary {
            count,
            min_ns: self.min_ns,
            max_ns: self.max_ns,
            mean_ns: (self.total_ns / u128::from(count)) as u64,
            p50_ns: nearest_rank(&sorted, 50.0),
            p90_ns: nearest_rank(&sorted, 90.0),
            p95_ns: nearest_rank(&sorted, 95.0),
            p99_ns: nearest_rank(&sorted, 99.0),
        }
    }
}

/// Nearest-rank percentile of an ascending slice; 0 when empty
pub fn nearest_rank(sorted: &[u64], percentile: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let n = sorted.len();
    let rank = ((percentile / 100.0) * n as f64).ceil() as usize;
    sorted[rank.clamp(1, n) - 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_rank() {
        let sorted: Vec<u64> = (1..=10).collect();
        assert_eq!(nearest_rank(&sorted, 50.0), 5);
        assert_eq!(nearest_rank(&sorted, 90.0), 9);
        assert_eq!(nearest_rank(&sorted, 95.0), 10);
        assert_eq!(nearest_rank(&sorted, 0.0), 1);
        assert_eq!(nearest_rank(&[], 50.0), 0);
    }

    #[test]
    fn test_summary() {
        let mut recorder = DurationRecorder::new();
        for millis in [30, 10, 20, 40] {
            recorder.record(Duration::from_millis(millis));
        }

        let summary = recorder.summary();
        assert_eq!(summary.count, 4);
        assert_eq!(summary.min_ns, 10_000_000);
        assert_eq!(summary.max_ns, 40_000_000);
        assert_eq!(summary.mean_ns, 25_000_000);
        assert_eq!(summary.p50_ns, 20_000_000);
        assert_eq!(summary.p99_ns, 40_000_000);
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(DurationRecorder::new().summary(), DurationSummary::default());
    }
}

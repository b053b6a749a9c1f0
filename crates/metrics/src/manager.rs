use cadence_core::{OperationResult, Time};
use cadence_ports::Clock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{MetricsError, Result};
use crate::stats::{DurationRecorder, DurationSummary};

/// Progress report returned by a status request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadStatus {
    /// Results folded so far
    pub operation_count: u64,
    /// Time since the metrics service started, by its clock
    pub runtime_ms: u64,
    /// Operations per second over `runtime_ms`
    pub throughput: f64,
    pub last_actual_start: Option<Time>,
}

/// Per operation kind aggregates inside a [`ResultsSnapshot`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationMetricsSnapshot {
    pub kind: String,
    pub count: u64,
    /// Results with a non-zero result code
    pub failure_count: u64,
    pub run_time: DurationSummary,
    pub start_delay: DurationSummary,
}

/// Full workload results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsSnapshot {
    pub start_time: Option<Time>,
    pub latest_finish_time: Option<Time>,
    pub total_runtime_ms: u64,
    pub operation_count: u64,
    /// Operations per second between the first start and the latest finish
    pub throughput: f64,
    pub operations: Vec<OperationMetricsSnapshot>,
}

impl ResultsSnapshot {
    pub fn operation(&self, kind: &str) -> Option<&OperationMetricsSnapshot> {
        self.operations.iter().find(|op| op.kind == kind)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct OperationMetrics {
    run_time: DurationRecorder,
    start_delay: DurationRecorder,
    failure_count: u64,
}

/// Running aggregates over folded results
///
/// Owned by the metrics thread; nothing here is shared.
pub struct MetricsManager {
    clock: Arc<dyn Clock>,
    started_at: Time,
    kinds: BTreeMap<String, OperationMetrics>,
    operation_count: u64,
    first_start: Option<Time>,
    last_actual_start: Option<Time>,
    latest_finish: Option<Time>,
}

impl MetricsManager {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let started_at = clock.now();
        Self {
            clock,
            started_at,
            kinds: BTreeMap::new(),
            operation_count: 0,
            first_start: None,
            last_actual_start: None,
            latest_finish: None,
        }
    }

    /// Fold one result into the aggregates
    pub fn measure(&mut self, result: &OperationResult) -> Result<()> {
        let kind = &result.operation.kind;
        if kind.is_empty() {
            return Err(MetricsError::Fold(format!(
                "operation {} has no kind",
                result.operation.id
            )));
        }

        let metrics = self.kinds.entry(kind.clone()).or_default();
        metrics.run_time.record(result.run_duration);
        metrics.start_delay.record(result.start_delay());
        if result.result_code != 0 {
            metrics.failure_count += 1;
        }

        let finish = result.actual_start.plus(result.run_duration);
        self.operation_count += 1;
        self.first_start = Some(
            self.first_start
                .map_or(result.actual_start, |t| t.min(result.actual_start)),
        );
        self.last_actual_start = Some(
            self.last_actual_start
                .map_or(result.actual_start, |t| t.max(result.actual_start)),
        );
        self.latest_finish = Some(self.latest_finish.map_or(finish, |t| t.max(finish)));
        Ok(())
    }

    pub fn status(&self) -> WorkloadStatus {
        let runtime = self.clock.now().duration_since(self.started_at);
        WorkloadStatus {
            operation_count: self.operation_count,
            runtime_ms: runtime.as_millis() as u64,
            throughput: throughput(self.operation_count, runtime),
            last_actual_start: self.last_actual_start,
        }
    }

    pub fn snapshot(&self) -> ResultsSnapshot {
        let total_runtime = match (self.first_start, self.latest_finish) {
            (Some(first), Some(latest)) => latest.duration_since(first),
            _ => Duration::ZERO,
        };

        ResultsSnapshot {
            start_time: self.first_start,
            latest_finish_time: self.latest_finish,
            total_runtime_ms: total_runtime.as_millis() as u64,
            operation_count: self.operation_count,
            throughput: throughput(self.operation_count, total_runtime),
            operations: self
                .kinds
                .iter()
                .map(|(kind, metrics)| OperationMetricsSnapshot {
                    kind: kind.clone(),
                    count: metrics.run_time.count(),
                    failure_count: metrics.failure_count,
                    run_time: metrics.run_time.summary(),
                    start_delay: metrics.start_delay.summary(),
                })
                .collect(),
        }
    }
}

fn throughput(count: u64, over: Duration) -> f64 {
    let seconds = over.as_secs_f64();
    if seconds > 0.0 {
        count as f64 / seconds
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::Operation;
    use serde_json::Value;

    struct FrozenClock(Time);

    impl Clock for FrozenClock {
        fn now(&self) -> Time {
            self.0
        }
    }

    fn result(kind: &str, scheduled_ms: u64, actual_ms: u64, run_ms: u64) -> OperationResult {
        OperationResult {
            operation: Operation::new(1, kind, Time::from_milli(scheduled_ms)),
            actual_start: Time::from_milli(actual_ms),
            run_duration: Duration::from_millis(run_ms),
            result_code: 0,
            value: Value::Null,
            late_start_accepted: false,
        }
    }

    #[test]
    fn test_snapshot_groups_by_kind() {
        let mut manager = MetricsManager::new(Arc::new(FrozenClock(Time::MIN)));
        manager.measure(&result("read", 0, 0, 10)).unwrap();
        manager.measure(&result("read", 100, 105, 30)).unwrap();
        manager.measure(&result("update", 200, 200, 50)).unwrap();

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.operation_count, 3);
        assert_eq!(snapshot.start_time, Some(Time::from_milli(0)));
        assert_eq!(snapshot.latest_finish_time, Some(Time::from_milli(250)));
        assert_eq!(snapshot.total_runtime_ms, 250);
        assert!((snapshot.throughput - 12.0).abs() < 1e-9);

        let read = snapshot.operation("read").unwrap();
        assert_eq!(read.count, 2);
        assert_eq!(read.run_time.max_ns, 30_000_000);
        assert_eq!(read.start_delay.max_ns, 5_000_000);
        assert_eq!(snapshot.operation("update").unwrap().count, 1);
    }

    #[test]
    fn test_failures_counted() {
        let mut manager = MetricsManager::new(Arc::new(FrozenClock(Time::MIN)));
        let mut failed = result("insert", 0, 0, 1);
        failed.result_code = 2;
        manager.measure(&failed).unwrap();
        manager.measure(&result("insert", 1, 1, 1)).unwrap();

        assert_eq!(manager.snapshot().operation("insert").unwrap().failure_count, 1);
    }

    #[test]
    fn test_empty_kind_is_fold_error() {
        let mut manager = MetricsManager::new(Arc::new(FrozenClock(Time::MIN)));
        let err = manager.measure(&result("", 0, 0, 1)).unwrap_err();
        assert!(matches!(err, MetricsError::Fold(_)));
        assert_eq!(manager.snapshot().operation_count, 0);
    }

    #[test]
    fn test_status_uses_clock() {
        let mut manager = MetricsManager::new(Arc::new(FrozenClock(Time::MIN)));
        manager.measure(&result("read", 0, 7, 1)).unwrap();

        let status = manager.status();
        assert_eq!(status.operation_count, 1);
        assert_eq!(status.runtime_ms, 0);
        assert_eq!(status.throughput, 0.0);
        assert_eq!(status.last_actual_start, Some(Time::from_milli(7)));
    }

    #[test]
    fn test_snapshot_json_export() {
        let mut manager = MetricsManager::new(Arc::new(FrozenClock(Time::MIN)));
        manager.measure(&result("scan", 0, 0, 4)).unwrap();

        let json = manager.snapshot().to_json().unwrap();
        let parsed: ResultsSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.operations[0].kind, "scan");
    }
}

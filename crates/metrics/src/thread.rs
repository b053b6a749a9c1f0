use cadence_core::OperationResult;
use cadence_ports::ExecutionDelayPolicy;
use cadence_sync::ErrorReporter;
use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::event::MetricsCollectionEvent;
use crate::manager::MetricsManager;
use crate::results_log::{ResultsLog, ResultsLogRow};

pub(crate) const THREAD_NAME: &str = "metrics-service";

/// The single consumer of the metrics event queue
pub(crate) struct MetricsThread {
    manager: MetricsManager,
    receiver: Receiver<MetricsCollectionEvent>,
    error_reporter: Arc<ErrorReporter>,
    delay_policy: Arc<dyn ExecutionDelayPolicy>,
    tolerated_delay: Duration,
    record_start_delay: bool,
    results_log: Option<Box<dyn ResultsLog>>,
    shutdown_complete: Arc<AtomicBool>,
    processed_event_count: u64,
    expected_event_count: Option<u64>,
}

impl MetricsThread {
    pub fn new(
        manager: MetricsManager,
        receiver: Receiver<MetricsCollectionEvent>,
        error_reporter: Arc<ErrorReporter>,
        delay_policy: Arc<dyn ExecutionDelayPolicy>,
        record_start_delay: bool,
        results_log: Option<Box<dyn ResultsLog>>,
        shutdown_complete: Arc<AtomicBool>,
    ) -> Self {
        let tolerated_delay = delay_policy.tolerated_delay();
        Self {
            manager,
            receiver,
            error_reporter,
            delay_policy,
            tolerated_delay,
            record_start_delay,
            results_log,
            shutdown_complete,
            processed_event_count: 0,
            expected_event_count: None,
        }
    }

    pub fn run(mut self) {
        log::info!("Metrics service started");

        while !self.drained() {
            let event = match self.receiver.recv() {
                Ok(event) => event,
                Err(_) => {
                    log::info!("Metrics event queue closed");
                    return;
                }
            };
            if let Err(message) = self.process_event(event) {
                self.error_reporter.report(THREAD_NAME, message);
                return;
            }
        }

        if let Some(results_log) = self.results_log.as_mut()
            && let Err(e) = results_log.flush()
        {
            log::warn!("Failed to flush results log: {}", e);
        }
        self.shutdown_complete.store(true, Ordering::Release);
        log::info!(
            "Metrics service shutdown complete after {} results",
            self.processed_event_count
        );
    }

    fn drained(&self) -> bool {
        self.expected_event_count
            .is_some_and(|expected| self.processed_event_count >= expected)
    }

    fn process_event(&mut self, event: MetricsCollectionEvent) -> Result<(), String> {
        match event {
            MetricsCollectionEvent::SubmitResult(result) => {
                self.processed_event_count += 1;
                self.submit_result(&result)?;
            }
            MetricsCollectionEvent::Status { reply } => {
                reply.resolve(self.manager.status());
            }
            MetricsCollectionEvent::Snapshot { reply } => {
                reply.resolve(self.manager.snapshot());
            }
            MetricsCollectionEvent::Terminate {
                expected_event_count,
            } => match self.expected_event_count {
                None => self.expected_event_count = Some(expected_event_count),
                Some(first) => {
                    return Err(format!(
                        "Encountered multiple termination events. First expected_event_count[{first}]. Second expected_event_count[{expected_event_count}]"
                    ));
                }
            },
        }
        Ok(())
    }

    fn submit_result(&mut self, result: &OperationResult) -> Result<(), String> {
        if let Some(results_log) = self.results_log.as_mut()
            && let Err(e) = results_log.write_row(&ResultsLogRow::from(result))
        {
            log::warn!(
                "Failed to write results log row for operation {}: {}",
                result.operation.id,
                e
            );
        }

        // Early or within tolerance: record. Too late: the policy decides,
        // unless it already accepted the start when the spinner released it.
        let record = !self.record_start_delay
            || !result.started_too_late(self.tolerated_delay)
            || result.late_start_accepted
            || self.delay_policy.handle_excessive_delay(&result.operation);
        if !record {
            log::debug!(
                "Dropping metrics for late operation {} ({:?} late)",
                result.operation.id,
                result.start_delay()
            );
            return Ok(());
        }

        self.manager.measure(result).map_err(|e| {
            format!(
                "Encountered error while collecting metrics for result of operation {}: {}",
                result.operation.id, e
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{Operation, Time};
    use cadence_ports::Clock;
    use cadence_sync::pending;
    use crossbeam_channel::unbounded;
    use serde_json::Value;

    struct ZeroClock;

    impl Clock for ZeroClock {
        fn now(&self) -> Time {
            Time::MIN
        }
    }

    struct Reject;

    impl ExecutionDelayPolicy for Reject {
        fn tolerated_delay(&self) -> Duration {
            Duration::from_millis(10)
        }

        fn handle_excessive_delay(&self, _operation: &Operation) -> bool {
            false
        }
    }

    fn metrics_thread(
        record_start_delay: bool,
    ) -> (
        MetricsThread,
        crossbeam_channel::Sender<MetricsCollectionEvent>,
        Arc<ErrorReporter>,
    ) {
        let (tx, rx) = unbounded();
        let reporter = ErrorReporter::new();
        let thread = MetricsThread::new(
            MetricsManager::new(Arc::new(ZeroClock)),
            rx,
            Arc::clone(&reporter),
            Arc::new(Reject),
            record_start_delay,
            None,
            Arc::new(AtomicBool::new(false)),
        );
        (thread, tx, reporter)
    }

    fn late_result() -> Box<OperationResult> {
        Box::new(OperationResult {
            operation: Operation::new(1, "read", Time::from_milli(100)),
            actual_start: Time::from_milli(200),
            run_duration: Duration::from_millis(1),
            result_code: 0,
            value: Value::Null,
            late_start_accepted: false,
        })
    }

    #[test]
    fn test_second_terminate_is_reported() {
        let (thread, tx, reporter) = metrics_thread(true);
        let shutdown_complete = Arc::clone(&thread.shutdown_complete);
        tx.send(MetricsCollectionEvent::Terminate {
            expected_event_count: 5,
        })
        .unwrap();
        tx.send(MetricsCollectionEvent::Terminate {
            expected_event_count: 6,
        })
        .unwrap();

        thread.run();

        assert!(!shutdown_complete.load(Ordering::Acquire));
        let errors = reporter.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("multiple termination events"));
    }

    #[test]
    fn test_late_result_dropped_unless_delay_checks_disabled() {
        for (record_start_delay, expected_count) in [(true, 0), (false, 1)] {
            let (thread, tx, reporter) = metrics_thread(record_start_delay);
            let (reply, snapshot) = pending();
            tx.send(MetricsCollectionEvent::SubmitResult(late_result()))
                .unwrap();
            tx.send(MetricsCollectionEvent::Snapshot { reply }).unwrap();
            tx.send(MetricsCollectionEvent::Terminate {
                expected_event_count: 1,
            })
            .unwrap();

            thread.run();

            let snapshot = snapshot
                .wait(Default::default(), Some(&reporter))
                .unwrap();
            assert_eq!(snapshot.operation_count, expected_count);
        }
    }

    #[test]
    fn test_late_start_accepted_at_release_is_not_judged_again() {
        let (thread, tx, reporter) = metrics_thread(true);
        let (reply, snapshot) = pending();
        let mut result = late_result();
        result.late_start_accepted = true;
        tx.send(MetricsCollectionEvent::SubmitResult(result)).unwrap();
        tx.send(MetricsCollectionEvent::Snapshot { reply }).unwrap();
        tx.send(MetricsCollectionEvent::Terminate {
            expected_event_count: 1,
        })
        .unwrap();

        thread.run();

        // The rejecting policy would have dropped it
        let snapshot = snapshot
            .wait(Default::default(), Some(&reporter))
            .unwrap();
        assert_eq!(snapshot.operation_count, 1);
    }
}

use cadence_core::OperationResult;
use cadence_ports::{Clock, ExecutionDelayPolicy};
use cadence_sync::{ErrorReporter, Pending, PollSchedule, SyncError, pending, poll_until};
use crossbeam_channel::{Sender, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{MetricsError, Result};
use crate::event::MetricsCollectionEvent;
use crate::manager::{MetricsManager, ResultsSnapshot, WorkloadStatus};
use crate::results_log::ResultsLog;
use crate::thread::{MetricsThread, THREAD_NAME};

/// Metrics service configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Consult the delay policy for results that started too late
    pub record_start_delay: bool,
    pub read_timeout: Duration,
    pub shutdown_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            record_start_delay: true,
            read_timeout: Duration::from_secs(2),
            shutdown_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Metrics service backed by one dedicated aggregation thread
///
/// Safe to share between handler threads; every call only enqueues.
pub struct MetricsService {
    sender: Sender<MetricsCollectionEvent>,
    error_reporter: Arc<ErrorReporter>,
    config: MetricsConfig,
    shutting_down: AtomicBool,
    submitted_count: AtomicU64,
    shutdown_complete: Arc<AtomicBool>,
    thread: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl MetricsService {
    pub fn start(
        clock: Arc<dyn Clock>,
        error_reporter: Arc<ErrorReporter>,
        delay_policy: Arc<dyn ExecutionDelayPolicy>,
        config: MetricsConfig,
        results_log: Option<Box<dyn ResultsLog>>,
    ) -> Result<Self> {
        let (sender, receiver) = unbounded();
        let shutdown_complete = Arc::new(AtomicBool::new(false));
        let metrics_thread = MetricsThread::new(
            MetricsManager::new(clock),
            receiver,
            Arc::clone(&error_reporter),
            delay_policy,
            config.record_start_delay,
            results_log,
            Arc::clone(&shutdown_complete),
        );

        let thread = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || metrics_thread.run())?;

        Ok(Self {
            sender,
            error_reporter,
            config,
            shutting_down: AtomicBool::new(false),
            submitted_count: AtomicU64::new(0),
            shutdown_complete,
            thread: parking_lot::Mutex::new(Some(thread)),
        })
    }

    pub fn submit_result(&self, result: OperationResult) -> Result<()> {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(MetricsError::ShuttingDown);
        }
        self.submitted_count.fetch_add(1, Ordering::AcqRel);
        self.send(MetricsCollectionEvent::SubmitResult(Box::new(result)))
    }

    pub fn status(&self) -> Result<Pending<WorkloadStatus>> {
        let (reply, pending) = pending();
        self.send(MetricsCollectionEvent::Status { reply })?;
        Ok(pending)
    }

    pub fn snapshot(&self) -> Result<Pending<ResultsSnapshot>> {
        let (reply, pending) = pending();
        self.send(MetricsCollectionEvent::Snapshot { reply })?;
        Ok(pending)
    }

    pub fn wait_status(&self) -> Result<WorkloadStatus> {
        self.status()?
            .wait(self.read_schedule(), Some(&self.error_reporter))
            .map_err(|e| self.sync_error("reading workload status", e))
    }

    /// Results as of every submission enqueued before this call
    pub fn wait_snapshot(&self) -> Result<ResultsSnapshot> {
        self.snapshot()?
            .wait(self.read_schedule(), Some(&self.error_reporter))
            .map_err(|e| self.sync_error("reading results snapshot", e))
    }

    /// Fold every result submitted so far, then stop the thread.
    /// A second call returns immediately.
    pub fn shutdown(&self) -> Result<()> {
        if self.shutting_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let expected_event_count = self.submitted_count.load(Ordering::Acquire);
        log::info!(
            "Shutting down metrics service, expecting {} results",
            expected_event_count
        );
        self.send(MetricsCollectionEvent::Terminate {
            expected_event_count,
        })?;

        let schedule = PollSchedule::new(self.config.poll_interval, self.config.shutdown_timeout);
        poll_until(schedule, Some(&self.error_reporter), || {
            self.shutdown_complete.load(Ordering::Acquire)
        })
        .map_err(|e| self.sync_error("shutting down", e))?;

        let handle = self.thread.lock().take();
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            return Err(MetricsError::Protocol(format!("{THREAD_NAME} panicked")));
        }
        Ok(())
    }

    fn read_schedule(&self) -> PollSchedule {
        PollSchedule::new(self.config.poll_interval, self.config.read_timeout)
    }

    fn send(&self, event: MetricsCollectionEvent) -> Result<()> {
        self.sender.send(event).map_err(|_| {
            if self.error_reporter.error_encountered() {
                MetricsError::Reported(self.error_reporter.to_string())
            } else {
                MetricsError::ChannelClosed
            }
        })
    }

    fn sync_error(&self, context: &str, error: SyncError) -> MetricsError {
        match error {
            SyncError::Timeout(waited) => {
                MetricsError::Timeout(format!("{context} took longer than {waited:?}"))
            }
            SyncError::Closed => MetricsError::ChannelClosed,
            SyncError::Reported(errors) => MetricsError::Reported(errors),
        }
    }
}

impl Drop for MetricsService {
    fn drop(&mut self) {
        if !self.shutting_down.swap(true, Ordering::AcqRel) {
            let expected_event_count = self.submitted_count.load(Ordering::Acquire);
            let _ = self.sender.send(MetricsCollectionEvent::Terminate {
                expected_event_count,
            });
        }
    }
}

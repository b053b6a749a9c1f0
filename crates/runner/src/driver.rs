//! Driver run loop
//!
//! Wires the completion time service, the metrics service and a handler
//! executor together, then feeds operations through them in scheduled
//! start order.

use cadence_coordination::{CompletionTimeService, LocalCompletionTimeWriter};
use cadence_core::{Operation, OperationResult, Time};
use cadence_executor::{
    ExecutionError, HandlerExecutor, OperationExecutor, OperationHandler, Spinner,
};
use cadence_metrics::{CsvResultsLog, MetricsError, MetricsService, ResultsLog, ResultsSnapshot};
use cadence_ports::{Clock, CompletionTimeWriter, ExecutionDelayPolicy, GlobalCompletionTimeReader};
use cadence_sync::{ErrorReporter, power_nap};
use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::DriverConfig;
use crate::error::{DecodingError, DriverError, Result};

const SOURCE: &str = "driver";
const STATUS_THREAD_NAME: &str = "status-reporter";
const DRAIN_NAP: Duration = Duration::from_millis(1);

type HandlerOutcome = std::result::Result<OperationResult, ExecutionError>;

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct DriverReport {
    pub snapshot: ResultsSnapshot,
    /// Operations that failed without aborting the run
    pub failed_operations: u64,
    /// Global completion time once every operation finished
    pub global_completion_time: Option<Time>,
}

pub struct Driver {
    config: DriverConfig,
    clock: Arc<dyn Clock>,
    error_reporter: Arc<ErrorReporter>,
    delay_policy: Arc<dyn ExecutionDelayPolicy>,
    completion_time: Arc<CompletionTimeService>,
    metrics: Arc<MetricsService>,
}

impl Driver {
    /// Validate `config` and start both coordination services
    pub fn new(config: DriverConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let error_reporter = ErrorReporter::new();
        let delay_policy = config.delay_policy(&error_reporter);
        let completion_time = CompletionTimeService::start(
            config.peer_ids.iter().cloned(),
            Arc::clone(&error_reporter),
            config.completion_time_config(),
        )?;

        let results_log = match &config.results_log {
            Some(path) => {
                let log = CsvResultsLog::create(path, &config.results_log_delimiter)
                    .map_err(MetricsError::from)?;
                Some(Box::new(log) as Box<dyn ResultsLog>)
            }
            None => None,
        };
        let metrics = MetricsService::start(
            Arc::clone(&clock),
            Arc::clone(&error_reporter),
            Arc::clone(&delay_policy),
            config.metrics_config(),
            results_log,
        )?;

        log::info!(
            "Driver started: {} threads, {} peers, {:?} delay policy",
            config.thread_count,
            config.peer_ids.len(),
            config.delay_policy
        );
        Ok(Self {
            config,
            clock,
            error_reporter,
            delay_policy,
            completion_time: Arc::new(completion_time),
            metrics: Arc::new(metrics),
        })
    }

    /// Service peers submit their completion times to
    pub fn completion_time_service(&self) -> &Arc<CompletionTimeService> {
        &self.completion_time
    }

    pub fn error_reporter(&self) -> &Arc<ErrorReporter> {
        &self.error_reporter
    }

    /// Execute every operation with `body` and collect the results
    ///
    /// Operations must come in non-decreasing scheduled start order.
    /// Reported errors always abort the run; failed operations abort it
    /// only with `abort_on_failure`.
    pub fn run<I>(self, operations: I, body: Arc<dyn OperationExecutor>) -> Result<DriverReport>
    where
        I: IntoIterator<Item = std::result::Result<Operation, DecodingError>>,
    {
        let status = match self.config.status_interval() {
            Some(interval) => Some(StatusReporter::spawn(Arc::clone(&self.metrics), interval)?),
            None => None,
        };

        let mut executor = HandlerExecutor::new(self.config.thread_count)?;
        let outcome = self.execute_all(&mut executor, operations.into_iter(), body);
        // Interrupts whatever an aborted run left in flight
        executor.shutdown(self.shutdown_timeout());
        drop(status);

        match outcome {
            Ok(failed_operations) => self.finish(failed_operations),
            Err(e) => {
                self.abandon();
                Err(e)
            }
        }
    }

    fn execute_all(
        &self,
        executor: &mut HandlerExecutor,
        operations: impl Iterator<Item = std::result::Result<Operation, DecodingError>>,
        body: Arc<dyn OperationExecutor>,
    ) -> Result<u64> {
        let spinner = Arc::new(Spinner::new(
            Arc::clone(&self.clock),
            Arc::clone(&self.delay_policy),
            self.config.spinner_config(),
        ));
        let gct_reader: Arc<dyn GlobalCompletionTimeReader> = self.completion_time.clone();
        let mut writers: Vec<Arc<LocalCompletionTimeWriter>> = Vec::new();
        let mut previous: Option<Time> = None;
        let mut failed = 0;

        for (index, operation) in operations.enumerate() {
            let operation = operation?;
            if let Some(previous) = previous
                && operation.scheduled_start < previous
            {
                return Err(DriverError::OutOfOrder {
                    operation_id: operation.id,
                    scheduled_start: operation.scheduled_start,
                    previous,
                });
            }
            previous = Some(operation.scheduled_start);

            // Writers are registered on first use; one that never initiates
            // anything would hold the global completion time at unknown
            let slot = index % self.config.thread_count;
            if slot == writers.len() {
                writers.push(Arc::new(self.completion_time.register_writer()?));
            }
            let writer: Arc<dyn CompletionTimeWriter> = writers[slot].clone();

            let handler = OperationHandler::init(
                Arc::clone(&spinner),
                operation,
                writer,
                Arc::clone(&gct_reader),
                Arc::clone(&body),
            )?;
            executor.submit(handler)?;

            while executor.in_flight() >= self.config.max_in_flight_operations {
                match self.next_finished(executor, failed)? {
                    Some(outcome) => failed += self.collect(outcome, failed)?,
                    None => break,
                }
            }
            while let Some(outcome) = executor.try_take() {
                failed += self.collect(outcome, failed)?;
            }
            self.check_reported(failed)?;
        }

        while let Some(outcome) = self.next_finished(executor, failed)? {
            failed += self.collect(outcome, failed)?;
        }
        Ok(failed)
    }

    /// Wait for the next finished handler, failing fast on reported errors.
    /// `None` once nothing is in flight.
    fn next_finished(
        &self,
        executor: &mut HandlerExecutor,
        failed: u64,
    ) -> Result<Option<HandlerOutcome>> {
        loop {
            if let Some(outcome) = executor.try_take() {
                return Ok(Some(outcome));
            }
            if executor.in_flight() == 0 {
                return Ok(None);
            }
            self.check_reported(failed)?;
            power_nap(DRAIN_NAP);
        }
    }

    /// Forward a finished handler; 1 when it failed without aborting
    fn collect(
        &self,
        outcome: HandlerOutcome,
        failed_so_far: u64,
    ) -> Result<u64> {
        match outcome {
            Ok(result) => {
                self.metrics.submit_result(result)?;
                Ok(0)
            }
            Err(e) if self.config.abort_on_failure => {
                self.error_reporter.report(SOURCE, e.to_string());
                Err(DriverError::Aborted {
                    failed_operations: failed_so_far + 1,
                    errors: self.error_reporter.to_string(),
                })
            }
            Err(e) => {
                log::warn!("{}", e);
                Ok(1)
            }
        }
    }

    fn check_reported(&self, failed_operations: u64) -> Result<()> {
        if self.error_reporter.error_encountered() {
            return Err(DriverError::Aborted {
                failed_operations,
                errors: self.error_reporter.to_string(),
            });
        }
        Ok(())
    }

    fn finish(self, failed_operations: u64) -> Result<DriverReport> {
        let global_completion_time = self.completion_time.wait_global_completion_time()?;
        self.completion_time.shutdown()?;
        // Queued behind every submitted result, so nothing is missing
        let snapshot = self.metrics.wait_snapshot()?;
        self.metrics.shutdown()?;

        if let Some(path) = &self.config.results_json {
            snapshot.write_json(path)?;
            log::info!("Results written to {}", path.display());
        }
        log::info!(
            "Run finished: {} operations, {} failed, {:.1} op/s",
            snapshot.operation_count,
            failed_operations,
            snapshot.throughput
        );
        Ok(DriverReport {
            snapshot,
            failed_operations,
            global_completion_time,
        })
    }

    /// Best-effort teardown after an aborted run
    fn abandon(&self) {
        if let Err(e) = self.completion_time.shutdown() {
            log::warn!("Completion time service shutdown after abort: {}", e);
        }
        if let Err(e) = self.metrics.shutdown() {
            log::warn!("Metrics service shutdown after abort: {}", e);
        }
    }

    fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.config.shutdown_timeout_ms)
    }
}

/// Logs workload status at a fixed interval until dropped
struct StatusReporter {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl StatusReporter {
    fn spawn(metrics: Arc<MetricsService>, interval: Duration) -> Result<Self> {
        let (stop, stopped) = bounded::<()>(0);
        let thread = thread::Builder::new()
            .name(STATUS_THREAD_NAME.to_string())
            .spawn(move || {
                while let Err(RecvTimeoutError::Timeout) = stopped.recv_timeout(interval) {
                    match metrics.wait_status() {
                        Ok(status) => log::info!(
                            "Status: {} operations in {} ms ({:.1} op/s), last start {}",
                            status.operation_count,
                            status.runtime_ms,
                            status.throughput,
                            status
                                .last_actual_start
                                .map_or_else(|| "-".to_string(), |time| time.to_string())
                        ),
                        Err(e) => {
                            log::warn!("Status unavailable: {}", e);
                            break;
                        }
                    }
                }
            })
            .map_err(|e| DriverError::Thread(STATUS_THREAD_NAME, e.to_string()))?;

        Ok(Self {
            stop: Some(stop),
            thread: Some(thread),
        })
    }
}

impl Drop for StatusReporter {
    fn drop(&mut self) {
        // Disconnecting wakes the thread immediately
        self.stop.take();
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            log::warn!("{} thread panicked", STATUS_THREAD_NAME);
        }
    }
}

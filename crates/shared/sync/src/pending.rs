use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::oneshot::{self, error::TryRecvError};

use crate::error::{SyncError, SyncResult};
use crate::reporter::ErrorReporter;

/// Sleep granularity and overall deadline for a polling wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    /// Nap between checks; trades wake-up latency against CPU usage
    pub interval: Duration,
    /// Overall deadline
    pub timeout: Duration,
}

impl PollSchedule {
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_secs(2))
    }
}

/// Short sleep used by every polling loop. A zero nap only yields.
pub fn power_nap(duration: Duration) {
    if duration.is_zero() {
        thread::yield_now();
    } else {
        thread::sleep(duration);
    }
}

/// Poll `ready` until it returns true or the schedule's deadline passes.
///
/// Fails fast with [`SyncError::Reported`] once `reporter` holds an error.
/// Deadlines are measured on the monotonic wall clock so a frozen test
/// clock can never stall a caller forever.
pub fn poll_until(
    schedule: PollSchedule,
    reporter: Option<&ErrorReporter>,
    mut ready: impl FnMut() -> bool,
) -> SyncResult<()> {
    let deadline = Instant::now() + schedule.timeout;
    loop {
        if ready() {
            return Ok(());
        }
        if let Some(reporter) = reporter
            && reporter.error_encountered()
        {
            return Err(SyncError::Reported(reporter.to_string()));
        }
        if Instant::now() >= deadline {
            return Err(SyncError::Timeout(schedule.timeout));
        }
        power_nap(schedule.interval);
    }
}

/// Create a one-shot cell: the [`Resolver`] half goes to the service
/// thread, the [`Pending`] half to the caller.
pub fn pending<T>() -> (Resolver<T>, Pending<T>) {
    let (tx, rx) = oneshot::channel();
    (Resolver { tx }, Pending { rx })
}

/// Write half of a one-shot cell
#[derive(Debug)]
pub struct Resolver<T> {
    tx: oneshot::Sender<T>,
}

impl<T> Resolver<T> {
    /// Set the value. Returns false when the caller already gave up.
    pub fn resolve(self, value: T) -> bool {
        self.tx.send(value).is_ok()
    }
}

/// Read half of a one-shot cell, resolved exactly once by a service thread
///
/// Supports a bounded polling wait from plain threads and `.resolve().await`
/// from async code.
#[derive(Debug)]
pub struct Pending<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Pending<T> {
    /// Non-blocking check; `Ok(None)` while unresolved
    pub fn try_get(&mut self) -> SyncResult<Option<T>> {
        match self.rx.try_recv() {
            Ok(value) => Ok(Some(value)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Closed) => Err(SyncError::Closed),
        }
    }

    /// Poll for the value according to `schedule`
    pub fn wait(mut self, schedule: PollSchedule, reporter: Option<&ErrorReporter>) -> SyncResult<T> {
        let mut value = None;
        poll_until(schedule, reporter, || match self.try_get() {
            Ok(Some(v)) => {
                value = Some(v);
                true
            }
            Ok(None) => false,
            Err(_) => true,
        })?;
        match value {
            Some(value) => Ok(value),
            // A service thread that stopped on an error drops its pending replies
            None => match reporter {
                Some(reporter) if reporter.error_encountered() => {
                    Err(SyncError::Reported(reporter.to_string()))
                }
                _ => Err(SyncError::Closed),
            },
        }
    }

    /// Await the value
    pub async fn resolve(self) -> SyncResult<T> {
        self.rx.await.map_err(|_| SyncError::Closed)
    }
}

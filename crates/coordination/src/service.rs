use cadence_core::{PeerId, Time};
use cadence_ports::{
    CompletionTimeError, CompletionTimeResult, CompletionTimeWriter, GlobalCompletionTimeReader,
};
use cadence_sync::{ErrorReporter, Pending, PollSchedule, SyncError, pending, poll_until};
use crossbeam_channel::{Sender, unbounded};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::event::{CompletionTimeEvent, WriterId};
use crate::thread::{CompletionTimeState, CompletionTimeThread, SharedSlots, THREAD_NAME};

/// Timing knobs of the completion time service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionTimeConfig {
    /// Overall deadline for writer registration
    pub registration_timeout: Duration,
    /// Overall deadline for a blocking global completion time read
    pub read_timeout: Duration,
    /// Overall deadline for draining the queue on shutdown
    pub shutdown_timeout: Duration,
    /// Nap between polls of a pending reply
    pub poll_interval: Duration,
}

impl Default for CompletionTimeConfig {
    fn default() -> Self {
        Self {
            registration_timeout: Duration::from_secs(2),
            read_timeout: Duration::from_secs(2),
            shutdown_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Producer-side state shared by the service handle and every writer
#[derive(Debug)]
struct Producer {
    sender: Sender<CompletionTimeEvent>,
    error_reporter: Arc<ErrorReporter>,
    shutting_down: AtomicBool,
    write_event_count: AtomicU64,
}

impl Producer {
    fn send(&self, event: CompletionTimeEvent) -> CompletionTimeResult<()> {
        self.sender.send(event).map_err(|_| {
            if self.error_reporter.error_encountered() {
                CompletionTimeError::Reported(self.error_reporter.to_string())
            } else {
                CompletionTimeError::ChannelClosed
            }
        })
    }

    fn send_write(&self, event: CompletionTimeEvent) -> CompletionTimeResult<()> {
        self.write_event_count.fetch_add(1, Ordering::AcqRel);
        self.send(event)
    }
}

/// Handle of one registered local writer
///
/// Cheap to clone; all clones submit under the same writer id. Submitting
/// only enqueues, so it never blocks the calling handler.
#[derive(Debug, Clone)]
pub struct LocalCompletionTimeWriter {
    writer_id: WriterId,
    producer: Arc<Producer>,
}

impl LocalCompletionTimeWriter {
    pub fn id(&self) -> WriterId {
        self.writer_id
    }
}

impl CompletionTimeWriter for LocalCompletionTimeWriter {
    fn submit_initiated(&self, time: Time) -> CompletionTimeResult<()> {
        if self.producer.shutting_down.load(Ordering::Acquire) {
            return Err(CompletionTimeError::ShuttingDown);
        }
        self.producer.send_write(CompletionTimeEvent::WriteInitiated {
            writer_id: self.writer_id,
            time,
        })
    }

    fn submit_completed(&self, time: Time) -> CompletionTimeResult<()> {
        self.producer.send_write(CompletionTimeEvent::WriteCompleted {
            writer_id: self.writer_id,
            time,
        })
    }
}

/// Completion time service backed by one dedicated coordination thread
///
/// The thread owns every writer's outstanding initiated times and the peer
/// table. Callers only touch the event queue and a handful of atomics, so
/// reading the global completion time never takes a lock.
pub struct CompletionTimeService {
    producer: Arc<Producer>,
    slots: Arc<SharedSlots>,
    error_reporter: Arc<ErrorReporter>,
    config: CompletionTimeConfig,
    writers: Mutex<Vec<LocalCompletionTimeWriter>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl CompletionTimeService {
    /// Spawn the coordination thread. Only the peers named here may report
    /// external completion times.
    pub fn start(
        peer_ids: impl IntoIterator<Item = PeerId>,
        error_reporter: Arc<ErrorReporter>,
        config: CompletionTimeConfig,
    ) -> CompletionTimeResult<Self> {
        let (sender, receiver) = unbounded();
        let slots = Arc::new(SharedSlots::new());
        let coordination_thread = CompletionTimeThread::new(
            CompletionTimeState::new(peer_ids),
            receiver,
            Arc::clone(&slots),
            Arc::clone(&error_reporter),
        );

        let thread = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || coordination_thread.run())
            .map_err(|e| {
                CompletionTimeError::Protocol(format!("failed to spawn {THREAD_NAME}: {e}"))
            })?;

        Ok(Self {
            producer: Arc::new(Producer {
                sender,
                error_reporter: Arc::clone(&error_reporter),
                shutting_down: AtomicBool::new(false),
                write_event_count: AtomicU64::new(0),
            }),
            slots,
            error_reporter,
            config,
            writers: Mutex::new(Vec::new()),
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Register a new local writer, waiting for the coordination thread to
    /// assign its id
    pub fn register_writer(&self) -> CompletionTimeResult<LocalCompletionTimeWriter> {
        let (reply, pending) = pending();
        self.producer.send(CompletionTimeEvent::RegisterWriter { reply })?;

        let schedule =
            PollSchedule::new(self.config.poll_interval, self.config.registration_timeout);
        let writer_id = pending
            .wait(schedule, Some(&self.error_reporter))
            .map_err(|e| self.sync_error("registering local writer", e))?;

        let writer = LocalCompletionTimeWriter {
            writer_id,
            producer: Arc::clone(&self.producer),
        };
        self.writers.lock().push(writer.clone());
        Ok(writer)
    }

    /// Every writer registered through this service
    pub fn writers(&self) -> Vec<LocalCompletionTimeWriter> {
        self.writers.lock().clone()
    }

    /// Record the latest completion time reported by a peer driver
    pub fn submit_peer_completion_time(
        &self,
        peer_id: impl Into<PeerId>,
        time: Time,
    ) -> CompletionTimeResult<()> {
        self.producer.send_write(CompletionTimeEvent::WriteExternal {
            peer_id: peer_id.into(),
            time,
        })
    }

    /// Request the global completion time as of every event enqueued
    /// before this call
    pub fn global_completion_time_future(&self) -> CompletionTimeResult<Pending<Option<Time>>> {
        let (reply, pending) = pending();
        self.producer.send(CompletionTimeEvent::ReadGct { reply })?;
        Ok(pending)
    }

    /// Consistent read: wait for [`Self::global_completion_time_future`]
    /// within the configured read timeout
    pub fn wait_global_completion_time(&self) -> CompletionTimeResult<Option<Time>> {
        let schedule = PollSchedule::new(self.config.poll_interval, self.config.read_timeout);
        self.global_completion_time_future()?
            .wait(schedule, Some(&self.error_reporter))
            .map_err(|e| self.sync_error("reading global completion time", e))
    }

    /// Drain every write event enqueued so far, then stop the thread.
    /// A second call returns immediately.
    pub fn shutdown(&self) -> CompletionTimeResult<()> {
        if self.producer.shutting_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let expected_event_count = self.producer.write_event_count.load(Ordering::Acquire);
        log::info!(
            "Shutting down completion time service, expecting {} events",
            expected_event_count
        );
        self.producer.send(CompletionTimeEvent::Terminate {
            expected_event_count,
        })?;

        let schedule = PollSchedule::new(self.config.poll_interval, self.config.shutdown_timeout);
        poll_until(schedule, Some(&self.error_reporter), || {
            self.slots.shutdown_complete.load(Ordering::Acquire)
        })
        .map_err(|e| self.sync_error("shutting down", e))?;

        let handle = self.thread.lock().take();
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            return Err(CompletionTimeError::Protocol(format!("{THREAD_NAME} panicked")));
        }
        Ok(())
    }

    pub fn is_shutdown_complete(&self) -> bool {
        self.slots.shutdown_complete.load(Ordering::Acquire)
    }

    fn sync_error(&self, context: &str, error: SyncError) -> CompletionTimeError {
        match error {
            SyncError::Timeout(waited) => {
                CompletionTimeError::Timeout(format!("{context} took longer than {waited:?}"))
            }
            SyncError::Closed => CompletionTimeError::ChannelClosed,
            SyncError::Reported(errors) => CompletionTimeError::Reported(errors),
        }
    }
}

impl GlobalCompletionTimeReader for CompletionTimeService {
    /// Last published snapshot; may lag events still in the queue
    fn global_completion_time(&self) -> Option<Time> {
        self.slots.load_gct()
    }
}

impl Drop for CompletionTimeService {
    fn drop(&mut self) {
        // Writers may outlive the service and keep the queue open
        if !self.producer.shutting_down.swap(true, Ordering::AcqRel) {
            let expected_event_count = self.producer.write_event_count.load(Ordering::Acquire);
            let _ = self.producer.send(CompletionTimeEvent::Terminate {
                expected_event_count,
            });
        }
    }
}

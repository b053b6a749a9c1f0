use cadence_core::{PeerId, Time};
use cadence_sync::ErrorReporter;
use crossbeam_channel::Receiver;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::event::{CompletionTimeEvent, WriterId};
use crate::writer_state::WriterState;

/// Value of the published slot while the global completion time is unknown.
/// Shares its bits with `Time::MAX`, which is therefore never published as is.
pub(crate) const GCT_UNKNOWN: u64 = u64::MAX;

pub(crate) const THREAD_NAME: &str = "completion-time-service";

/// Coordination state; touched only by the coordination thread
#[derive(Debug, Default)]
pub struct CompletionTimeState {
    writers: Vec<WriterState>,
    peers: HashMap<PeerId, Option<Time>>,
}

impl CompletionTimeState {
    pub fn new(peer_ids: impl IntoIterator<Item = PeerId>) -> Self {
        Self {
            writers: Vec::new(),
            peers: peer_ids.into_iter().map(|id| (id, None)).collect(),
        }
    }

    pub fn register_writer(&mut self) -> WriterId {
        self.writers.push(WriterState::new());
        (self.writers.len() - 1) as WriterId
    }

    pub fn initiated(&mut self, writer_id: WriterId, time: Time) -> Result<(), String> {
        self.writer_mut(writer_id)?.initiated(time)
    }

    pub fn completed(&mut self, writer_id: WriterId, time: Time) -> Result<(), String> {
        self.writer_mut(writer_id)?.completed(time)
    }

    pub fn external(&mut self, peer_id: &str, time: Time) -> Result<(), String> {
        let Some(slot) = self.peers.get_mut(peer_id) else {
            return Err(format!("unknown peer {peer_id}"));
        };
        if let Some(previous) = *slot
            && time < previous
        {
            return Err(format!(
                "peer {peer_id} completion time regressed from {previous} to {time}"
            ));
        }
        *slot = Some(time);
        Ok(())
    }

    /// Minimum over every writer's and every peer's completion time.
    /// `None` while any of them is unknown, or when there is nothing to
    /// take the minimum of.
    pub fn global_completion_time(&self) -> Option<Time> {
        let writer_times = self.writers.iter().map(WriterState::completion_time);
        let peer_times = self.peers.values().copied();

        let mut gct: Option<Time> = None;
        for time in writer_times.chain(peer_times) {
            let time = time?;
            gct = Some(gct.map_or(time, |current| current.min(time)));
        }
        gct
    }

    fn writer_mut(&mut self, writer_id: WriterId) -> Result<&mut WriterState, String> {
        self.writers
            .get_mut(writer_id as usize)
            .ok_or_else(|| format!("unknown writer {writer_id}"))
    }
}

/// Cross-thread slots shared between the service handle and its thread
#[derive(Debug)]
pub(crate) struct SharedSlots {
    pub gct: AtomicU64,
    pub shutdown_complete: AtomicBool,
}

impl SharedSlots {
    pub fn new() -> Self {
        Self {
            gct: AtomicU64::new(GCT_UNKNOWN),
            shutdown_complete: AtomicBool::new(false),
        }
    }

    pub fn load_gct(&self) -> Option<Time> {
        match self.gct.load(Ordering::Acquire) {
            GCT_UNKNOWN => None,
            nanos => Some(Time::from_nano(nanos)),
        }
    }

    /// A known `Time::MAX` is published one nanosecond early; reading the
    /// completion time low only holds dependents back.
    fn publish_gct(&self, gct: Option<Time>) {
        let raw = gct.map_or(GCT_UNKNOWN, |time| time.as_nano().min(GCT_UNKNOWN - 1));
        self.gct.store(raw, Ordering::Release);
    }
}

/// The single consumer of the completion time event queue
pub(crate) struct CompletionTimeThread {
    state: CompletionTimeState,
    receiver: Receiver<CompletionTimeEvent>,
    slots: Arc<SharedSlots>,
    error_reporter: Arc<ErrorReporter>,
    processed_event_count: u64,
    expected_event_count: Option<u64>,
}

impl CompletionTimeThread {
    pub fn new(
        state: CompletionTimeState,
        receiver: Receiver<CompletionTimeEvent>,
        slots: Arc<SharedSlots>,
        error_reporter: Arc<ErrorReporter>,
    ) -> Self {
        Self {
            state,
            receiver,
            slots,
            error_reporter,
            processed_event_count: 0,
            expected_event_count: None,
        }
    }

    /// Main event loop - processes events sequentially until the
    /// termination count is reached or a protocol violation stops it
    pub fn run(mut self) {
        log::info!("Completion time service started");

        while !self.drained() {
            let event = match self.receiver.recv() {
                Ok(event) => event,
                Err(_) => {
                    log::info!("Completion time event queue closed");
                    return;
                }
            };
            if let Err(message) = self.process_event(event) {
                self.error_reporter.report(THREAD_NAME, message);
                return;
            }
        }

        self.slots.shutdown_complete.store(true, Ordering::Release);
        log::info!(
            "Completion time service shutdown complete after {} events",
            self.processed_event_count
        );
    }

    fn drained(&self) -> bool {
        self.expected_event_count
            .is_some_and(|expected| self.processed_event_count >= expected)
    }

    fn process_event(&mut self, event: CompletionTimeEvent) -> Result<(), String> {
        if event.is_write() {
            self.processed_event_count += 1;
        }

        match event {
            CompletionTimeEvent::RegisterWriter { reply } => {
                let writer_id = self.state.register_writer();
                log::debug!("Registered local writer {}", writer_id);
                self.publish();
                reply.resolve(writer_id);
            }
            CompletionTimeEvent::WriteInitiated { writer_id, time } => {
                self.state.initiated(writer_id, time)?;
                self.publish();
            }
            CompletionTimeEvent::WriteCompleted { writer_id, time } => {
                self.state.completed(writer_id, time)?;
                self.publish();
            }
            CompletionTimeEvent::WriteExternal { peer_id, time } => {
                self.state.external(&peer_id, time)?;
                self.publish();
            }
            CompletionTimeEvent::ReadGct { reply } => {
                reply.resolve(self.state.global_completion_time());
            }
            CompletionTimeEvent::Terminate {
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

    fn publish(&self) {
        self.slots.publish_gct(self.state.global_completion_time());
    }
}

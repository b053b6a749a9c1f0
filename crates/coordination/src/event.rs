use cadence_core::{PeerId, Time};
use cadence_sync::Resolver;

/// Identifier assigned to a local writer at registration
pub type WriterId = u32;

/// Requests consumed by the completion time thread
///
/// Every variant is produced on some caller thread and consumed exactly
/// once, in queue order, by the coordination thread.
#[derive(Debug)]
pub enum CompletionTimeEvent {
    /// Register a new local writer and reply with its id
    RegisterWriter { reply: Resolver<WriterId> },

    /// An operation scheduled at `time` has been handed out
    WriteInitiated { writer_id: WriterId, time: Time },

    /// The operation scheduled at `time` has finished
    WriteCompleted { writer_id: WriterId, time: Time },

    /// A peer driver reported its completion time
    WriteExternal { peer_id: PeerId, time: Time },

    /// Reply with the global completion time as of this point in the queue
    ReadGct { reply: Resolver<Option<Time>> },

    /// Stop once `expected_event_count` write events have been processed
    Terminate { expected_event_count: u64 },
}

impl CompletionTimeEvent {
    /// Whether the event counts towards the termination total
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            CompletionTimeEvent::WriteInitiated { .. }
                | CompletionTimeEvent::WriteCompleted { .. }
                | CompletionTimeEvent::WriteExternal { .. }
        )
    }
}

//! Cadence Coordination
//!
//! Completion time service. One dedicated thread owns every local writer's
//! outstanding initiated times plus the latest completion time reported by
//! each peer driver, and publishes the global completion time (GCT) after
//! every change.
//!
//! ```text
//! handlers ──WriteInitiated/WriteCompleted──┐
//! peers ─────WriteExternal──────────────────┼──▶ queue ──▶ completion-time-service
//! callers ───RegisterWriter/ReadGct─────────┘                     │
//!                                                        GCT atomic slot
//! ```

mod event;
mod service;
mod thread;
mod writer_state;

pub use event::{CompletionTimeEvent, WriterId};
pub use service::{CompletionTimeConfig, CompletionTimeService, LocalCompletionTimeWriter};
pub use thread::CompletionTimeState;
pub use writer_state::WriterState;

pub use cadence_ports::{
    CompletionTimeError, CompletionTimeResult, CompletionTimeWriter, GlobalCompletionTimeReader,
};

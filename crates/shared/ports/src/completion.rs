use cadence_core::Time;

use crate::error::CompletionTimeResult;

/// Port through which one logical local writer reports operation progress
pub trait CompletionTimeWriter: Send + Sync {
    /// An operation scheduled at `time` has been handed out for execution
    fn submit_initiated(&self, time: Time) -> CompletionTimeResult<()>;

    /// The operation scheduled at `time` has finished
    fn submit_completed(&self, time: Time) -> CompletionTimeResult<()>;
}

/// Port for reading the global completion time
pub trait GlobalCompletionTimeReader: Send + Sync {
    /// Latest published global completion time, `None` while unknown
    fn global_completion_time(&self) -> Option<Time>;
}

use cadence_core::OperationResult;
use cadence_sync::Resolver;

use crate::manager::{ResultsSnapshot, WorkloadStatus};

/// Requests consumed by the metrics thread, in queue order
#[derive(Debug)]
pub enum MetricsCollectionEvent {
    SubmitResult(Box<OperationResult>),

    Status { reply: Resolver<WorkloadStatus> },

    Snapshot { reply: Resolver<ResultsSnapshot> },

    /// Stop once `expected_event_count` results have been processed
    Terminate { expected_event_count: u64 },
}

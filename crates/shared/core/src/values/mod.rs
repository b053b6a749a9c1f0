mod time;

pub use time::{Time, as_milli, duration_from_milli};

/// Identifier of a cooperating peer driver instance
pub type PeerId = String;

/// Identifier of an operation within one workload
pub type OperationId = u64;

use cadence_core::Operation;
use std::time::Duration;

/// Port for deciding what happens to operations that start late
///
/// An operation is late when its actual start exceeds
/// `scheduled_start + tolerated_delay()`.
pub trait ExecutionDelayPolicy: Send + Sync {
    /// Lateness that is accepted without consulting the policy
    fn tolerated_delay(&self) -> Duration;

    /// Called for a late operation. Returns whether the operation should
    /// still run and have its metrics recorded.
    fn handle_excessive_delay(&self, operation: &Operation) -> bool;
}

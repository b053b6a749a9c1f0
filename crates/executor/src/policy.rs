//! Execution Delay Policies
//!
//! Decide what happens to operations whose actual start exceeds
//! `scheduled_start + tolerated_delay`.

use cadence_core::Operation;
use cadence_ports::ExecutionDelayPolicy;
use cadence_sync::ErrorReporter;
use std::sync::Arc;
use std::time::Duration;

/// Accepts every late operation silently
#[derive(Debug, Clone, Copy)]
pub struct PermissiveDelayPolicy {
    tolerated_delay: Duration,
}

impl PermissiveDelayPolicy {
    pub fn new(tolerated_delay: Duration) -> Self {
        Self { tolerated_delay }
    }
}

impl ExecutionDelayPolicy for PermissiveDelayPolicy {
    fn tolerated_delay(&self) -> Duration {
        self.tolerated_delay
    }

    fn handle_excessive_delay(&self, _operation: &Operation) -> bool {
        true
    }
}

/// Accepts late operations but warns about each one
#[derive(Debug, Clone, Copy)]
pub struct LoggingDelayPolicy {
    tolerated_delay: Duration,
}

impl LoggingDelayPolicy {
    pub fn new(tolerated_delay: Duration) -> Self {
        Self { tolerated_delay }
    }
}

impl ExecutionDelayPolicy for LoggingDelayPolicy {
    fn tolerated_delay(&self) -> Duration {
        self.tolerated_delay
    }

    fn handle_excessive_delay(&self, operation: &Operation) -> bool {
        log::warn!(
            "Operation {} ({}) exceeded tolerated start delay of {:?}",
            operation.id,
            operation.kind,
            self.tolerated_delay
        );
        true
    }
}

/// Rejects late operations, optionally reporting each as an error
#[derive(Debug, Clone)]
pub struct StrictDelayPolicy {
    tolerated_delay: Duration,
    error_reporter: Option<Arc<ErrorReporter>>,
}

impl StrictDelayPolicy {
    pub fn new(tolerated_delay: Duration) -> Self {
        Self {
            tolerated_delay,
            error_reporter: None,
        }
    }

    /// Report every rejection, which makes polling callers fail fast
    pub fn reporting_to(mut self, error_reporter: Arc<ErrorReporter>) -> Self {
        self.error_reporter = Some(error_reporter);
        self
    }
}

impl ExecutionDelayPolicy for StrictDelayPolicy {
    fn tolerated_delay(&self) -> Duration {
        self.tolerated_delay
    }

    fn handle_excessive_delay(&self, operation: &Operation) -> bool {
        let message = format!(
            "Operation {} ({}) scheduled at {} exceeded tolerated start delay of {:?}",
            operation.id, operation.kind, operation.scheduled_start, self.tolerated_delay
        );
        match &self.error_reporter {
            Some(reporter) => reporter.report("delay-policy", message),
            None => log::error!("{}", message),
        }
        false
    }
}

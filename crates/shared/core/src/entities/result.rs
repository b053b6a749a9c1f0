use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::Operation;
use crate::values::Time;

/// Outcome of executing an [`Operation`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub operation: Operation,
    pub actual_start: Time,
    pub run_duration: Duration,
    /// Status code reported by the executing body; 0 means success
    pub result_code: i32,
    pub value: Value,
    /// The delay policy already accepted a late start for this operation
    #[serde(default)]
    pub late_start_accepted: bool,
}

impl OperationResult {
    /// How late the operation started relative to its schedule
    pub fn start_delay(&self) -> Duration {
        self.actual_start
            .duration_since(self.operation.scheduled_start)
    }

    /// Whether the start exceeded `scheduled_start + tolerated_delay`
    pub fn started_too_late(&self, tolerated_delay: Duration) -> bool {
        self.operation.scheduled_start.plus(tolerated_delay) < self.actual_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(scheduled_ms: u64, actual_ms: u64) -> OperationResult {
        OperationResult {
            operation: Operation::new(1, "read", Time::from_milli(scheduled_ms)),
            actual_start: Time::from_milli(actual_ms),
            run_duration: Duration::from_millis(3),
            result_code: 0,
            value: Value::Null,
            late_start_accepted: false,
        }
    }

    #[test]
    fn test_start_delay() {
        assert_eq!(result(100, 130).start_delay(), Duration::from_millis(30));
        // Early starts count as zero delay
        assert_eq!(result(100, 90).start_delay(), Duration::ZERO);
    }

    #[test]
    fn test_started_too_late_boundary() {
        let tolerated = Duration::from_millis(50);
        assert!(!result(100, 150).started_too_late(tolerated));
        assert!(result(100, 151).started_too_late(tolerated));
    }
}

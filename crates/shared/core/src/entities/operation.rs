use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::values::{OperationId, Time};

/// A unit of benchmark work
///
/// Operations are produced by a generator, consumed once by a handler and
/// then discarded. `kind` names the operation type (used as the metrics
/// aggregation key); `params` carries whatever the executing body needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub kind: String,
    /// Earliest time at which the operation may start
    pub scheduled_start: Time,
    /// The global completion time must reach this value before the
    /// operation may start
    #[serde(default)]
    pub dependency_time: Option<Time>,
    #[serde(default)]
    pub params: Value,
}

impl Operation {
    pub fn new(id: OperationId, kind: impl Into<String>, scheduled_start: Time) -> Self {
        Self {
            id,
            kind: kind.into(),
            scheduled_start,
            dependency_time: None,
            params: Value::Null,
        }
    }

    /// Require the global completion time to reach `time` first
    pub fn with_dependency(mut self, time: Time) -> Self {
        self.dependency_time = Some(time);
        self
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    /// String parameter lookup, `None` when missing or not a string
    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let op = Operation::new(7, "read", Time::from_milli(100))
            .with_dependency(Time::from_milli(50))
            .with_params(json!({"table": "person", "key": "p1"}));

        assert_eq!(op.id, 7);
        assert_eq!(op.kind, "read");
        assert_eq!(op.dependency_time, Some(Time::from_milli(50)));
        assert_eq!(op.param_str("table"), Some("person"));
        assert_eq!(op.param_str("missing"), None);
    }

    #[test]
    fn test_deserialize_defaults() {
        let op: Operation =
            serde_json::from_str(r#"{"id":1,"kind":"scan","scheduled_start":5000000}"#).unwrap();
        assert_eq!(op.scheduled_start, Time::from_milli(5));
        assert_eq!(op.dependency_time, None);
        assert_eq!(op.params, Value::Null);
    }
}

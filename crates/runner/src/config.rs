//! Driver configuration
//!
//! Loaded from JSON. Every field has a default, so a config file only needs
//! to name what it changes:
//!
//! ```json
//! {
//!   "thread_count": 8,
//!   "tolerated_delay_ms": 250,
//!   "delay_policy": "strict",
//!   "results_log": "results.csv"
//! }
//! ```

use cadence_coordination::CompletionTimeConfig;
use cadence_core::PeerId;
use cadence_executor::{LoggingDelayPolicy, PermissiveDelayPolicy, SpinnerConfig, StrictDelayPolicy};
use cadence_metrics::MetricsConfig;
use cadence_ports::ExecutionDelayPolicy;
use cadence_sync::ErrorReporter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::error::ConfigError;

/// What to do with operations that start later than tolerated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayPolicyKind {
    /// Run them anyway
    Permissive,
    /// Run them anyway, with a warning
    #[default]
    Logging,
    /// Fail them and report an error
    Strict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Handler pool size, also the number of local completion time writers
    pub thread_count: usize,

    /// Peer driver instances whose completion times gate this one
    pub peer_ids: Vec<PeerId>,

    pub tolerated_delay_ms: u64,

    pub delay_policy: DelayPolicyKind,

    /// Consult the delay policy before recording late results
    pub record_start_delay: bool,

    pub spinner_sleep_ms: u64,

    pub poll_interval_ms: u64,

    pub registration_timeout_ms: u64,

    pub shutdown_timeout_ms: u64,

    /// Per-operation results log, one delimited row per result
    pub results_log: Option<PathBuf>,

    pub results_log_delimiter: String,

    /// Final results snapshot as JSON
    pub results_json: Option<PathBuf>,

    /// Handlers in flight before the driver waits for one to finish
    pub max_in_flight_operations: usize,

    /// Stop the run at the first failed operation
    pub abort_on_failure: bool,

    /// Status logging interval, 0 disables it
    pub status_interval_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            thread_count: 4,
            peer_ids: Vec::new(),
            tolerated_delay_ms: 100,
            delay_policy: DelayPolicyKind::default(),
            record_start_delay: true,
            spinner_sleep_ms: 1,
            poll_interval_ms: 100,
            registration_timeout_ms: 2_000,
            shutdown_timeout_ms: 5_000,
            results_log: None,
            results_log_delimiter: "|".to_string(),
            results_json: None,
            max_in_flight_operations: 1_000,
            abort_on_failure: true,
            status_interval_ms: 0,
        }
    }
}

impl DriverConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_json(&content)
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thread_count == 0 {
            return Err(ConfigError::Invalid(
                "thread_count must be at least 1".to_string(),
            ));
        }
        if self.max_in_flight_operations < self.thread_count {
            return Err(ConfigError::Invalid(format!(
                "max_in_flight_operations ({}) must be at least thread_count ({})",
                self.max_in_flight_operations, self.thread_count
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.results_log_delimiter.is_empty() {
            return Err(ConfigError::Invalid(
                "results_log_delimiter must not be empty".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        if let Some(duplicate) = self.peer_ids.iter().find(|peer| !seen.insert(*peer)) {
            return Err(ConfigError::Invalid(format!(
                "peer '{}' declared more than once",
                duplicate
            )));
        }
        Ok(())
    }

    pub fn tolerated_delay(&self) -> Duration {
        Duration::from_millis(self.tolerated_delay_ms)
    }

    pub fn status_interval(&self) -> Option<Duration> {
        (self.status_interval_ms > 0).then(|| Duration::from_millis(self.status_interval_ms))
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn completion_time_config(&self) -> CompletionTimeConfig {
        CompletionTimeConfig {
            registration_timeout: Duration::from_millis(self.registration_timeout_ms),
            shutdown_timeout: self.shutdown_timeout(),
            poll_interval: self.poll_interval(),
            ..Default::default()
        }
    }

    pub fn metrics_config(&self) -> MetricsConfig {
        MetricsConfig {
            record_start_delay: self.record_start_delay,
            shutdown_timeout: self.shutdown_timeout(),
            poll_interval: self.poll_interval(),
            ..Default::default()
        }
    }

    pub fn spinner_config(&self) -> SpinnerConfig {
        SpinnerConfig {
            sleep_duration: Duration::from_millis(self.spinner_sleep_ms),
        }
    }

    /// Build the configured policy; strict rejections go to `error_reporter`
    pub fn delay_policy(&self, error_reporter: &Arc<ErrorReporter>) -> Arc<dyn ExecutionDelayPolicy> {
        let tolerated = self.tolerated_delay();
        match self.delay_policy {
            DelayPolicyKind::Permissive => Arc::new(PermissiveDelayPolicy::new(tolerated)),
            DelayPolicyKind::Logging => Arc::new(LoggingDelayPolicy::new(tolerated)),
            DelayPolicyKind::Strict => Arc::new(
                StrictDelayPolicy::new(tolerated).reporting_to(Arc::clone(error_reporter)),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{Operation, Time};

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let config = DriverConfig::from_json(r#"{"thread_count": 8, "delay_policy": "strict"}"#)
            .unwrap();

        assert_eq!(config.thread_count, 8);
        assert_eq!(config.delay_policy, DelayPolicyKind::Strict);
        assert_eq!(config.tolerated_delay_ms, 100);
        assert_eq!(config.results_log_delimiter, "|");
        assert!(config.abort_on_failure);
        assert_eq!(config.status_interval(), None);
        config.validate().unwrap();
    }

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(DriverConfig::from_json("{}").unwrap(), DriverConfig::default());
    }

    #[test]
    fn test_validation_rejects_zero_threads() {
        let config = DriverConfig {
            thread_count: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(msg)) if msg.contains("thread_count")));
    }

    #[test]
    fn test_validation_rejects_duplicate_peers() {
        let config = DriverConfig {
            peer_ids: vec!["a".into(), "b".into(), "a".into()],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(msg)) if msg.contains("'a'")));
    }

    #[test]
    fn test_parse_and_io_errors() {
        assert!(matches!(
            DriverConfig::from_json(r#"{"thread_count": "many"}"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            DriverConfig::from_file("/definitely/not/here.json"),
            Err(ConfigError::Io { path, .. }) if path == "/definitely/not/here.json"
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("driver.json");
        std::fs::write(&path, r#"{"peer_ids": ["peer-1"], "spinner_sleep_ms": 0}"#).unwrap();

        let config = DriverConfig::from_file(&path).unwrap();
        assert_eq!(config.peer_ids, vec!["peer-1".to_string()]);
        assert_eq!(config.spinner_config().sleep_duration, Duration::ZERO);
    }

    #[test]
    fn test_strict_policy_reports_rejections() {
        let reporter = ErrorReporter::new();
        let config = DriverConfig {
            delay_policy: DelayPolicyKind::Strict,
            ..Default::default()
        };
        let policy = config.delay_policy(&reporter);

        assert_eq!(policy.tolerated_delay(), Duration::from_millis(100));
        assert!(!policy.handle_excessive_delay(&Operation::new(1, "read", Time::from_milli(0))));
        assert!(reporter.error_encountered());
    }
}

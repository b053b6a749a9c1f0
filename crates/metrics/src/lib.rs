//! Cadence Metrics
//!
//! Metrics service: one dedicated thread folds operation results into
//! per-kind run time and start delay statistics. Results, status requests
//! and snapshot requests share one queue, so a snapshot observes every
//! result submitted before it.

mod error;
mod event;
mod manager;
mod results_log;
mod service;
pub mod stats;
mod thread;

pub use error::{MetricsError, Result};
pub use event::MetricsCollectionEvent;
pub use manager::{MetricsManager, OperationMetricsSnapshot, ResultsSnapshot, WorkloadStatus};
pub use results_log::{CsvResultsLog, RESULTS_LOG_HEADER, ResultsLog, ResultsLogRow};
pub use service::{MetricsConfig, MetricsService};
pub use stats::{DurationRecorder, DurationSummary};

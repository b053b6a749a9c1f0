use cadence_coordination::CompletionTimeError;
use cadence_core::{OperationId, Time};
use cadence_executor::ExecutionError;
use cadence_metrics::MetricsError;
use thiserror::Error;

/// Errors raised while turning rows into events
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodingError {
    #[error("No decoder found that matches this row\nROW: {row:?}\nDECODER KEY: {key}")]
    NoDecoder { row: Vec<String>, key: String },

    #[error("Invalid row {row:?}: {reason}")]
    InvalidRow { row: Vec<String>, reason: String },

    #[error("Failed to read rows: {0}")]
    Io(String),
}

/// Errors raised while loading or validating driver configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum DriverError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    CompletionTime(#[from] CompletionTimeError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Decoding(#[from] DecodingError),

    #[error("Operation {operation_id} scheduled at {scheduled_start} arrived after one scheduled at {previous}")]
    OutOfOrder {
        operation_id: OperationId,
        scheduled_start: Time,
        previous: Time,
    },

    #[error("Run aborted after {failed_operations} failed operation(s):\n{errors}")]
    Aborted {
        failed_operations: u64,
        errors: String,
    },

    #[error("Failed to start {0} thread: {1}")]
    Thread(&'static str, String),
}

pub type Result<T> = std::result::Result<T, DriverError>;

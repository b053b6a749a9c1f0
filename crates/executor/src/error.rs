use cadence_core::OperationId;
use cadence_ports::CompletionTimeError;
use std::time::Duration;
use thiserror::Error;

/// Error raised by an operation body
///
/// Carries the body's own message and status code unchanged, so whoever
/// takes the handler's result sees the original failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (code {result_code})")]
pub struct ExecutionFailure {
    pub message: String,
    pub result_code: i32,
}

impl ExecutionFailure {
    pub fn new(message: impl Into<String>, result_code: i32) -> Self {
        Self {
            message: message.into(),
            result_code,
        }
    }
}

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Operation {operation_id} failed: {source}")]
    Failure {
        operation_id: OperationId,
        #[source]
        source: ExecutionFailure,
    },

    #[error("Operation {operation_id} was interrupted")]
    Interrupted { operation_id: OperationId },

    #[error("Operation {operation_id} started {delay:?} late and was rejected by the delay policy")]
    ExcessiveDelay {
        operation_id: OperationId,
        delay: Duration,
    },

    #[error("Operation {operation_id} could not report completion time: {source}")]
    CompletionTime {
        operation_id: OperationId,
        #[source]
        source: CompletionTimeError,
    },

    #[error("Handler for operation {operation_id} panicked: {message}")]
    Panicked {
        operation_id: OperationId,
        message: String,
    },

    #[error("Handler executor is shut down")]
    ShutDown,

    #[error("Failed to start handler runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl ExecutionError {
    /// Operation the error belongs to, when there is one
    pub fn operation_id(&self) -> Option<OperationId> {
        match self {
            ExecutionError::Failure { operation_id, .. }
            | ExecutionError::Interrupted { operation_id }
            | ExecutionError::ExcessiveDelay { operation_id, .. }
            | ExecutionError::CompletionTime { operation_id, .. }
            | ExecutionError::Panicked { operation_id, .. } => Some(*operation_id),
            ExecutionError::ShutDown | ExecutionError::Runtime(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExecutionError>;

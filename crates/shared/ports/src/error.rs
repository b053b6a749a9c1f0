use thiserror::Error;

/// Errors raised by completion-time coordination
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionTimeError {
    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Protocol violation: {0}")]
    Protocol(String),

    #[error("Can not submit initiated time after calling shutdown")]
    ShuttingDown,

    #[error("Coordination failed with reported errors:\n{0}")]
    Reported(String),

    #[error("Completion time service channel closed")]
    ChannelClosed,
}

pub type CompletionTimeResult<T> = std::result::Result<T, CompletionTimeError>;

/// Errors raised by a database binding
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DbError {
    #[error("Record not found: {table}/{key}")]
    NotFound { table: String, key: String },

    #[error("Record already exists: {table}/{key}")]
    AlreadyExists { table: String, key: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Database failure: {0}")]
    Failure(String),
}

impl DbError {
    /// Status code for result logs; never 0
    pub fn code(&self) -> i32 {
        match self {
            DbError::NotFound { .. } => 1,
            DbError::AlreadyExists { .. } => 2,
            DbError::InvalidRequest(_) => 3,
            DbError::Failure(_) => -1,
        }
    }
}

pub type DbResult<T> = std::result::Result<T, DbError>;

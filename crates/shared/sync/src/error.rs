use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("No value within {0:?}")]
    Timeout(Duration),

    #[error("Resolver dropped before setting a value")]
    Closed,

    #[error("Gave up after errors were reported:\n{0}")]
    Reported(String),
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;

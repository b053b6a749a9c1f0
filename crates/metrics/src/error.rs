use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Protocol violation: {0}")]
    Protocol(String),

    #[error("Failed to fold result: {0}")]
    Fold(String),

    #[error("Can not submit results after calling shutdown")]
    ShuttingDown,

    #[error("Metrics collection failed with reported errors:\n{0}")]
    Reported(String),

    #[error("Metrics service channel closed")]
    ChannelClosed,

    #[error("Export error: {0}")]
    Export(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MetricsError>;

//! Shared error type across ratemeter crates.

use thiserror::Error;

/// Stable error categories (branch on these instead of message text).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or unreadable configuration.
    Config,
    /// Instance identity could not be resolved.
    Identity,
    /// Metrics sink could not be constructed.
    SinkInit,
    /// Internal invariant broken.
    Internal,
}

impl ErrorKind {
    /// String representation used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Config => "CONFIG",
            ErrorKind::Identity => "IDENTITY",
            ErrorKind::SinkInit => "SINK_INIT",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, RateMeterError>;

/// Unified error type used by core and the HTTP layer.
#[derive(Debug, Error)]
pub enum RateMeterError {
    #[error("config: {0}")]
    Config(String),
    #[error("identity: {0}")]
    Identity(String),
    #[error("sink init: {0}")]
    SinkInit(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl RateMeterError {
    /// Map the error to its stable category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RateMeterError::Config(_) => ErrorKind::Config,
            RateMeterError::Identity(_) => ErrorKind::Identity,
            RateMeterError::SinkInit(_) => ErrorKind::SinkInit,
            RateMeterError::Internal(_) => ErrorKind::Internal,
        }
    }
}

//! Shared error type across roomwire crates.

use thiserror::Error;

/// Shared result type.
pub type Result<T> = std::result::Result<T, ChannelError>;

/// Unified error type used by core and client.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The socket neither opened nor errored within the connect timeout.
    #[error("connect timed out")]
    ConnectionTimeout,
    /// Transport-level failure reported while dialing or on the wire.
    #[error("connection failed: {0}")]
    ConnectionError(String),
    /// Frame was not valid JSON, or had no `type` field, or its payload did
    /// not match the declared type.
    #[error("malformed message: {0}")]
    MalformedMessage(String),
    /// Valid envelope with a `type` neither end of this channel recognizes.
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),
    /// Terminal: automatic reconnection gave up. Caller intervention required.
    #[error("max reconnect attempts exceeded")]
    MaxReconnectAttemptsExceeded,
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl ChannelError {
    /// Stable string code for structured logs and UI surfaces.
    pub fn kind(&self) -> &'static str {
        match self {
            ChannelError::ConnectionTimeout => "CONNECTION_TIMEOUT",
            ChannelError::ConnectionError(_) => "CONNECTION_ERROR",
            ChannelError::MalformedMessage(_) => "MALFORMED_MESSAGE",
            ChannelError::UnknownMessageType(_) => "UNKNOWN_MESSAGE_TYPE",
            ChannelError::MaxReconnectAttemptsExceeded => "MAX_RECONNECT_ATTEMPTS",
            ChannelError::BadConfig(_) => "BAD_CONFIG",
            ChannelError::Internal(_) => "INTERNAL",
        }
    }
}

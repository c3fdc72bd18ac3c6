//! Error types for the remote streams.

use cirrus_protocol::{Code, Status};
use thiserror::Error;

/// Result type for stream operations.
pub type StreamResult<T> = Result<T, StreamError>;

/// Reasons a stream closed or a transport call failed.
///
/// Contract violations are not represented here; they abort instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether restarting the stream can help.
        retryable: bool,
    },

    /// The server closed the stream with a status.
    #[error("server closed stream: {0}")]
    Server(Status),

    /// The connector could not establish a channel.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// The server sent a frame that does not belong on this stream.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The task driving the stream has exited.
    #[error("stream driver shut down")]
    Shutdown,
}

impl StreamError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a server error from a code and message.
    pub fn server(code: Code, message: impl Into<String>) -> Self {
        Self::Server(Status::new(code, message))
    }

    /// Returns true if restarting the stream may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamError::Transport { retryable, .. } => *retryable,
            StreamError::Server(status) => !status.code.is_permanent(),
            StreamError::ConnectFailed(_) => true,
            StreamError::Protocol(_) | StreamError::Shutdown => false,
        }
    }

    /// Returns true if the server rejected the credentials. Callers should
    /// refresh the token before restarting.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, StreamError::Server(status) if status.code == Code::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(StreamError::transport_retryable("connection reset").is_retryable());
        assert!(!StreamError::transport_fatal("bad certificate").is_retryable());
        assert!(StreamError::server(Code::Unavailable, "try later").is_retryable());
        assert!(!StreamError::server(Code::PermissionDenied, "nope").is_retryable());
        assert!(StreamError::ConnectFailed("refused".into()).is_retryable());
        assert!(!StreamError::Shutdown.is_retryable());
    }

    #[test]
    fn unauthenticated_is_a_server_status() {
        let err = StreamError::server(Code::Unauthenticated, "token expired");
        assert!(err.is_unauthenticated());
        assert!(err.is_retryable());
        assert!(!StreamError::server(Code::PermissionDenied, "nope").is_unauthenticated());
        assert!(!StreamError::transport_retryable("reset").is_unauthenticated());
    }

    #[test]
    fn error_display() {
        let err = StreamError::server(Code::Internal, "boom");
        assert_eq!(err.to_string(), "server closed stream: Internal: boom");
        assert_eq!(StreamError::Shutdown.to_string(), "stream driver shut down");
    }
}

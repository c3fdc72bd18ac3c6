//! Server status codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical status codes used by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Code {
    /// Not an error.
    Ok,
    /// The operation was cancelled.
    Cancelled,
    /// Unknown error.
    Unknown,
    /// The client specified an invalid argument.
    InvalidArgument,
    /// Deadline expired before the operation completed.
    DeadlineExceeded,
    /// A requested document was not found.
    NotFound,
    /// A document the client tried to create already exists.
    AlreadyExists,
    /// The caller lacks permission.
    PermissionDenied,
    /// Some resource has been exhausted (quota, rate limit).
    ResourceExhausted,
    /// The system is not in a state required for the operation.
    FailedPrecondition,
    /// The operation was aborted, typically due to contention.
    Aborted,
    /// Operation attempted past the valid range.
    OutOfRange,
    /// Operation not implemented or supported.
    Unimplemented,
    /// Internal server error.
    Internal,
    /// The service is currently unavailable.
    Unavailable,
    /// Unrecoverable data loss.
    DataLoss,
    /// Missing or invalid credentials.
    Unauthenticated,
}

impl Code {
    /// Returns true if retrying the same request can never succeed.
    pub fn is_permanent(&self) -> bool {
        !matches!(
            self,
            Code::Ok
                | Code::Cancelled
                | Code::Unknown
                | Code::DeadlineExceeded
                | Code::ResourceExhausted
                | Code::Internal
                | Code::Unavailable
                | Code::Unauthenticated
        )
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A status with code and message, carried as the cause of a target change
/// or as the reason a stream was closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Status code.
    pub code: Code,
    /// Human-readable detail.
    pub message: String,
}

impl Status {
    /// Creates a status.
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

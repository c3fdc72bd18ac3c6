//! Error types for the document model.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while constructing model values from untrusted input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A document path did not name a document.
    #[error("invalid document path {path:?}: {reason}")]
    InvalidDocumentPath {
        /// The offending path.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A field path was empty or contained an empty segment.
    #[error("invalid field path {path:?}")]
    InvalidFieldPath {
        /// The offending path.
        path: String,
    },

    /// Timestamp nanoseconds outside `0..1_000_000_000`.
    #[error("timestamp nanos out of range: {nanos}")]
    InvalidTimestamp {
        /// The offending nanosecond value.
        nanos: i32,
    },

    /// A snapshot version before the Unix epoch.
    #[error("snapshot version precedes the epoch: {seconds}s")]
    PreEpochVersion {
        /// The offending seconds value.
        seconds: i64,
    },

    /// A mutation batch was created without mutations.
    #[error("mutation batch {batch_id} has no mutations")]
    EmptyBatch {
        /// Batch identifier.
        batch_id: i32,
    },
}

impl ModelError {
    /// Creates an invalid document path error.
    pub fn invalid_document_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDocumentPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid field path error.
    pub fn invalid_field_path(path: impl Into<String>) -> Self {
        Self::InvalidFieldPath { path: path.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ModelError::invalid_document_path("rooms", "odd number of segments");
        assert_eq!(
            err.to_string(),
            "invalid document path \"rooms\": odd number of segments"
        );

        let err = ModelError::EmptyBatch { batch_id: 7 };
        assert!(err.to_string().contains('7'));
    }
}

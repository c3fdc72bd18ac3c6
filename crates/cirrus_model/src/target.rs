//! Watch targets and the descriptors sent when listening to them.

use crate::path::ResourcePath;
use crate::version::SnapshotVersion;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Client-assigned handle for one active query subscription.
///
/// Unique among currently active targets; reusable after removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TargetId(pub i32);

impl TargetId {
    /// Returns the raw id.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target:{}", self.0)
    }
}

/// A compiled query, as far as the remote layer cares.
///
/// Compilation from the public query API happens elsewhere; the remote
/// layer only forwards this descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Query {
    /// Collection or document path the query runs against.
    pub path: ResourcePath,
    /// Canonical filter/order/limit description.
    pub canonical_id: String,
}

impl Query {
    /// Creates a query over every document at `path`.
    pub fn at_path(path: ResourcePath) -> Self {
        let canonical_id = path.to_string();
        Self { path, canonical_id }
    }
}

/// Why a target is being listened to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QueryPurpose {
    /// A regular query listen.
    #[default]
    Listen,
    /// Re-listen after an existence filter mismatch.
    ExistenceFilterMismatch,
    /// Resolve a document whose membership in a view is unknown.
    LimboResolution,
}

/// Everything the client knows about one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryData {
    /// The query being listened to.
    pub query: Query,
    /// Client-assigned target id.
    pub target_id: TargetId,
    /// Sequence number of the last use of the target.
    pub sequence_number: i64,
    /// Why the target is being listened to.
    pub purpose: QueryPurpose,
    /// Version the target's results were last consistent at.
    pub snapshot_version: SnapshotVersion,
    /// Opaque marker to resume the listen from.
    pub resume_token: Bytes,
}

impl QueryData {
    /// Creates target data with no version and an empty resume token.
    pub fn new(
        query: Query,
        target_id: TargetId,
        sequence_number: i64,
        purpose: QueryPurpose,
    ) -> Self {
        Self {
            query,
            target_id,
            sequence_number,
            purpose,
            snapshot_version: SnapshotVersion::NONE,
            resume_token: Bytes::new(),
        }
    }

    /// Returns a copy with a different snapshot version.
    #[must_use]
    pub fn with_snapshot_version(&self, snapshot_version: SnapshotVersion) -> Self {
        Self {
            snapshot_version,
            ..self.clone()
        }
    }

    /// Returns a copy with a different resume token.
    #[must_use]
    pub fn with_resume_token(&self, resume_token: Bytes) -> Self {
        Self {
            resume_token,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_return_updated_copies() {
        let data = QueryData::new(
            Query::at_path(ResourcePath::parse("rooms")),
            TargetId(1),
            0,
            QueryPurpose::Listen,
        );
        let resumed = data
            .with_snapshot_version(SnapshotVersion::from_seconds(4))
            .with_resume_token(Bytes::from_static(b"abc"));

        assert_eq!(data.snapshot_version, SnapshotVersion::NONE);
        assert!(data.resume_token.is_empty());
        assert_eq!(resumed.snapshot_version, SnapshotVersion::from_seconds(4));
        assert_eq!(resumed.resume_token, Bytes::from_static(b"abc"));
        assert_eq!(resumed.target_id, TargetId(1));
    }

    #[test]
    fn target_id_display() {
        assert_eq!(TargetId(12).to_string(), "target:12");
    }
}

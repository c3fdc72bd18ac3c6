//! Change notifications pushed by the server on the watch stream.

use crate::status::Status;
use bytes::Bytes;
use cirrus_model::{DocumentKey, MaybeDocument, TargetId};
use serde::{Deserialize, Serialize};

/// What happened to the targets named by a [`WatchTargetChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetChangeState {
    /// Only the resume token (or nothing) changed.
    NoChange,
    /// The targets were added.
    Added,
    /// The targets were removed.
    Removed,
    /// The targets are consistent up to the accompanying snapshot version.
    Current,
    /// The targets were reset and must be re-synced from scratch.
    Reset,
}

/// A lifecycle change for one or more targets.
///
/// An empty `target_ids` list addresses every active target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchTargetChange {
    /// What happened.
    pub state: TargetChangeState,
    /// Affected targets.
    pub target_ids: Vec<TargetId>,
    /// New resume token, empty if unchanged.
    pub resume_token: Bytes,
    /// Error that caused the change, if any.
    pub cause: Option<Status>,
}

impl WatchTargetChange {
    /// Creates a change without a resume token or cause.
    pub fn new(state: TargetChangeState, target_ids: Vec<TargetId>) -> Self {
        Self {
            state,
            target_ids,
            resume_token: Bytes::new(),
            cause: None,
        }
    }

    /// Creates a removal caused by a server error.
    pub fn removed_with_cause(target_ids: Vec<TargetId>, cause: Status) -> Self {
        Self {
            state: TargetChangeState::Removed,
            target_ids,
            resume_token: Bytes::new(),
            cause: Some(cause),
        }
    }

    /// Returns a copy with the given resume token.
    #[must_use]
    pub fn with_resume_token(mut self, resume_token: Bytes) -> Self {
        self.resume_token = resume_token;
        self
    }

    /// True if the server attached an error cause.
    pub fn has_cause(&self) -> bool {
        self.cause.is_some()
    }
}

/// A document changed, was deleted, or left some targets.
///
/// `new_document` is a [`MaybeDocument::Document`] for updates, a
/// [`MaybeDocument::NoDocument`] for deletions and `None` when the document
/// only stopped matching `removed_target_ids`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentWatchChange {
    /// Targets the document now matches.
    pub updated_target_ids: Vec<TargetId>,
    /// Targets the document no longer matches.
    pub removed_target_ids: Vec<TargetId>,
    /// Key of the changed document.
    pub key: DocumentKey,
    /// New state of the document, if known.
    pub new_document: Option<MaybeDocument>,
}

/// The server's count of documents matching a target, used to detect
/// missed removals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistenceFilterWatchChange {
    /// Target the filter applies to.
    pub target_id: TargetId,
    /// Number of documents matching the target on the server.
    pub count: i32,
}

/// One change notification from the watch stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatchChange {
    /// Target lifecycle change.
    TargetChange(WatchTargetChange),
    /// Document delta.
    Document(DocumentWatchChange),
    /// Existence filter.
    ExistenceFilter(ExistenceFilterWatchChange),
}

impl WatchChange {
    /// Returns the target change, if this is one.
    pub fn as_target_change(&self) -> Option<&WatchTargetChange> {
        match self {
            WatchChange::TargetChange(change) => Some(change),
            _ => None,
        }
    }
}

impl From<WatchTargetChange> for WatchChange {
    fn from(change: WatchTargetChange) -> Self {
        WatchChange::TargetChange(change)
    }
}

impl From<DocumentWatchChange> for WatchChange {
    fn from(change: DocumentWatchChange) -> Self {
        WatchChange::Document(change)
    }
}

impl From<ExistenceFilterWatchChange> for WatchChange {
    fn from(change: ExistenceFilterWatchChange) -> Self {
        WatchChange::ExistenceFilter(change)
    }
}

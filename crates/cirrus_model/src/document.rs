//! Documents and their provenance.
//!
//! Every document value the client holds records where it came from: the
//! server alone ([`DocumentState::Synced`]), a local write that the server
//! has not yet acknowledged ([`DocumentState::HasLocalMutations`]), or a
//! local write the server acknowledged before the matching watch update
//! arrived ([`DocumentState::HasCommittedMutations`]).
//!
//! Documents are immutable. A state change always produces a new instance.

use crate::document_key::DocumentKey;
use crate::path::FieldPath;
use crate::value::{FieldValue, ObjectValue};
use crate::version::SnapshotVersion;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Describes the pending-writes state of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentState {
    /// Local mutations applied via the mutation queue. The document is
    /// potentially inconsistent with the server.
    HasLocalMutations,
    /// Mutations applied based on a write acknowledgment. The document is
    /// potentially inconsistent with the server.
    HasCommittedMutations,
    /// No mutations applied. The document was sent by the watch stream.
    Synced,
}

impl fmt::Display for DocumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocumentState::HasLocalMutations => "LocalMutations",
            DocumentState::HasCommittedMutations => "CommittedMutations",
            DocumentState::Synced => "Synced",
        })
    }
}

/// A document with a key, version, data and provenance state.
///
/// Equality ignores the difference between [`DocumentState::Synced`] and
/// [`DocumentState::HasCommittedMutations`]; only the local-mutations flag
/// participates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    key: DocumentKey,
    version: SnapshotVersion,
    data: ObjectValue,
    state: DocumentState,
}

impl Document {
    /// Creates a document.
    pub fn new(
        data: ObjectValue,
        key: DocumentKey,
        version: SnapshotVersion,
        state: DocumentState,
    ) -> Self {
        Self {
            key,
            version,
            data,
            state,
        }
    }

    /// Returns the document key.
    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    /// Returns the version the data is valid as of.
    pub fn version(&self) -> SnapshotVersion {
        self.version
    }

    /// Returns the field tree.
    pub fn data(&self) -> &ObjectValue {
        &self.data
    }

    /// Returns the value at `path`, if present.
    pub fn field(&self, path: &FieldPath) -> Option<&FieldValue> {
        self.data.get(path)
    }

    /// Returns the provenance state.
    pub fn state(&self) -> DocumentState {
        self.state
    }

    /// True if local, unacknowledged mutations are applied.
    pub fn has_local_mutations(&self) -> bool {
        self.state == DocumentState::HasLocalMutations
    }

    /// True if acknowledged mutations are applied but the server version
    /// has not arrived yet.
    pub fn has_committed_mutations(&self) -> bool {
        self.state == DocumentState::HasCommittedMutations
    }

    /// True if the document reflects any write not yet seen on watch.
    pub fn has_pending_writes(&self) -> bool {
        self.has_local_mutations() || self.has_committed_mutations()
    }

    /// Returns a copy carrying a different state.
    #[must_use]
    pub fn with_state(&self, state: DocumentState) -> Document {
        Document {
            state,
            ..self.clone()
        }
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.key == other.key
            && self.has_local_mutations() == other.has_local_mutations()
            && self.data == other.data
    }
}

impl Eq for Document {}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Document(key={}, version={}, data={}, state={})",
            self.key, self.version, self.data, self.state
        )
    }
}

/// A document known not to exist at a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoDocument {
    key: DocumentKey,
    version: SnapshotVersion,
    has_committed_mutations: bool,
}

impl NoDocument {
    /// Creates a deleted-document marker.
    pub fn new(key: DocumentKey, version: SnapshotVersion, has_committed_mutations: bool) -> Self {
        Self {
            key,
            version,
            has_committed_mutations,
        }
    }

    /// Returns the document key.
    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    /// Returns the version of the deletion.
    pub fn version(&self) -> SnapshotVersion {
        self.version
    }

    /// True if the deletion came from an acknowledged local write.
    pub fn has_committed_mutations(&self) -> bool {
        self.has_committed_mutations
    }
}

/// A document known to exist at a version, with unknown contents.
///
/// Produced when a patch is acknowledged for a document the client never
/// had a base value for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnknownDocument {
    key: DocumentKey,
    version: SnapshotVersion,
}

impl UnknownDocument {
    /// Creates an unknown-contents marker.
    pub fn new(key: DocumentKey, version: SnapshotVersion) -> Self {
        Self { key, version }
    }

    /// Returns the document key.
    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    /// Returns the version the document is known to exist at.
    pub fn version(&self) -> SnapshotVersion {
        self.version
    }
}

/// Any state the client can hold for a single key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaybeDocument {
    /// An existing document.
    Document(Document),
    /// A deleted document.
    NoDocument(NoDocument),
    /// A document with unknown contents.
    UnknownDocument(UnknownDocument),
}

impl MaybeDocument {
    /// Returns the document key.
    pub fn key(&self) -> &DocumentKey {
        match self {
            MaybeDocument::Document(d) => d.key(),
            MaybeDocument::NoDocument(d) => d.key(),
            MaybeDocument::UnknownDocument(d) => d.key(),
        }
    }

    /// Returns the version.
    pub fn version(&self) -> SnapshotVersion {
        match self {
            MaybeDocument::Document(d) => d.version(),
            MaybeDocument::NoDocument(d) => d.version(),
            MaybeDocument::UnknownDocument(d) => d.version(),
        }
    }

    /// True if any write not yet seen on watch is reflected.
    ///
    /// Unknown documents always originate from acknowledged writes.
    pub fn has_pending_writes(&self) -> bool {
        match self {
            MaybeDocument::Document(d) => d.has_pending_writes(),
            MaybeDocument::NoDocument(d) => d.has_committed_mutations(),
            MaybeDocument::UnknownDocument(_) => true,
        }
    }

    /// Returns the document if this is an existing one.
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            MaybeDocument::Document(d) => Some(d),
            _ => None,
        }
    }
}

impl From<Document> for MaybeDocument {
    fn from(d: Document) -> Self {
        MaybeDocument::Document(d)
    }
}

impl From<NoDocument> for MaybeDocument {
    fn from(d: NoDocument) -> Self {
        MaybeDocument::NoDocument(d)
    }
}

impl From<UnknownDocument> for MaybeDocument {
    fn from(d: UnknownDocument) -> Self {
        MaybeDocument::UnknownDocument(d)
    }
}

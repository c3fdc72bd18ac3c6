//! Provenance transitions between local writes and server state.
//!
//! A document in [`DocumentState::HasLocalMutations`] keeps that state until
//! either the write is acknowledged (→ [`DocumentState::HasCommittedMutations`])
//! or the server pushes a version at least as new as the write's base
//! version (→ [`DocumentState::Synced`]). Both transitions return new
//! documents.

use crate::document::{Document, DocumentState};
use crate::version::SnapshotVersion;

/// Moves a locally mutated document to the committed state after the write
/// stream acknowledged its batch at `commit_version`.
///
/// Documents without local mutations are returned unchanged.
pub fn acknowledge_write(doc: &Document, commit_version: SnapshotVersion) -> Document {
    if !doc.has_local_mutations() {
        return doc.clone();
    }
    Document::new(
        doc.data().clone(),
        doc.key().clone(),
        commit_version,
        DocumentState::HasCommittedMutations,
    )
}

/// Merges a server-pushed document with the local view of the same key.
///
/// `base_version` is the version the pending local write was based on (for
/// committed documents, the commit version). The remote document wins once
/// it is at least that new; until then the local view is kept.
pub fn apply_remote_document(
    local: Option<&Document>,
    remote: Document,
    base_version: SnapshotVersion,
) -> Document {
    match local {
        Some(local) if local.has_pending_writes() && remote.version() < base_version => {
            local.clone()
        }
        _ => {
            if remote.state() == DocumentState::Synced {
                remote
            } else {
                remote.with_state(DocumentState::Synced)
            }
        }
    }
}

//! Mutations, mutation batches and their acknowledgments.

use crate::document::{Document, DocumentState, MaybeDocument, NoDocument, UnknownDocument};
use crate::document_key::DocumentKey;
use crate::error::{ModelError, ModelResult};
use crate::path::FieldPath;
use crate::value::{FieldValue, ObjectValue};
use crate::version::{SnapshotVersion, Timestamp};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifies a mutation batch in the local mutation queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BatchId(pub i32);

impl BatchId {
    /// Returns the raw id.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch:{}", self.0)
    }
}

/// A condition the server checks before applying a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Precondition {
    /// Always apply.
    #[default]
    None,
    /// Apply only if the document does (`true`) or does not exist.
    Exists(bool),
    /// Apply only if the document exists at exactly this version.
    UpdateTime(SnapshotVersion),
}

impl Precondition {
    /// Returns true if the precondition holds for `base`.
    pub fn is_valid_for(&self, base: Option<&MaybeDocument>) -> bool {
        match self {
            Precondition::None => true,
            Precondition::Exists(true) => matches!(base, Some(MaybeDocument::Document(_))),
            Precondition::Exists(false) => {
                matches!(base, None | Some(MaybeDocument::NoDocument(_)))
            }
            Precondition::UpdateTime(version) => {
                matches!(base, Some(MaybeDocument::Document(d)) if d.version() == *version)
            }
        }
    }
}

/// The set of field paths a patch touches.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldMask(Vec<FieldPath>);

impl FieldMask {
    /// Creates a mask from paths.
    pub fn new(paths: Vec<FieldPath>) -> Self {
        Self(paths)
    }

    /// Returns the masked paths.
    pub fn paths(&self) -> &[FieldPath] {
        &self.0
    }
}

/// A single document edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    /// Replace the whole document.
    Set {
        /// Target document.
        key: DocumentKey,
        /// New contents.
        value: ObjectValue,
        /// Server-side condition.
        precondition: Precondition,
    },
    /// Update the masked fields, leaving others untouched.
    Patch {
        /// Target document.
        key: DocumentKey,
        /// Values for the masked fields. A masked path missing here is
        /// deleted.
        data: ObjectValue,
        /// Fields to update.
        mask: FieldMask,
        /// Server-side condition.
        precondition: Precondition,
    },
    /// Delete the document.
    Delete {
        /// Target document.
        key: DocumentKey,
        /// Server-side condition.
        precondition: Precondition,
    },
}

/// The server's result for one mutation of an acknowledged batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationResult {
    /// Version of the document after the write.
    pub version: SnapshotVersion,
    /// Values computed by server-side transforms, if any.
    pub transform_results: Option<Vec<FieldValue>>,
}

impl MutationResult {
    /// Creates a result without transform values.
    pub fn new(version: SnapshotVersion) -> Self {
        Self {
            version,
            transform_results: None,
        }
    }
}

impl Mutation {
    /// Creates a set mutation without a precondition.
    pub fn set(key: DocumentKey, value: ObjectValue) -> Self {
        Mutation::Set {
            key,
            value,
            precondition: Precondition::None,
        }
    }

    /// Creates a patch that requires the document to exist.
    pub fn patch(key: DocumentKey, data: ObjectValue, mask: FieldMask) -> Self {
        Mutation::Patch {
            key,
            data,
            mask,
            precondition: Precondition::Exists(true),
        }
    }

    /// Creates a delete mutation without a precondition.
    pub fn delete(key: DocumentKey) -> Self {
        Mutation::Delete {
            key,
            precondition: Precondition::None,
        }
    }

    /// Returns the target document key.
    pub fn key(&self) -> &DocumentKey {
        match self {
            Mutation::Set { key, .. }
            | Mutation::Patch { key, .. }
            | Mutation::Delete { key, .. } => key,
        }
    }

    /// Returns the precondition.
    pub fn precondition(&self) -> Precondition {
        match self {
            Mutation::Set { precondition, .. }
            | Mutation::Patch { precondition, .. }
            | Mutation::Delete { precondition, .. } => *precondition,
        }
    }

    /// Applies the mutation to the local view of a document.
    ///
    /// The result keeps the base document's version and is marked
    /// [`DocumentState::HasLocalMutations`]. When the precondition does not
    /// hold, the base is returned unchanged.
    pub fn apply_to_local_view(&self, base: Option<&MaybeDocument>) -> Option<MaybeDocument> {
        if !self.precondition().is_valid_for(base) {
            return base.cloned();
        }
        let version = post_mutation_version(base);
        match self {
            Mutation::Set { key, value, .. } => Some(
                Document::new(
                    value.clone(),
                    key.clone(),
                    version,
                    DocumentState::HasLocalMutations,
                )
                .into(),
            ),
            Mutation::Patch { key, data, mask, .. } => Some(
                Document::new(
                    patch_object(base_data(base), data, mask),
                    key.clone(),
                    version,
                    DocumentState::HasLocalMutations,
                )
                .into(),
            ),
            Mutation::Delete { key, .. } => {
                Some(NoDocument::new(key.clone(), SnapshotVersion::NONE, false).into())
            }
        }
    }

    /// Applies the mutation to a document using the server's result.
    ///
    /// The result carries the acknowledged version and is marked as having
    /// committed mutations.
    pub fn apply_to_remote_document(
        &self,
        base: Option<&MaybeDocument>,
        result: &MutationResult,
    ) -> MaybeDocument {
        match self {
            Mutation::Set { key, value, .. } => Document::new(
                value.clone(),
                key.clone(),
                result.version,
                DocumentState::HasCommittedMutations,
            )
            .into(),
            Mutation::Patch {
                key,
                data,
                mask,
                precondition,
            } => {
                if !precondition.is_valid_for(base) {
                    return UnknownDocument::new(key.clone(), result.version).into();
                }
                Document::new(
                    patch_object(base_data(base), data, mask),
                    key.clone(),
                    result.version,
                    DocumentState::HasCommittedMutations,
                )
                .into()
            }
            Mutation::Delete { key, .. } => {
                NoDocument::new(key.clone(), result.version, true).into()
            }
        }
    }
}

fn post_mutation_version(base: Option<&MaybeDocument>) -> SnapshotVersion {
    match base {
        Some(MaybeDocument::Document(d)) => d.version(),
        _ => SnapshotVersion::NONE,
    }
}

fn base_data(base: Option<&MaybeDocument>) -> ObjectValue {
    match base {
        Some(MaybeDocument::Document(d)) => d.data().clone(),
        _ => ObjectValue::empty(),
    }
}

fn patch_object(base: ObjectValue, data: &ObjectValue, mask: &FieldMask) -> ObjectValue {
    mask.paths().iter().fold(base, |acc, path| match data.get(path) {
        Some(value) => acc.set(path, value.clone()),
        None => acc.delete(path),
    })
}

/// A group of mutations submitted and acknowledged together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationBatch {
    batch_id: BatchId,
    local_write_time: Timestamp,
    mutations: Vec<Mutation>,
}

impl MutationBatch {
    /// Creates a batch. A batch must contain at least one mutation.
    pub fn new(
        batch_id: BatchId,
        local_write_time: Timestamp,
        mutations: Vec<Mutation>,
    ) -> ModelResult<Self> {
        if mutations.is_empty() {
            return Err(ModelError::EmptyBatch {
                batch_id: batch_id.as_i32(),
            });
        }
        Ok(Self {
            batch_id,
            local_write_time,
            mutations,
        })
    }

    /// Returns the batch id.
    pub fn batch_id(&self) -> BatchId {
        self.batch_id
    }

    /// Returns the local time the batch was created.
    pub fn local_write_time(&self) -> Timestamp {
        self.local_write_time
    }

    /// Returns the mutations in application order.
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Returns the distinct keys the batch touches.
    pub fn keys(&self) -> Vec<DocumentKey> {
        let mut keys: Vec<DocumentKey> = self.mutations.iter().map(|m| m.key().clone()).collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Applies every mutation for `key` to the local view, in order.
    pub fn apply_to_local_view(
        &self,
        key: &DocumentKey,
        base: Option<MaybeDocument>,
    ) -> Option<MaybeDocument> {
        self.mutations
            .iter()
            .filter(|m| m.key() == key)
            .fold(base, |doc, m| m.apply_to_local_view(doc.as_ref()))
    }
}

/// An acknowledged batch paired with the server's results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationBatchResult {
    batch: MutationBatch,
    commit_version: SnapshotVersion,
    mutation_results: Vec<MutationResult>,
    stream_token: Bytes,
}

impl MutationBatchResult {
    /// Pairs a batch with its results.
    pub fn new(
        batch: MutationBatch,
        commit_version: SnapshotVersion,
        mutation_results: Vec<MutationResult>,
        stream_token: Bytes,
    ) -> Self {
        Self {
            batch,
            commit_version,
            mutation_results,
            stream_token,
        }
    }

    /// Returns the acknowledged batch.
    pub fn batch(&self) -> &MutationBatch {
        &self.batch
    }

    /// Returns the commit version of the whole batch.
    pub fn commit_version(&self) -> SnapshotVersion {
        self.commit_version
    }

    /// Returns the per-mutation results, in mutation order.
    pub fn mutation_results(&self) -> &[MutationResult] {
        &self.mutation_results
    }

    /// Returns the stream token the server sent with the result.
    pub fn stream_token(&self) -> &Bytes {
        &self.stream_token
    }

    /// Returns the post-write version of every key in the batch.
    pub fn document_versions(&self) -> BTreeMap<DocumentKey, SnapshotVersion> {
        self.batch
            .mutations()
            .iter()
            .zip(&self.mutation_results)
            .map(|(m, r)| (m.key().clone(), r.version))
            .collect()
    }
}

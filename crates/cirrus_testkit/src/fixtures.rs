//! Test fixtures for documents, targets, batches and server frames.
//!
//! All helpers panic on invalid input; they are meant for tests only.

use bytes::Bytes;
use cirrus_model::{
    BatchId, Document, DocumentKey, DocumentState, FieldValue, Mutation, MutationBatch,
    MutationResult, ObjectValue, Query, QueryData, QueryPurpose, ResourcePath, SnapshotVersion,
    TargetId, Timestamp,
};
use cirrus_protocol::{
    Code, DocumentWatchChange, ExistenceFilterWatchChange, HandshakeResponse, ListenResponse,
    ServerFrame, Status, TargetChangeState, WatchChange, WatchTargetChange, WriteResponse,
};

/// Parses a document key such as `"rooms/eros"`.
pub fn key(path: &str) -> DocumentKey {
    DocumentKey::from_path_string(path).expect("Invalid document key")
}

/// Returns a version at whole seconds.
pub fn version(seconds: i64) -> SnapshotVersion {
    SnapshotVersion::from_seconds(seconds)
}

/// Builds an object from string/value pairs.
pub fn object<'a>(fields: impl IntoIterator<Item = (&'a str, FieldValue)>) -> ObjectValue {
    ObjectValue::from_fields(fields)
}

/// Builds a synced document.
pub fn doc(path: &str, seconds: i64, data: ObjectValue) -> Document {
    Document::new(data, key(path), version(seconds), DocumentState::Synced)
}

/// Builds a document with local, unacknowledged changes.
pub fn local_doc(path: &str, seconds: i64, data: ObjectValue) -> Document {
    Document::new(
        data,
        key(path),
        version(seconds),
        DocumentState::HasLocalMutations,
    )
}

/// Builds listen target data for a collection query.
pub fn query_data(target_id: i32, collection: &str) -> QueryData {
    QueryData::new(
        Query::at_path(ResourcePath::parse(collection)),
        TargetId(target_id),
        i64::from(target_id),
        QueryPurpose::Listen,
    )
}

/// Builds a set mutation with one field.
pub fn set_mutation(path: &str, field: &str, value: impl Into<FieldValue>) -> Mutation {
    Mutation::set(key(path), object([(field, value.into())]))
}

/// Builds a batch from mutations.
pub fn batch(batch_id: i32, mutations: Vec<Mutation>) -> MutationBatch {
    MutationBatch::new(BatchId(batch_id), Timestamp::from_seconds(1), mutations)
        .expect("Batch must not be empty")
}

/// Builds a batch of `count` set mutations against one document.
pub fn batch_of(batch_id: i32, count: usize) -> MutationBatch {
    let mutations = (0..count)
        .map(|i| set_mutation("rooms/eros", "n", i as i64))
        .collect();
    batch(batch_id, mutations)
}

/// Builds a target change for `target_ids`.
pub fn target_change(state: TargetChangeState, target_ids: &[i32]) -> WatchTargetChange {
    WatchTargetChange::new(state, target_ids.iter().copied().map(TargetId).collect())
}

/// Builds a server-initiated removal with a cause.
pub fn removal_with_cause(target_ids: &[i32], code: Code) -> WatchTargetChange {
    WatchTargetChange::removed_with_cause(
        target_ids.iter().copied().map(TargetId).collect(),
        Status::new(code, "target removed"),
    )
}

/// Builds a document change delivering `document` to `target_ids`.
pub fn document_change(document: Document, target_ids: &[i32]) -> DocumentWatchChange {
    DocumentWatchChange {
        updated_target_ids: target_ids.iter().copied().map(TargetId).collect(),
        removed_target_ids: Vec::new(),
        key: document.key().clone(),
        new_document: Some(document.into()),
    }
}

/// Builds an existence filter for one target.
pub fn existence_filter(target_id: i32, count: i32) -> ExistenceFilterWatchChange {
    ExistenceFilterWatchChange {
        target_id: TargetId(target_id),
        count,
    }
}

/// Wraps a change in a listen response frame.
pub fn listen_frame(
    change: impl Into<WatchChange>,
    snapshot_version: SnapshotVersion,
) -> ServerFrame {
    ServerFrame::Listen(ListenResponse::new(change, snapshot_version))
}

/// Builds a handshake acknowledgement.
pub fn handshake_ack(token: &'static [u8]) -> ServerFrame {
    ServerFrame::HandshakeAck(HandshakeResponse {
        stream_token: Bytes::from_static(token),
    })
}

/// Builds a write result with `results` mutation results at `commit_seconds`.
pub fn write_result(token: &'static [u8], commit_seconds: i64, results: usize) -> ServerFrame {
    ServerFrame::WriteResult(WriteResponse {
        stream_token: Bytes::from_static(token),
        commit_version: version(commit_seconds),
        results: vec![MutationResult::new(version(commit_seconds)); results],
    })
}

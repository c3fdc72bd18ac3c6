//! # Cirrus Model
//!
//! Document model for the Cirrus document database client.
//!
//! This crate provides:
//! - Document keys, resource paths and field paths
//! - Snapshot versions (with the `NONE` sentinel)
//! - Field values and the immutable document data tree
//! - Documents with provenance state (synced / local / committed)
//! - Mutations, mutation batches and acknowledged batch results
//! - Watch target descriptors
//! - Provenance transitions between local writes and server state
//!
//! This is a pure data crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod document_key;
mod error;
mod mutation;
mod path;
pub mod reconcile;
mod target;
mod value;
mod version;

pub use document::{Document, DocumentState, MaybeDocument, NoDocument, UnknownDocument};
pub use document_key::DocumentKey;
pub use error::{ModelError, ModelResult};
pub use mutation::{
    BatchId, FieldMask, Mutation, MutationBatch, MutationBatchResult, MutationResult, Precondition,
};
pub use path::{FieldPath, ResourcePath};
pub use target::{Query, QueryData, QueryPurpose, TargetId};
pub use value::{FieldValue, GeoPoint, ObjectValue};
pub use version::{SnapshotVersion, Timestamp};

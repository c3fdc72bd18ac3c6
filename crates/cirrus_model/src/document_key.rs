//! Document keys.

use crate::error::{ModelError, ModelResult};
use crate::path::ResourcePath;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a document.
///
/// A key wraps a resource path with an even, non-zero number of segments
/// (`collection/doc[/subcollection/doc]...`). Keys are immutable and are
/// the primary key for every document map in the client.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "ResourcePath", into = "ResourcePath")]
pub struct DocumentKey {
    path: ResourcePath,
}

impl DocumentKey {
    /// Creates a key from a path, validating that it names a document.
    pub fn new(path: ResourcePath) -> ModelResult<Self> {
        if path.segments().iter().any(String::is_empty) {
            return Err(ModelError::invalid_document_path(
                path.to_string(),
                "empty segment",
            ));
        }
        if !Self::is_document_key(&path) {
            return Err(ModelError::invalid_document_path(
                path.to_string(),
                format!("expected an even number of segments, got {}", path.len()),
            ));
        }
        Ok(Self { path })
    }

    /// Parses a slash-separated document path.
    pub fn from_path_string(path: &str) -> ModelResult<Self> {
        Self::new(ResourcePath::parse(path))
    }

    /// Returns true if `path` is a valid document path.
    pub fn is_document_key(path: &ResourcePath) -> bool {
        !path.is_empty() && path.len() % 2 == 0
    }

    /// Returns the underlying path.
    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    /// Returns the document id (final path segment).
    pub fn document_id(&self) -> &str {
        self.path.last_segment().unwrap_or_default()
    }

    /// Returns the path of the collection containing the document.
    pub fn collection_path(&self) -> ResourcePath {
        self.path.parent()
    }
}

impl TryFrom<ResourcePath> for DocumentKey {
    type Error = ModelError;

    fn try_from(path: ResourcePath) -> ModelResult<Self> {
        Self::new(path)
    }
}

impl From<DocumentKey> for ResourcePath {
    fn from(key: DocumentKey) -> Self {
        key.path
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.path, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_document_paths() {
        let key = DocumentKey::from_path_string("rooms/eros/messages/1").unwrap();
        assert_eq!(key.document_id(), "1");
        assert_eq!(key.collection_path().to_string(), "rooms/eros/messages");
        assert_eq!(key.to_string(), "rooms/eros/messages/1");
    }

    #[test]
    fn rejects_collection_paths() {
        assert!(matches!(
            DocumentKey::from_path_string("rooms"),
            Err(ModelError::InvalidDocumentPath { .. })
        ));
        assert!(DocumentKey::from_path_string("").is_err());
        assert!(DocumentKey::from_path_string("rooms/eros/messages").is_err());
        assert!(DocumentKey::new(ResourcePath::from_segments(["rooms", ""])).is_err());
    }

    #[test]
    fn keys_order_by_path() {
        let a = DocumentKey::from_path_string("rooms/a").unwrap();
        let b = DocumentKey::from_path_string("rooms/b").unwrap();
        assert!(a < b);
    }
}

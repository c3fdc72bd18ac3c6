//! Resource and field paths.

use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A slash-separated path to a collection or document.
///
/// Paths compare segment by segment, so `rooms/a/messages` sorts after
/// `rooms/a` and before `rooms/b`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ResourcePath {
    segments: Vec<String>,
}

impl ResourcePath {
    /// Creates a path from already-split segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a slash-separated path. Empty segments are skipped.
    pub fn parse(path: &str) -> Self {
        Self::from_segments(path.split('/').filter(|s| !s.is_empty()))
    }

    /// Returns the path segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns the number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns true if the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the final segment.
    pub fn last_segment(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Returns a new path with `segment` appended.
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// Returns the path without its final segment.
    #[must_use]
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self { segments }
    }

    /// Returns true if `self` is a prefix of `other`.
    pub fn is_prefix_of(&self, other: &ResourcePath) -> bool {
        self.len() <= other.len() && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// A dotted path to a field inside a document, e.g. `address.city`.
///
/// A field path always has at least one segment and no empty segments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Creates a field path from segments.
    pub fn from_segments<I, S>(segments: I) -> ModelResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() || segments.iter().any(String::is_empty) {
            return Err(ModelError::invalid_field_path(segments.join(".")));
        }
        Ok(Self { segments })
    }

    /// Parses a dotted field path.
    pub fn parse(path: &str) -> ModelResult<Self> {
        if path.is_empty() {
            return Err(ModelError::invalid_field_path(path));
        }
        Self::from_segments(path.split('.'))
    }

    /// Returns the path segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns the first segment.
    pub fn first_segment(&self) -> &str {
        &self.segments[0]
    }

    /// Returns the path without its first segment, or `None` for a
    /// single-segment path.
    pub fn pop_first(&self) -> Option<FieldPath> {
        if self.segments.len() <= 1 {
            None
        } else {
            Some(Self {
                segments: self.segments[1..].to_vec(),
            })
        }
    }

    /// Returns true if `self` is a prefix of (or equal to) `other`.
    pub fn is_prefix_of(&self, other: &FieldPath) -> bool {
        self.segments.len() <= other.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }
}

impl TryFrom<Vec<String>> for FieldPath {
    type Error = ModelError;

    fn try_from(segments: Vec<String>) -> ModelResult<Self> {
        Self::from_segments(segments)
    }
}

impl From<FieldPath> for Vec<String> {
    fn from(path: FieldPath) -> Self {
        path.segments
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_path_parse_and_display() {
        let path = ResourcePath::parse("/rooms/eros/messages/");
        assert_eq!(path.len(), 3);
        assert_eq!(path.to_string(), "rooms/eros/messages");
        assert_eq!(path.last_segment(), Some("messages"));
        assert_eq!(path.parent().to_string(), "rooms/eros");
    }

    #[test]
    fn resource_path_ordering_is_segment_wise() {
        let a = ResourcePath::parse("rooms/a");
        let a_child = ResourcePath::parse("rooms/a/messages");
        let b = ResourcePath::parse("rooms/b");
        assert!(a < a_child);
        assert!(a_child < b);
        assert!(a.is_prefix_of(&a_child));
        assert!(!b.is_prefix_of(&a_child));
    }

    #[test]
    fn field_path_rejects_empty_segments() {
        assert!(FieldPath::parse("").is_err());
        assert!(FieldPath::parse("a..b").is_err());
        assert!(FieldPath::from_segments(Vec::<String>::new()).is_err());
    }

    #[test]
    fn field_path_from_raw_segments_validates() {
        assert!(FieldPath::try_from(Vec::<String>::new()).is_err());
        assert!(FieldPath::try_from(vec!["a".to_string(), String::new()]).is_err());

        let segments: Vec<String> = FieldPath::parse("a.b").unwrap().into();
        assert_eq!(FieldPath::try_from(segments).unwrap().to_string(), "a.b");
    }

    #[test]
    fn field_path_pop_first() {
        let path = FieldPath::parse("address.city.zip").unwrap();
        assert_eq!(path.first_segment(), "address");
        let rest = path.pop_first().unwrap();
        assert_eq!(rest.to_string(), "city.zip");
        assert!(FieldPath::parse("a").unwrap().pop_first().is_none());
    }
}

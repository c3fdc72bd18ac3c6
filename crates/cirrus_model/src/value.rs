//! Field values and the document data tree.

use crate::document_key::DocumentKey;
use crate::path::FieldPath;
use crate::version::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A geographic point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl PartialEq for GeoPoint {
    fn eq(&self, other: &Self) -> bool {
        self.latitude.to_bits() == other.latitude.to_bits()
            && self.longitude.to_bits() == other.longitude.to_bits()
    }
}

impl Eq for GeoPoint {}

/// A single value stored in a document field.
///
/// Doubles compare by bit pattern: `NaN` equals `NaN`, and `0.0` is
/// distinct from `-0.0`. An integer never equals a double.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FieldValue {
    /// Null value.
    Null,
    /// Boolean value.
    Boolean(bool),
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Double(f64),
    /// Timestamp value.
    Timestamp(Timestamp),
    /// UTF-8 string.
    String(String),
    /// Opaque bytes.
    Bytes(Vec<u8>),
    /// Reference to another document.
    Reference(DocumentKey),
    /// Geographic point.
    GeoPoint(GeoPoint),
    /// Ordered list of values.
    Array(Vec<FieldValue>),
    /// Nested map.
    Map(ObjectValue),
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => true,
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => a == b,
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a == b,
            (FieldValue::Double(a), FieldValue::Double(b)) => a.to_bits() == b.to_bits(),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => a == b,
            (FieldValue::String(a), FieldValue::String(b)) => a == b,
            (FieldValue::Bytes(a), FieldValue::Bytes(b)) => a == b,
            (FieldValue::Reference(a), FieldValue::Reference(b)) => a == b,
            (FieldValue::GeoPoint(a), FieldValue::GeoPoint(b)) => a == b,
            (FieldValue::Array(a), FieldValue::Array(b)) => a == b,
            (FieldValue::Map(a), FieldValue::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for FieldValue {}

impl FieldValue {
    /// Returns the nested map, if this value is one.
    pub fn as_map(&self) -> Option<&ObjectValue> {
        match self {
            FieldValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the string, if this value is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer, if this value is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns true for [`FieldValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Integer(n)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        FieldValue::Integer(i64::from(n))
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Double(n)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<Timestamp> for FieldValue {
    fn from(t: Timestamp) -> Self {
        FieldValue::Timestamp(t)
    }
}

impl From<ObjectValue> for FieldValue {
    fn from(m: ObjectValue) -> Self {
        FieldValue::Map(m)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(v: Vec<T>) -> Self {
        FieldValue::Array(v.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str("null"),
            FieldValue::Boolean(b) => write!(f, "{b}"),
            FieldValue::Integer(n) => write!(f, "{n}"),
            FieldValue::Double(n) => write!(f, "{n:?}"),
            FieldValue::Timestamp(t) => write!(f, "{t}"),
            FieldValue::String(s) => write!(f, "{s:?}"),
            FieldValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            FieldValue::Reference(k) => write!(f, "ref({k})"),
            FieldValue::GeoPoint(g) => write!(f, "geo({}, {})", g.latitude, g.longitude),
            FieldValue::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            FieldValue::Map(m) => write!(f, "{m}"),
        }
    }
}

/// The immutable field tree of a document.
///
/// Updates are persistent: [`ObjectValue::set`] and [`ObjectValue::delete`]
/// return a new tree and leave `self` untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObjectValue {
    fields: BTreeMap<String, FieldValue>,
}

impl ObjectValue {
    /// Returns an empty object.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds an object from top-level fields.
    pub fn from_fields<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, FieldValue)>,
        K: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Returns the top-level fields.
    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    /// Returns true if the object has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Looks up the value at `path`.
    pub fn get(&self, path: &FieldPath) -> Option<&FieldValue> {
        let value = self.fields.get(path.first_segment())?;
        match path.pop_first() {
            None => Some(value),
            Some(rest) => value.as_map()?.get(&rest),
        }
    }

    /// Returns a copy with `value` stored at `path`, creating intermediate
    /// maps and replacing non-map intermediates as needed.
    #[must_use]
    pub fn set(&self, path: &FieldPath, value: FieldValue) -> ObjectValue {
        let mut fields = self.fields.clone();
        let head = path.first_segment().to_string();
        match path.pop_first() {
            None => {
                fields.insert(head, value);
            }
            Some(rest) => {
                let child = match fields.get(&head) {
                    Some(FieldValue::Map(m)) => m.set(&rest, value),
                    _ => ObjectValue::empty().set(&rest, value),
                };
                fields.insert(head, FieldValue::Map(child));
            }
        }
        ObjectValue { fields }
    }

    /// Returns a copy with the value at `path` removed.
    #[must_use]
    pub fn delete(&self, path: &FieldPath) -> ObjectValue {
        let mut fields = self.fields.clone();
        let head = path.first_segment();
        match path.pop_first() {
            None => {
                fields.remove(head);
            }
            Some(rest) => {
                if let Some(FieldValue::Map(m)) = fields.get(head) {
                    let child = m.delete(&rest);
                    fields.insert(head.to_string(), FieldValue::Map(child));
                }
            }
        }
        ObjectValue { fields }
    }
}

impl fmt::Display for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}: {v}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> FieldPath {
        FieldPath::parse(p).unwrap()
    }

    #[test]
    fn double_equality_is_bitwise() {
        assert_eq!(FieldValue::Double(f64::NAN), FieldValue::Double(f64::NAN));
        assert_ne!(FieldValue::Double(0.0), FieldValue::Double(-0.0));
        assert_ne!(FieldValue::Integer(1), FieldValue::Double(1.0));
    }

    #[test]
    fn nested_get() {
        let data = ObjectValue::from_fields([(
            "address",
            FieldValue::Map(ObjectValue::from_fields([("city", FieldValue::from("Dodoma"))])),
        )]);
        assert_eq!(data.get(&path("address.city")), Some(&FieldValue::from("Dodoma")));
        assert_eq!(data.get(&path("address.zip")), None);
        assert_eq!(data.get(&path("address.city.block")), None);
    }

    #[test]
    fn set_is_persistent() {
        let original = ObjectValue::from_fields([("a", FieldValue::from(1i64))]);
        let updated = original.set(&path("b.c"), FieldValue::from(true));

        assert_eq!(original.get(&path("b.c")), None);
        assert_eq!(updated.get(&path("b.c")), Some(&FieldValue::Boolean(true)));
        assert_eq!(updated.get(&path("a")), Some(&FieldValue::Integer(1)));
    }

    #[test]
    fn set_replaces_scalar_intermediate() {
        let original = ObjectValue::from_fields([("a", FieldValue::from(1i64))]);
        let updated = original.set(&path("a.b"), FieldValue::Null);
        assert_eq!(updated.get(&path("a.b")), Some(&FieldValue::Null));
    }

    #[test]
    fn delete_nested_field() {
        let data = ObjectValue::empty()
            .set(&path("a.b"), FieldValue::from(1i64))
            .set(&path("a.c"), FieldValue::from(2i64));
        let pruned = data.delete(&path("a.b"));
        assert_eq!(pruned.get(&path("a.b")), None);
        assert_eq!(pruned.get(&path("a.c")), Some(&FieldValue::Integer(2)));
        assert_eq!(data.get(&path("a.b")), Some(&FieldValue::Integer(1)));
    }

    #[test]
    fn display_renders_tree() {
        let data = ObjectValue::from_fields([
            ("n", FieldValue::from(1i64)),
            ("s", FieldValue::from("x")),
        ]);
        assert_eq!(data.to_string(), "{n: 1, s: \"x\"}");
    }
}

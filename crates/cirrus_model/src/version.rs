//! Timestamps and snapshot versions.

use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A point in time with nanosecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "TimestampRepr")]
pub struct Timestamp {
    seconds: i64,
    nanos: i32,
}

/// Unvalidated wire shape of [`Timestamp`].
#[derive(Deserialize)]
struct TimestampRepr {
    seconds: i64,
    nanos: i32,
}

impl TryFrom<TimestampRepr> for Timestamp {
    type Error = ModelError;

    fn try_from(repr: TimestampRepr) -> ModelResult<Self> {
        Timestamp::new(repr.seconds, repr.nanos)
    }
}

impl Timestamp {
    /// Creates a timestamp, validating the nanosecond component.
    pub fn new(seconds: i64, nanos: i32) -> ModelResult<Self> {
        if !(0..1_000_000_000).contains(&nanos) {
            return Err(ModelError::InvalidTimestamp { nanos });
        }
        Ok(Self { seconds, nanos })
    }

    /// Creates a timestamp from whole seconds.
    #[must_use]
    pub const fn from_seconds(seconds: i64) -> Self {
        Self { seconds, nanos: 0 }
    }

    /// Returns the current wall-clock time.
    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            seconds: elapsed.as_secs() as i64,
            nanos: elapsed.subsec_nanos() as i32,
        }
    }

    /// Returns the seconds component.
    #[must_use]
    pub const fn seconds(&self) -> i64 {
        self.seconds
    }

    /// Returns the nanoseconds component.
    #[must_use]
    pub const fn nanos(&self) -> i32 {
        self.nanos
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanos)
    }
}

/// The server-assigned moment a piece of state is valid as of.
///
/// Versions are totally ordered. [`SnapshotVersion::NONE`] sorts before
/// every real version and means "no known server version". Versions never
/// precede the epoch, which keeps `NONE` the minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Timestamp", into = "Timestamp")]
pub struct SnapshotVersion(Timestamp);

impl SnapshotVersion {
    /// No known server version.
    pub const NONE: SnapshotVersion = SnapshotVersion(Timestamp {
        seconds: 0,
        nanos: 0,
    });

    /// A version later than every version the server can assign.
    pub const MAX: SnapshotVersion = SnapshotVersion(Timestamp {
        seconds: i64::MAX,
        nanos: 999_999_999,
    });

    /// Creates a version from a timestamp, rejecting pre-epoch times.
    pub fn new(timestamp: Timestamp) -> ModelResult<Self> {
        if timestamp.seconds < 0 {
            return Err(ModelError::PreEpochVersion {
                seconds: timestamp.seconds,
            });
        }
        Ok(Self(timestamp))
    }

    /// Creates a version from whole seconds.
    ///
    /// # Panics
    ///
    /// Panics if `seconds` is negative.
    #[must_use]
    pub const fn from_seconds(seconds: i64) -> Self {
        assert!(seconds >= 0, "snapshot versions cannot precede the epoch");
        Self(Timestamp::from_seconds(seconds))
    }

    /// Returns the underlying timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> Timestamp {
        self.0
    }

    /// Returns true for the [`SnapshotVersion::NONE`] sentinel.
    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

impl TryFrom<Timestamp> for SnapshotVersion {
    type Error = ModelError;

    fn try_from(timestamp: Timestamp) -> ModelResult<Self> {
        SnapshotVersion::new(timestamp)
    }
}

impl From<SnapshotVersion> for Timestamp {
    fn from(version: SnapshotVersion) -> Self {
        version.0
    }
}

impl fmt::Display for SnapshotVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            f.write_str("SnapshotVersion(none)")
        } else {
            write!(f, "SnapshotVersion({})", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_rejects_bad_nanos() {
        assert!(Timestamp::new(1, -1).is_err());
        assert!(Timestamp::new(1, 1_000_000_000).is_err());
        assert!(Timestamp::new(1, 999_999_999).is_ok());
    }

    #[test]
    fn none_sorts_first() {
        let v1 = SnapshotVersion::from_seconds(1);
        assert!(SnapshotVersion::NONE < v1);
        assert!(v1 < SnapshotVersion::MAX);
        assert!(SnapshotVersion::NONE.is_none());
        assert!(!v1.is_none());
        assert_eq!(SnapshotVersion::default(), SnapshotVersion::NONE);
    }

    proptest::proptest! {
        #[test]
        fn none_precedes_every_real_version(
            seconds in i64::MIN..i64::MAX,
            nanos in 0i32..1_000_000_000,
        ) {
            let timestamp = Timestamp::new(seconds, nanos).unwrap();
            match SnapshotVersion::new(timestamp) {
                Ok(version) => {
                    proptest::prop_assert!(version.is_none() || SnapshotVersion::NONE < version);
                    proptest::prop_assert!(version <= SnapshotVersion::MAX);
                }
                Err(error) => {
                    proptest::prop_assert!(seconds < 0);
                    proptest::prop_assert_eq!(error, ModelError::PreEpochVersion { seconds });
                }
            }
        }
    }

    #[test]
    fn pre_epoch_versions_are_rejected() {
        let before_epoch = Timestamp::new(-1, 0).unwrap();
        assert!(SnapshotVersion::new(before_epoch).is_err());
        assert_eq!(
            SnapshotVersion::new(Timestamp::new(0, 0).unwrap()),
            Ok(SnapshotVersion::NONE)
        );
    }

    #[test]
    #[should_panic(expected = "cannot precede the epoch")]
    fn from_seconds_rejects_negative() {
        let _ = SnapshotVersion::from_seconds(-1);
    }

    #[test]
    fn versions_order_by_nanos() {
        let a = SnapshotVersion::new(Timestamp::new(5, 10).unwrap()).unwrap();
        let b = SnapshotVersion::new(Timestamp::new(5, 11).unwrap()).unwrap();
        assert!(a < b);
        assert_eq!(a.to_string(), "SnapshotVersion(5.000000010)");
    }
}

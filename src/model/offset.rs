use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::*;

/// A point in a webinar's timeline, measured from its start time.
///
/// Always finite and non-negative; serialized as a (possibly fractional) number of seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Offset(Duration);

impl Offset {
    pub const ZERO: Offset = Offset(Duration::ZERO);

    pub fn from_seconds(seconds: f64) -> Result<Self, ModelError> {
        // -0.0 passes the conversion, anything below that does not
        Duration::try_from_secs_f64(seconds)
            .map(Self)
            .map_err(|_| InvalidOffsetSnafu { value: seconds }.build())
    }

    pub const fn from_secs(seconds: u64) -> Self {
        Self(Duration::from_secs(seconds))
    }

    pub const fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    pub fn as_duration(self) -> Duration {
        self.0
    }

    pub fn as_seconds(self) -> f64 {
        self.0.as_secs_f64()
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn saturating_add(self, rhs: Offset) -> Offset {
        Self(self.0.saturating_add(rhs.0))
    }

    pub fn saturating_sub(self, rhs: Offset) -> Offset {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl From<Duration> for Offset {
    fn from(value: Duration) -> Self {
        Self(value)
    }
}

/// Formats as `m:ss` with whole seconds, the way overlay countdowns show it.
impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let seconds = self.0.as_secs();
        write!(f, "{}:{:02}", seconds / 60, seconds % 60)
    }
}

impl Serialize for Offset {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_seconds())
    }
}

impl<'de> Deserialize<'de> for Offset {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let seconds = f64::deserialize(deserializer)?;
        Self::from_seconds(seconds).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_and_non_finite_seconds() {
        assert!(Offset::from_seconds(-1.0).is_err());
        assert!(Offset::from_seconds(f64::NAN).is_err());
        assert!(Offset::from_seconds(f64::INFINITY).is_err());
        assert!(serde_json::from_str::<Offset>("-0.5").is_err());
    }

    #[test]
    fn keeps_fractional_seconds() {
        let offset = Offset::from_seconds(9.999).unwrap();
        assert!(offset > Offset::from_millis(9_998));
        assert!(offset < Offset::from_secs(10));
    }

    #[test]
    fn displays_as_minutes_and_seconds() {
        assert_eq!(Offset::from_secs(0).to_string(), "0:00");
        assert_eq!(Offset::from_secs(65).to_string(), "1:05");
        assert_eq!(Offset::from_seconds(299.9).unwrap().to_string(), "4:59");
    }
}

use std::fmt;
use std::ops::{Add, Sub};
use std::time::Duration;

use chrono::{DateTime, Utc};
use derive_new::new;
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// An instant on the wall clock, serialized as RFC 3339.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, new)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn parse(text: &str) -> Result<Self, chrono::ParseError> {
        DateTime::parse_from_rfc3339(text).map(|dt| Self(dt.into()))
    }

    pub fn inner(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Time elapsed since `earlier`, or zero if `earlier` is in the future.
    pub fn saturating_since(self, earlier: Timestamp) -> Duration {
        (self.0 - earlier.0).to_std().unwrap_or(Duration::ZERO)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.to_rfc3339().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl Sub<Timestamp> for Timestamp {
    type Output = chrono::Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        self.0 - rhs.0
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    /// Saturates at the largest representable instant.
    fn add(self, rhs: Duration) -> Self::Output {
        chrono::Duration::from_std(rhs)
            .ok()
            .and_then(|delta| self.0.checked_add_signed(delta))
            .map_or(Self(DateTime::<Utc>::MAX_UTC), Self)
    }
}

/// Source of "now" for everything that evaluates a timeline.
///
/// Nothing in the engine reads a clock by itself, callers hand the current instant in.
pub trait Clock: fmt::Debug + Send + Sync + 'static {
    fn now(&self) -> Timestamp;
}

/// Reads the operating system's wall clock on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A wall clock anchored once and then advanced by tokio's monotonic instant.
///
/// System clock adjustments after the anchor are ignored. Under a paused tokio runtime it follows the
/// virtual time, which is what the session tests rely on.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    anchor: Timestamp,
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::anchored(Timestamp::now())
    }

    pub fn anchored(anchor: Timestamp) -> Self {
        Self {
            anchor,
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        self.anchor + self.origin.elapsed()
    }
}

// tokio refuses zero periods
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// An interval whose ticks land on whole multiples of `period` counted from `anchor`.
///
/// Ticks keep happening before the anchor as well, lined up so that one of them lands exactly on it.
/// A webinar's playback ticks use its start time as the anchor, so the countdown keeps updating and
/// the transition into the live phase is observed on the tick where it happens.
pub fn aligned_ticker(anchor: Timestamp, period: Duration, now: Timestamp) -> Interval {
    let period = period.max(MIN_PERIOD);
    let start = Instant::now() + duration_to_next_instant(anchor, period, now);

    let mut timer = tokio::time::interval_at(start, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer
}

/// An interval whose first tick happens one `period` from now.
pub fn delayed_ticker(period: Duration) -> Interval {
    let period = period.max(MIN_PERIOD);
    let mut timer = tokio::time::interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer
}

/// compute the time until the next "interval instant" will occur.
/// this is used to construct [tokio::time::Interval] aligned to an anchor in the past or in the future.
fn duration_to_next_instant(anchor: Timestamp, period: Duration, now: Timestamp) -> Duration {
    let period = period.as_millis().max(1);

    if anchor > now {
        let until_anchor = anchor.saturating_since(now).as_millis() % period;
        return Duration::from_millis(u64::try_from(until_anchor).unwrap_or(u64::MAX));
    }

    let elapsed = now.saturating_since(anchor).as_millis();
    let past_last_instant = elapsed % period;

    if past_last_instant == 0 {
        return Duration::ZERO;
    }

    let left = u64::try_from(period - past_last_instant).unwrap_or(u64::MAX);
    Duration::from_millis(left)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(text: &str) -> Timestamp {
        Timestamp::parse(text).unwrap()
    }

    #[test]
    fn interval_in_the_future() {
        let now = at("2024-03-01T10:00:00Z");
        let anchor = at("2024-03-02T10:00:00Z");

        let result = duration_to_next_instant(anchor, Duration::from_secs(1), now);
        assert_eq!(
            result,
            Duration::ZERO,
            "an anchor a whole number of periods away is already on an instant"
        );

        let result = duration_to_next_instant(at("2024-03-01T10:00:02.250Z"), Duration::from_secs(1), now);
        assert_eq!(
            result,
            Duration::from_millis(250),
            "ticks before the anchor should still land on instants that hit the anchor"
        );
    }

    #[test]
    fn already_running_interval() {
        let now = at("2024-03-01T10:00:00Z");
        let anchor = at("2024-02-29T10:15:00Z");

        let result = duration_to_next_instant(anchor, Duration::from_secs(60 * 60), now);
        assert_eq!(
            result,
            Duration::from_secs(15 * 60),
            "interval that has already started should return the time until the next interval instant"
        );
    }

    #[test]
    fn sub_second_offsets_round_to_the_next_tick() {
        let anchor = at("2024-03-01T10:00:00Z");
        let now = at("2024-03-01T10:00:02.250Z");

        let result = duration_to_next_instant(anchor, Duration::from_secs(1), now);
        assert_eq!(result, Duration::from_millis(750));
    }

    #[test]
    fn exactly_on_an_instant_ticks_immediately() {
        let anchor = at("2024-03-01T10:00:00Z");
        let now = at("2024-03-01T10:00:05Z");

        let result = duration_to_next_instant(anchor, Duration::from_secs(1), now);
        assert_eq!(result, Duration::ZERO);
    }

    #[test]
    fn timestamps_round_trip_through_rfc3339() {
        let timestamp = at("2024-03-01T10:00:00.5Z");
        let json = serde_json::to_string(&timestamp).unwrap();
        let parsed: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, timestamp);
    }

    #[test]
    fn saturating_since_never_goes_negative() {
        let earlier = at("2024-03-01T10:00:00Z");
        let later = at("2024-03-01T10:00:30Z");

        assert_eq!(later.saturating_since(earlier), Duration::from_secs(30));
        assert_eq!(earlier.saturating_since(later), Duration::ZERO);
    }

    #[test]
    fn system_clock_reads_the_wall_clock() {
        let before = Timestamp::now();
        let now = SystemClock.now();
        let after = Timestamp::now();

        assert!(before <= now && now <= after);
    }

    #[tokio::test(start_paused = true)]
    async fn monotonic_clock_follows_tokio_time() {
        let anchor = at("2024-03-01T10:00:00Z");
        let clock = MonotonicClock::anchored(anchor);

        tokio::time::advance(Duration::from_secs(90)).await;

        assert_eq!(clock.now(), at("2024-03-01T10:01:30Z"));
    }
}

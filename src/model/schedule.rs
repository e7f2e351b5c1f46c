use std::fmt;

use serde::{Deserialize, Serialize};

use super::*;

/// The broadcast window of a webinar.
///
/// `start_time < end_time` is checked when the value is built or deserialized, so every schedule that
/// exists is a valid one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ScheduleData")]
pub struct WebinarSchedule {
    start_time: Timestamp,
    end_time: Timestamp,
}

#[derive(Deserialize)]
struct ScheduleData {
    start_time: Timestamp,
    end_time: Timestamp,
}

impl TryFrom<ScheduleData> for WebinarSchedule {
    type Error = ModelError;

    fn try_from(value: ScheduleData) -> Result<Self, Self::Error> {
        Self::new(value.start_time, value.end_time)
    }
}

impl WebinarSchedule {
    pub fn new(start_time: Timestamp, end_time: Timestamp) -> Result<Self, ModelError> {
        snafu::ensure!(
            start_time < end_time,
            InvalidIntervalSnafu {
                start: start_time,
                end: end_time,
            }
        );

        Ok(Self {
            start_time,
            end_time,
        })
    }

    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    pub fn end_time(&self) -> Timestamp {
        self.end_time
    }

    pub fn length(&self) -> Offset {
        self.end_time.saturating_since(self.start_time).into()
    }

    /// `max(0, now - start_time)`.
    pub fn elapsed(&self, now: Timestamp) -> Offset {
        now.saturating_since(self.start_time).into()
    }

    pub fn until_start(&self, now: Timestamp) -> Offset {
        self.start_time.saturating_since(now).into()
    }

    /// Derived on every call, the status is never stored.
    pub fn status(&self, now: Timestamp) -> WebinarStatus {
        if now < self.start_time {
            WebinarStatus::Scheduled
        } else if now <= self.end_time {
            WebinarStatus::Live
        } else {
            WebinarStatus::Ended
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebinarStatus {
    Scheduled,
    Live,
    Ended,
}

impl fmt::Display for WebinarStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scheduled => write!(f, "scheduled"),
            Self::Live => write!(f, "live"),
            Self::Ended => write!(f, "ended"),
        }
    }
}

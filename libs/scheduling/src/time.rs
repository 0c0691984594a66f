//! Clock times with minute precision.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Number of minutes in a calendar day.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// A clock time in the `HH:MM` domain, stored as minutes since midnight.
///
/// The wire format is a 24-hour `HH:MM` string (a one-digit hour is accepted
/// on input, e.g. `9:00`). Ordering is plain minute-of-day ordering, so
/// comparisons only make sense for times on the same calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u32);

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(Error::TimeOutOfRange { hour, minute });
        }
        Ok(Self(hour * 60 + minute))
    }

    /// Minutes since midnight, always `< MINUTES_PER_DAY`.
    pub fn minutes(self) -> u32 {
        self.0
    }

    pub fn hour(self) -> u32 {
        self.0 / 60
    }

    pub fn minute(self) -> u32 {
        self.0 % 60
    }

    /// Add `minutes`, wrapping past midnight into the next day's clock value.
    ///
    /// The date is the caller's concern; this type only models the clock.
    pub fn wrapping_add(self, minutes: u64) -> Self {
        let total = u64::from(self.0) + minutes % u64::from(MINUTES_PER_DAY);
        Self((total % u64::from(MINUTES_PER_DAY)) as u32)
    }

    pub fn to_naive_time(self) -> NaiveTime {
        // Invariant 0..=23:59 makes this infallible.
        NaiveTime::from_hms_opt(self.hour(), self.minute(), 0)
            .unwrap_or(NaiveTime::MIN)
    }

    /// Truncates seconds; sub-minute precision is not part of the domain.
    pub fn from_naive_time(t: NaiveTime) -> Self {
        Self(t.hour() * 60 + t.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (h, m) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidTimeFormat(s.to_string()))?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(Error::InvalidTimeFormat(s.to_string()));
        }
        let hour: u32 = h
            .parse()
            .map_err(|_| Error::InvalidTimeFormat(s.to_string()))?;
        let minute: u32 = m
            .parse()
            .map_err(|_| Error::InvalidTimeFormat(s.to_string()))?;
        Self::new(hour, minute).map_err(|_| Error::InvalidTimeFormat(s.to_string()))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

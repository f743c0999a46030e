use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// A millisecond-precision UTC instant.
///
/// Used for generation `valid_from` boundaries, component `valid_to`
/// boundaries, and effective-date queries. Ordering is the natural order of
/// the underlying epoch milliseconds.
///
/// The textual form is `YYYY-MM-DD` for instants at midnight and RFC 3339
/// with millisecond precision otherwise; both forms are accepted by
/// [`EffectiveDate::parse`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectiveDate {
    millis: i64,
}

impl EffectiveDate {
    /// Create a date from milliseconds since the UNIX epoch.
    pub const fn from_millis(millis: i64) -> Self {
        Self { millis }
    }

    /// Midnight UTC at the start of the given calendar day.
    pub fn ymd(year: i32, month: u32, day: u32) -> Result<Self, TypeError> {
        let date = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| TypeError::InvalidDate(format!("{year:04}-{month:02}-{day:02}")))?;
        Ok(Self::from_naive_date(date))
    }

    /// Convert a chrono UTC timestamp.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self {
            millis: dt.timestamp_millis(),
        }
    }

    /// The current wall-clock instant.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Parse `YYYY-MM-DD` or an RFC 3339 timestamp.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let s = s.trim();
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Self::from_naive_date(date));
        }
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self::from_datetime(dt.with_timezone(&Utc)))
            .map_err(|e| TypeError::InvalidDate(format!("{s}: {e}")))
    }

    /// Milliseconds since the UNIX epoch.
    pub const fn as_millis(&self) -> i64 {
        self.millis
    }

    /// The instant as a chrono UTC timestamp, if representable.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.millis)
    }

    /// This instant shifted back by `millis` milliseconds.
    pub const fn minus_millis(&self, millis: i64) -> Self {
        Self {
            millis: self.millis.saturating_sub(millis),
        }
    }

    /// This instant shifted forward by `millis` milliseconds.
    pub const fn plus_millis(&self, millis: i64) -> Self {
        Self {
            millis: self.millis.saturating_add(millis),
        }
    }

    /// Returns `true` if the instant falls exactly on a UTC midnight.
    pub fn is_midnight(&self) -> bool {
        self.millis.rem_euclid(MILLIS_PER_DAY) == 0
    }

    fn from_naive_date(date: NaiveDate) -> Self {
        let days = i64::from(date.num_days_from_ce()) - i64::from(EPOCH_DAYS_FROM_CE);
        Self {
            millis: days * MILLIS_PER_DAY,
        }
    }
}

/// `NaiveDate::num_days_from_ce` of 1970-01-01.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

impl FromStr for EffectiveDate {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for EffectiveDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) if self.is_midnight() => write!(f, "{}", dt.format("%Y-%m-%d")),
            Some(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => write!(f, "{}ms", self.millis),
        }
    }
}

impl fmt::Debug for EffectiveDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EffectiveDate({self})")
    }
}

impl Serialize for EffectiveDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EffectiveDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

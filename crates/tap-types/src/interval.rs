//! Canonical UTC instants and half-open time intervals.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// An exact UTC instant, canonicalized on ingest so that lexicographic
/// comparison of the wire representation matches chronological order
/// (`spec.md` §4.1: "no fractional trailing zeros; `Z` suffix").
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Instant(DateTime<Utc>);

impl Instant {
    /// Wrap a `chrono` timestamp, dropping to millisecond precision so
    /// repeated canonicalization is idempotent (§8 "canonicalization of
    /// instants is idempotent").
    pub fn new(ts: DateTime<Utc>) -> Self {
        // Truncate to millis: chrono's AutoSi formatter already drops
        // trailing zero fractional digits, but we normalize the stored
        // value too so `Instant::new(x) == Instant::new(x)` regardless of
        // how many times it round-trips through canonical form.
        let millis = ts.timestamp_millis();
        Self(DateTime::from_timestamp_millis(millis).unwrap_or(ts))
    }

    /// The canonical RFC3339 string form (e.g. `2026-07-30T09:00:00Z`).
    pub fn to_canonical_string(self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    /// The underlying `chrono` timestamp.
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl TryFrom<String> for Instant {
    type Error = chrono::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let parsed = DateTime::parse_from_rfc3339(&value)?.with_timezone(&Utc);
        Ok(Instant::new(parsed))
    }
}

impl From<Instant> for String {
    fn from(value: Instant) -> Self {
        value.to_canonical_string()
    }
}

impl From<DateTime<Utc>> for Instant {
    fn from(value: DateTime<Utc>) -> Self {
        Instant::new(value)
    }
}

/// A half-open time interval `[start, end)`.
///
/// Construction is fallible: `spec.md` §4.1 and §6 both require that an
/// empty interval (`start == end`) is rejected upstream of any timeline
/// operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    /// Inclusive start instant.
    pub start: Instant,
    /// Exclusive end instant.
    pub end: Instant,
}

/// `Interval::new` was given a non-increasing `[start, end)` pair.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("empty or inverted interval: start={start}, end={end}")]
pub struct EmptyInterval {
    start: String,
    end: String,
}

impl Interval {
    /// Construct an interval, rejecting `start >= end`.
    pub fn new(start: Instant, end: Instant) -> Result<Self, EmptyInterval> {
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(EmptyInterval {
                start: start.to_canonical_string(),
                end: end.to_canonical_string(),
            })
        }
    }

    /// Whether `instant` falls within `[start, end)`.
    pub fn contains(&self, instant: Instant) -> bool {
        instant >= self.start && instant < self.end
    }
}

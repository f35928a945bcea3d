//! Time-ranged values for DataFoundation
//!
//! A [`Timeline`] keeps every version of a value together with the interval
//! during which it was active. Intervals are half-open: a range starting at
//! `start` and ending at `end` contains `start` but not `end`.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// An active interval; `end == None` means still active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// Create a range, rejecting `start > end`
    pub fn new(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Result<Self> {
        if let Some(end) = end {
            if start > end {
                return Err(Error::ValidationError(format!(
                    "time range starts at {} after it ends at {}",
                    start.to_rfc3339(),
                    end.to_rfc3339()
                )));
            }
        }
        Ok(Self { start, end })
    }

    /// Create an open-ended range starting at `start`
    pub fn starting(start: DateTime<Utc>) -> Self {
        Self { start, end: None }
    }

    /// Parse a range from its textual bounds; an empty end means open-ended
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let start = parse_timestamp(start)?.ok_or_else(|| {
            Error::ValidationError("time range requires a start time".to_string())
        })?;
        Self::new(start, parse_timestamp(end)?)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    /// Returns true if the range has no end
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Check if an instant falls within `[start, end)`
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && self.end.map_or(true, |end| instant < end)
    }

    /// Re-check the ordering invariant, for values that bypassed `new`
    pub fn validate(&self) -> Result<()> {
        Self::new(self.start, self.end).map(|_| ())
    }
}

/// A value together with its active interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedValue<T> {
    pub range: TimeRange,
    pub value: T,
}

impl<T> VersionedValue<T> {
    pub fn new(range: TimeRange, value: T) -> Self {
        Self { range, value }
    }
}

/// Insertion-ordered versions of a value
///
/// Ranges may overlap; the most recently appended version covering an
/// instant is the one active at that instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline<T> {
    versions: Vec<VersionedValue<T>>,
}

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Self {
            versions: Vec::new(),
        }
    }
}

impl<T> Timeline<T> {
    /// Create an empty timeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a timeline holding a single version
    pub fn with(range: TimeRange, value: T) -> Self {
        let mut timeline = Self::new();
        timeline.append(range, value);
        timeline
    }

    /// Add a new version after all existing ones
    pub fn append(&mut self, range: TimeRange, value: T) {
        self.versions.push(VersionedValue::new(range, value));
    }

    /// Get the value active at an instant
    pub fn at(&self, instant: DateTime<Utc>) -> Option<&T> {
        self.version_at(instant).map(|version| &version.value)
    }

    /// Get the version active at an instant, including its range
    pub fn version_at(&self, instant: DateTime<Utc>) -> Option<&VersionedValue<T>> {
        self.versions
            .iter()
            .rev()
            .find(|version| version.range.contains(instant))
    }

    /// Get the value active right now
    pub fn active_now(&self) -> Option<&T> {
        self.at(Utc::now())
    }

    /// All versions in insertion order
    pub fn all(&self) -> &[VersionedValue<T>] {
        &self.versions
    }

    /// The most recently appended version, active or not
    pub fn latest(&self) -> Option<&VersionedValue<T>> {
        self.versions.last()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VersionedValue<T>> {
        self.versions.iter()
    }
}

impl<T> FromIterator<VersionedValue<T>> for Timeline<T> {
    fn from_iter<I: IntoIterator<Item = VersionedValue<T>>>(iter: I) -> Self {
        Self {
            versions: iter.into_iter().collect(),
        }
    }
}

impl<T> Extend<VersionedValue<T>> for Timeline<T> {
    fn extend<I: IntoIterator<Item = VersionedValue<T>>>(&mut self, iter: I) {
        self.versions.extend(iter);
    }
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC)
///
/// Empty or whitespace-only input means "absent" and yields `None`.
pub fn parse_timestamp(text: &str) -> Result<Option<DateTime<Utc>>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(Some(midnight.and_utc()));
        }
    }

    Err(Error::ValidationError(format!("invalid timestamp: {}", text)))
}

/// Format a timestamp the way it is accepted back by [`parse_timestamp`]
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)
}

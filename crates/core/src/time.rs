//! Clock-time helpers and the weekday type
//!
//! All engine arithmetic runs on minute offsets from midnight. `"HH:MM"`
//! strings exist only at the interface boundary.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Minutes in one day.
pub const MINUTES_PER_DAY: u16 = 1440;

/// Parse an `"HH:MM"` string into minutes from midnight.
pub fn to_minutes(time: &str) -> Result<u16> {
    let (h, m) = time
        .split_once(':')
        .ok_or_else(|| Error::validation(format!("invalid time string: {time}")))?;
    let hours: u16 = h
        .parse()
        .map_err(|_| Error::validation(format!("invalid hour in: {time}")))?;
    let minutes: u16 = m
        .parse()
        .map_err(|_| Error::validation(format!("invalid minute in: {time}")))?;
    if hours > 23 || minutes > 59 {
        return Err(Error::validation(format!("time out of range: {time}")));
    }
    Ok(hours * 60 + minutes)
}

/// Format a minute offset as `"HH:MM"`, wrapping past midnight.
pub fn to_time_string(minutes: u16) -> String {
    let minutes = minutes % MINUTES_PER_DAY;
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Strict half-open interval overlap test.
pub fn ranges_overlap(a_start: u16, a_end: u16, b_start: u16, b_end: u16) -> bool {
    a_start < b_end && b_start < a_end
}

/// Day of the week, indexed Sunday = 0 through Saturday = 6.
///
/// The single internal weekday representation. String labels are converted
/// at the interface boundary via [`DayLabels`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Weekday {
    Sun = 0,
    Mon = 1,
    Tue = 2,
    Wed = 3,
    Thu = 4,
    Fri = 5,
    Sat = 6,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Sun,
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Weekday> {
        Weekday::ALL.get(index as usize).copied()
    }

    pub fn from_date(date: NaiveDate) -> Weekday {
        // num_days_from_sunday is 0..=6, always in range
        Weekday::ALL[date.weekday().num_days_from_sunday() as usize]
    }

    /// Absolute distance in days between two weekday indices.
    pub fn gap(self, other: Weekday) -> u16 {
        (self.index() as i16 - other.index() as i16).unsigned_abs()
    }
}

/// Immutable weekday label table, injected wherever day names are rendered
/// or parsed. Engine code never consults a global name map.
#[derive(Debug, Clone)]
pub struct DayLabels {
    labels: [&'static str; 7],
}

impl DayLabels {
    pub fn new(labels: [&'static str; 7]) -> Self {
        Self { labels }
    }

    pub fn english() -> Self {
        Self::new(["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"])
    }

    pub fn label(&self, day: Weekday) -> &'static str {
        self.labels[day.index() as usize]
    }

    /// Case-insensitive reverse lookup.
    pub fn parse(&self, label: &str) -> Option<Weekday> {
        self.labels
            .iter()
            .position(|l| l.eq_ignore_ascii_case(label))
            .and_then(|i| Weekday::from_index(i as u8))
    }
}

impl Default for DayLabels {
    fn default() -> Self {
        Self::english()
    }
}

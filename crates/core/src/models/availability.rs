//! Availability model
//!
//! Availability is owned by the user profile subsystem; the engine only
//! reads the synced copy carried on each room member. An entry is either
//! weekly-recurring (weekday, no date) or date-specific (date wins, weekday
//! derivable).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::time::Weekday;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityEntry {
    /// Recurring weekday. Ignored when `date` is set and a weekday can be
    /// derived from it.
    pub weekday: Option<Weekday>,
    /// Date-specific override; takes precedence for the week it falls in.
    pub date: Option<NaiveDate>,
    pub start_minutes: u16,
    pub end_minutes: u16,
}

impl AvailabilityEntry {
    /// Weekly recurring entry.
    pub fn recurring(weekday: Weekday, start_minutes: u16, end_minutes: u16) -> Self {
        Self {
            weekday: Some(weekday),
            date: None,
            start_minutes,
            end_minutes,
        }
    }

    /// Date-specific exception.
    pub fn on_date(date: NaiveDate, start_minutes: u16, end_minutes: u16) -> Self {
        Self {
            weekday: None,
            date: Some(date),
            start_minutes,
            end_minutes,
        }
    }
}

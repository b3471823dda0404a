//! Time slot model - one concrete user-to-time assignment

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::{ranges_overlap, Weekday};

/// A concrete time range on a specific date, half-open in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotWindow {
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub start_minutes: u16,
    pub end_minutes: u16,
}

impl SlotWindow {
    pub fn new(date: NaiveDate, start_minutes: u16, end_minutes: u16) -> Self {
        Self {
            date,
            weekday: Weekday::from_date(date),
            start_minutes,
            end_minutes,
        }
    }

    pub fn duration_minutes(&self) -> u16 {
        self.end_minutes.saturating_sub(self.start_minutes)
    }

    /// Overlap requires the same concrete date; slots are occurrences, not
    /// recurring patterns.
    pub fn overlaps(&self, other: &SlotWindow) -> bool {
        self.date == other.date
            && ranges_overlap(
                self.start_minutes,
                self.end_minutes,
                other.start_minutes,
                other.end_minutes,
            )
    }

}

/// Slot lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Confirmed,
}

/// How a slot came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentSource {
    /// Initial bulk auto-assignment (external to this engine).
    AutoAssign,
    /// Seeded directly by the room owner.
    Manual,
    /// Created by approving a request.
    RequestApproval,
    /// Created by a zero-search mutual swap.
    DirectExchange,
    /// Created while replaying a resolved displacement chain.
    ChainResolution,
}

/// An assignment of one user to one concrete occurrence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub start_minutes: u16,
    pub end_minutes: u16,
    pub status: SlotStatus,
    pub assigned_by: AssignmentSource,
    pub assigned_at: DateTime<Utc>,
}

impl TimeSlot {
    pub fn new(user_id: Uuid, window: SlotWindow, assigned_by: AssignmentSource) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            date: window.date,
            weekday: window.weekday,
            start_minutes: window.start_minutes,
            end_minutes: window.end_minutes,
            status: SlotStatus::Confirmed,
            assigned_by,
            assigned_at: Utc::now(),
        }
    }

    pub fn window(&self) -> SlotWindow {
        SlotWindow {
            date: self.date,
            weekday: self.weekday,
            start_minutes: self.start_minutes,
            end_minutes: self.end_minutes,
        }
    }

    pub fn duration_minutes(&self) -> u16 {
        self.end_minutes.saturating_sub(self.start_minutes)
    }

    pub fn overlaps_window(&self, window: &SlotWindow) -> bool {
        self.window().overlaps(window)
    }
}

/// Split a window into unit-sized slots for one user.
///
/// Occupied time longer than one unit is stored as contiguous unit slots
/// that together form one perceived block. A trailing remainder shorter
/// than the unit becomes its own slot.
pub fn split_into_units(
    user_id: Uuid,
    window: SlotWindow,
    unit_minutes: u16,
    assigned_by: AssignmentSource,
) -> Vec<TimeSlot> {
    let unit = unit_minutes.max(1);
    let mut slots = Vec::new();
    let mut start = window.start_minutes;
    while start < window.end_minutes {
        let end = (start + unit).min(window.end_minutes);
        slots.push(TimeSlot::new(
            user_id,
            SlotWindow::new(window.date, start, end),
            assigned_by,
        ));
        start = end;
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    #[test]
    fn test_window_overlap_needs_same_date() {
        let a = SlotWindow::new(monday(), 600, 660);
        let b = SlotWindow::new(monday(), 630, 690);
        let c = SlotWindow::new(monday().succ_opt().unwrap(), 630, 690);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_split_into_units() {
        let user = Uuid::new_v4();
        let slots = split_into_units(
            user,
            SlotWindow::new(monday(), 600, 690),
            30,
            AssignmentSource::RequestApproval,
        );
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].start_minutes, 600);
        assert_eq!(slots[2].end_minutes, 690);
        // Contiguous
        for pair in slots.windows(2) {
            assert_eq!(pair[0].end_minutes, pair[1].start_minutes);
        }
        let total: u16 = slots.iter().map(|s| s.duration_minutes()).sum();
        assert_eq!(total, 90);
    }

    #[test]
    fn test_split_keeps_remainder() {
        let slots = split_into_units(
            Uuid::new_v4(),
            SlotWindow::new(monday(), 600, 645),
            30,
            AssignmentSource::Manual,
        );
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[1].duration_minutes(), 15);
    }
}

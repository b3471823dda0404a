//! Candidate finder
//!
//! Enumerates displacement targets inside a user's availability, ranked by
//! temporal distance from the slot being vacated. Same-day placement is
//! biased heavily: every other weekday costs a full day of distance per day
//! of separation. A greedy heuristic, not a global optimizer.

use chrono::NaiveDate;

use crate::models::SlotWindow;
use crate::schedule::{date_in_week, ScheduleByDay};
use crate::time::{ranges_overlap, Weekday, MINUTES_PER_DAY};

/// Scan step when walking availability blocks.
const SCAN_STEP_MINUTES: u16 = 30;

/// One potential landing window for a displaced user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub weekday: Weekday,
    pub date: NaiveDate,
    pub start_minutes: u16,
    pub distance: u32,
}

impl Candidate {
    pub fn window(&self, duration: u16) -> SlotWindow {
        SlotWindow::new(self.date, self.start_minutes, self.start_minutes + duration)
    }
}

/// Find landing windows of `duration` minutes for a user vacating `origin`,
/// excluding anything that intersects the range under negotiation.
///
/// Candidates on the origin weekday come first by `|start - origin.start|`;
/// other weekdays add `1440 * weekday_gap`. The result is sorted ascending
/// by distance with stable ties.
pub fn find_candidates(
    schedule: &ScheduleByDay,
    origin: &SlotWindow,
    duration: u16,
    negotiated: &SlotWindow,
) -> Vec<Candidate> {
    if duration == 0 {
        return Vec::new();
    }

    let mut candidates = Vec::new();
    for day in Weekday::ALL {
        let date = if day == origin.weekday {
            origin.date
        } else {
            date_in_week(origin.date, day)
        };
        let day_penalty = u32::from(MINUTES_PER_DAY) * u32::from(day.gap(origin.weekday));

        for block in schedule.get(day) {
            let mut start = block.start;
            while start + duration <= block.end {
                let end = start + duration;
                let clashes_negotiated = date == negotiated.date
                    && ranges_overlap(
                        start,
                        end,
                        negotiated.start_minutes,
                        negotiated.end_minutes,
                    );
                if !clashes_negotiated {
                    let offset =
                        (i32::from(start) - i32::from(origin.start_minutes)).unsigned_abs();
                    candidates.push(Candidate {
                        weekday: day,
                        date,
                        start_minutes: start,
                        distance: day_penalty + offset,
                    });
                }
                start += SCAN_STEP_MINUTES;
            }
        }
    }

    candidates.sort_by_key(|c| c.distance);
    candidates
}

//! Schedule-by-day builder
//!
//! Folds a user's recurring weekly availability and date-specific exceptions
//! into per-weekday lists of merged, non-overlapping minute intervals. Date
//! exceptions only count inside the Monday-Sunday week containing the
//! reference date.

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate};

use crate::models::AvailabilityEntry;
use crate::time::Weekday;

/// A half-open minute interval within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Interval {
    pub start: u16,
    pub end: u16,
}

impl Interval {
    pub fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    pub fn contains_range(&self, start: u16, end: u16) -> bool {
        self.start <= start && end <= self.end
    }
}

/// Merged availability intervals keyed by weekday.
#[derive(Debug, Clone, Default)]
pub struct ScheduleByDay {
    days: [Vec<Interval>; 7],
}

impl ScheduleByDay {
    pub fn get(&self, day: Weekday) -> &[Interval] {
        &self.days[day.index() as usize]
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(|d| d.is_empty())
    }

    /// Is the minute range fully inside one availability interval of `day`?
    pub fn covers(&self, day: Weekday, start: u16, end: u16) -> bool {
        self.get(day).iter().any(|i| i.contains_range(start, end))
    }
}

/// Monday of the week containing `reference`.
pub fn week_monday(reference: NaiveDate) -> NaiveDate {
    reference - Duration::days(reference.weekday().num_days_from_monday() as i64)
}

/// The concrete date of `day` within the Monday-Sunday week of `reference`.
/// Sunday lands at the end of the week.
pub fn date_in_week(reference: NaiveDate, day: Weekday) -> NaiveDate {
    let monday = week_monday(reference);
    // Mon=0 .. Sun=6 offset within the week
    let offset = (day.index() as i64 + 6) % 7;
    monday + Duration::days(offset)
}

/// Build the per-weekday availability map for one user.
pub fn schedule_by_day(entries: &[AvailabilityEntry], reference: NaiveDate) -> ScheduleByDay {
    let monday = week_monday(reference);
    let sunday = monday + Duration::days(6);

    // Dedupe identical (weekday, start, end) triples up front.
    let mut triples: BTreeSet<(u8, u16, u16)> = BTreeSet::new();
    for entry in entries {
        if entry.start_minutes >= entry.end_minutes {
            continue;
        }
        let weekday = match entry.date {
            Some(date) => {
                // Date-bound exceptions only apply inside the current week.
                if date < monday || date > sunday {
                    continue;
                }
                Weekday::from_date(date)
            }
            None => match entry.weekday {
                Some(day) => day,
                None => continue,
            },
        };
        triples.insert((weekday.index(), entry.start_minutes, entry.end_minutes));
    }

    let mut schedule = ScheduleByDay::default();
    for (index, start, end) in triples {
        schedule.days[index as usize].push(Interval::new(start, end));
    }

    // BTreeSet iteration already yields each day's intervals sorted by
    // start; merge any that touch or overlap.
    for day in schedule.days.iter_mut() {
        let mut merged: Vec<Interval> = Vec::with_capacity(day.len());
        for interval in day.drain(..) {
            match merged.last_mut() {
                Some(last) if interval.start <= last.end => {
                    last.end = last.end.max(interval.end);
                }
                _ => merged.push(interval),
            }
        }
        *day = merged;
    }

    schedule
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> NaiveDate {
        // Wednesday 2025-03-05; week runs Mon 03-03 .. Sun 03-09
        NaiveDate::from_ymd_opt(2025, 3, 5).unwrap()
    }

    #[test]
    fn test_week_window() {
        assert_eq!(
            week_monday(reference()),
            NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
        );
        assert_eq!(
            date_in_week(reference(), Weekday::Sun),
            NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()
        );
        assert_eq!(
            date_in_week(reference(), Weekday::Mon),
            NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
        );
    }

    #[test]
    fn test_recurring_entries_always_included() {
        let entries = [AvailabilityEntry::recurring(Weekday::Tue, 600, 720)];
        let schedule = schedule_by_day(&entries, reference());
        assert_eq!(schedule.get(Weekday::Tue), &[Interval::new(600, 720)]);
    }

    #[test]
    fn test_date_exception_outside_week_excluded() {
        let next_month = NaiveDate::from_ymd_opt(2025, 4, 7).unwrap();
        let in_week = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap(); // Friday
        let entries = [
            AvailabilityEntry::on_date(next_month, 600, 660),
            AvailabilityEntry::on_date(in_week, 600, 660),
        ];
        let schedule = schedule_by_day(&entries, reference());
        assert!(schedule.get(Weekday::Mon).is_empty());
        assert_eq!(schedule.get(Weekday::Fri), &[Interval::new(600, 660)]);
    }

    #[test]
    fn test_merge_touching_and_overlapping() {
        let entries = [
            AvailabilityEntry::recurring(Weekday::Mon, 600, 660),
            AvailabilityEntry::recurring(Weekday::Mon, 660, 720),
            AvailabilityEntry::recurring(Weekday::Mon, 700, 780),
            AvailabilityEntry::recurring(Weekday::Mon, 900, 960),
        ];
        let schedule = schedule_by_day(&entries, reference());
        assert_eq!(
            schedule.get(Weekday::Mon),
            &[Interval::new(600, 780), Interval::new(900, 960)]
        );
    }

    #[test]
    fn test_duplicates_collapse() {
        let entries = [
            AvailabilityEntry::recurring(Weekday::Thu, 480, 540),
            AvailabilityEntry::recurring(Weekday::Thu, 480, 540),
        ];
        let schedule = schedule_by_day(&entries, reference());
        assert_eq!(schedule.get(Weekday::Thu), &[Interval::new(480, 540)]);
    }

    #[test]
    fn test_output_never_overlaps() {
        // Merge correctness: adjacent output intervals must be disjoint with
        // a strict gap.
        let entries = [
            AvailabilityEntry::recurring(Weekday::Mon, 0, 120),
            AvailabilityEntry::recurring(Weekday::Mon, 60, 180),
            AvailabilityEntry::recurring(Weekday::Mon, 200, 260),
            AvailabilityEntry::recurring(Weekday::Mon, 250, 300),
            AvailabilityEntry::recurring(Weekday::Mon, 400, 500),
        ];
        let schedule = schedule_by_day(&entries, reference());
        for day in Weekday::ALL {
            let intervals = schedule.get(day);
            for pair in intervals.windows(2) {
                assert!(pair[0].end < pair[1].start);
            }
        }
    }

    #[test]
    fn test_inverted_entries_ignored() {
        let entries = [AvailabilityEntry::recurring(Weekday::Mon, 700, 600)];
        let schedule = schedule_by_day(&entries, reference());
        assert!(schedule.is_empty());
    }

    #[test]
    fn test_covers() {
        let entries = [AvailabilityEntry::recurring(Weekday::Mon, 600, 720)];
        let schedule = schedule_by_day(&entries, reference());
        assert!(schedule.covers(Weekday::Mon, 600, 660));
        assert!(schedule.covers(Weekday::Mon, 600, 720));
        assert!(!schedule.covers(Weekday::Mon, 590, 660));
        assert!(!schedule.covers(Weekday::Tue, 600, 660));
    }
}

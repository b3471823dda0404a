//! Direct-exchange evaluator
//!
//! Tests whether two members can trade places with zero search: each party's
//! slots must sit inside the other's stated availability. Mutual
//! compatibility is one predicate, applied symmetrically to both directions.

use crate::models::TimeSlot;
use crate::schedule::ScheduleByDay;

/// Is every slot in the group inside the schedule's availability?
pub fn slots_within_availability(schedule: &ScheduleByDay, slots: &[&TimeSlot]) -> bool {
    slots
        .iter()
        .all(|s| schedule.covers(s.weekday, s.start_minutes, s.end_minutes))
}

/// The mutual-compatibility predicate for a direct exchange.
///
/// Both directions must hold: the target's conflicting slots fit the
/// requester's availability, and every slot in the requester's snapshot fits
/// the target's availability. An empty requester snapshot fails — there is
/// nothing to hand back, so a swap degenerates into displacement.
pub fn mutually_exchangeable(
    requester_schedule: &ScheduleByDay,
    requester_snapshot: &[TimeSlot],
    target_schedule: &ScheduleByDay,
    target_slots: &[&TimeSlot],
) -> bool {
    if requester_snapshot.is_empty() || target_slots.is_empty() {
        return false;
    }
    let snapshot_refs: Vec<&TimeSlot> = requester_snapshot.iter().collect();
    slots_within_availability(requester_schedule, target_slots)
        && slots_within_availability(target_schedule, &snapshot_refs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssignmentSource, AvailabilityEntry, SlotWindow};
    use crate::schedule::schedule_by_day;
    use crate::time::Weekday;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    fn slot(start: u16, end: u16) -> TimeSlot {
        TimeSlot::new(
            Uuid::new_v4(),
            SlotWindow::new(monday(), start, end),
            AssignmentSource::AutoAssign,
        )
    }

    fn schedule(entries: &[AvailabilityEntry]) -> ScheduleByDay {
        schedule_by_day(entries, monday())
    }

    #[test]
    fn test_mutual_compatibility_both_directions() {
        // Requester free 10:00-12:00, target free 14:00-16:00
        let requester = schedule(&[AvailabilityEntry::recurring(Weekday::Mon, 600, 720)]);
        let target = schedule(&[AvailabilityEntry::recurring(Weekday::Mon, 840, 960)]);

        let requester_snapshot = vec![slot(840, 900)]; // requester sits in target's zone
        let target_slot = slot(600, 660); // target sits in requester's zone
        let target_refs = vec![&target_slot];

        assert!(mutually_exchangeable(
            &requester,
            &requester_snapshot,
            &target,
            &target_refs
        ));
    }

    #[test]
    fn test_one_sided_fit_is_not_enough() {
        // Regression pin: compatibility must check the requester's ORIGINAL
        // slots against the target's availability, not just the forward
        // direction.
        let requester = schedule(&[AvailabilityEntry::recurring(Weekday::Mon, 600, 720)]);
        let target = schedule(&[AvailabilityEntry::recurring(Weekday::Mon, 840, 960)]);

        // Requester's slot is outside the target's availability
        let requester_snapshot = vec![slot(480, 540)];
        let target_slot = slot(600, 660);
        let target_refs = vec![&target_slot];

        assert!(!mutually_exchangeable(
            &requester,
            &requester_snapshot,
            &target,
            &target_refs
        ));
    }

    #[test]
    fn test_empty_snapshot_fails() {
        let requester = schedule(&[AvailabilityEntry::recurring(Weekday::Mon, 0, 1440)]);
        let target = schedule(&[AvailabilityEntry::recurring(Weekday::Mon, 0, 1440)]);
        let target_slot = slot(600, 660);
        let target_refs = vec![&target_slot];

        assert!(!mutually_exchangeable(&requester, &[], &target, &target_refs));
    }

    #[test]
    fn test_predicate_is_symmetric_in_roles() {
        let avail_a = [AvailabilityEntry::recurring(Weekday::Mon, 600, 720)];
        let avail_b = [AvailabilityEntry::recurring(Weekday::Mon, 840, 960)];
        let schedule_a = schedule(&avail_a);
        let schedule_b = schedule(&avail_b);

        let slots_a = vec![slot(840, 900)];
        let slot_b = slot(600, 660);
        let refs_b = vec![&slot_b];

        let forward = mutually_exchangeable(&schedule_a, &slots_a, &schedule_b, &refs_b);

        // Swap roles: B requests A's slot
        let slots_b = vec![slot_b.clone()];
        let refs_a: Vec<&TimeSlot> = slots_a.iter().collect();
        let backward = mutually_exchangeable(&schedule_b, &slots_b, &schedule_a, &refs_a);

        assert_eq!(forward, backward);
    }
}

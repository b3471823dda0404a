//! The exchange and chain-reassignment engine
//!
//! Pure, synchronous logic over one in-memory [`Room`]. Persistence and
//! transport live elsewhere.

pub mod candidates;
pub mod chain;
pub mod exchange;
pub mod overlap;
pub mod requests;

pub use candidates::{find_candidates, Candidate};
pub use chain::{plan_chain, ChainPlan, PlannedHop};
pub use exchange::{mutually_exchangeable, slots_within_availability};
pub use overlap::{merged_window, overlapping_slots, user_covers_window};
pub use requests::{CreateRequestInput, Engine, EngineConfig};

use uuid::Uuid;

use crate::models::{Room, SlotWindow};
use crate::schedule::schedule_by_day;
use crate::time::ranges_overlap;

/// Can a slot physically land in this window?
///
/// Checks room-wide occupancy (minus slots scheduled for removal and plus
/// windows already claimed by planned moves), the owner-availability outer
/// bound, blocked windows, and business hours. Availability of the landing
/// user is the caller's concern.
pub fn window_placeable(
    room: &Room,
    window: &SlotWindow,
    removed: &[Uuid],
    claimed: &[SlotWindow],
) -> bool {
    if room.window_occupied(window, removed) {
        return false;
    }
    if claimed.iter().any(|w| w.overlaps(window)) {
        return false;
    }

    // Every slot must be a subset of the owner's synced availability.
    let owner_schedule = schedule_by_day(room.owner_availability(), window.date);
    if !owner_schedule.covers(window.weekday, window.start_minutes, window.end_minutes) {
        return false;
    }

    if let Some((open, close)) = room.settings.business_hours {
        if window.start_minutes < open || window.end_minutes > close {
            return false;
        }
    }

    for blocked in &room.settings.blocked_windows {
        let applies = match blocked.date {
            Some(date) => date == window.date,
            None => blocked.weekday == Some(window.weekday),
        };
        if applies
            && ranges_overlap(
                blocked.start_minutes,
                blocked.end_minutes,
                window.start_minutes,
                window.end_minutes,
            )
        {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AssignmentSource, AvailabilityEntry, Member, Room, TimeSlot,
    };
    use crate::time::Weekday;
    use chrono::NaiveDate;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    fn open_room() -> Room {
        let owner = Member::new(Uuid::new_v4(), "Owner".into())
            .with_availability(vec![AvailabilityEntry::recurring(Weekday::Mon, 480, 1080)]);
        Room::new("Studio".into(), owner)
    }

    #[test]
    fn test_owner_availability_is_outer_bound() {
        let room = open_room();
        assert!(window_placeable(
            &room,
            &SlotWindow::new(monday(), 600, 660),
            &[],
            &[]
        ));
        // 07:00 is before the owner opens at 08:00
        assert!(!window_placeable(
            &room,
            &SlotWindow::new(monday(), 420, 480),
            &[],
            &[]
        ));
    }

    #[test]
    fn test_occupied_unless_scheduled_for_removal() {
        let mut room = open_room();
        let slot = TimeSlot::new(
            Uuid::new_v4(),
            SlotWindow::new(monday(), 600, 660),
            AssignmentSource::AutoAssign,
        );
        let slot_id = slot.id;
        room.slots.push(slot);

        let window = SlotWindow::new(monday(), 600, 660);
        assert!(!window_placeable(&room, &window, &[], &[]));
        assert!(window_placeable(&room, &window, &[slot_id], &[]));
    }

    #[test]
    fn test_claimed_windows_block() {
        let room = open_room();
        let claimed = SlotWindow::new(monday(), 600, 660);
        assert!(!window_placeable(
            &room,
            &SlotWindow::new(monday(), 630, 690),
            &[],
            &[claimed]
        ));
    }

    #[test]
    fn test_blocked_window_applies_by_weekday() {
        let mut room = open_room();
        room.settings
            .blocked_windows
            .push(AvailabilityEntry::recurring(Weekday::Mon, 720, 780));

        assert!(!window_placeable(
            &room,
            &SlotWindow::new(monday(), 720, 750),
            &[],
            &[]
        ));
        assert!(window_placeable(
            &room,
            &SlotWindow::new(monday(), 780, 840),
            &[],
            &[]
        ));
    }

    #[test]
    fn test_business_hours_bound() {
        let mut room = open_room();
        room.settings.business_hours = Some((540, 1020));
        assert!(!window_placeable(
            &room,
            &SlotWindow::new(monday(), 480, 540),
            &[],
            &[]
        ));
        assert!(window_placeable(
            &room,
            &SlotWindow::new(monday(), 540, 600),
            &[],
            &[]
        ));
    }
}

//! Overlap scanner
//!
//! Finds existing slot assignments intersecting a time range. Used to
//! discover whose slot is in the way, and to re-verify candidates against
//! stale data before any physical move.

use uuid::Uuid;

use crate::models::{SlotWindow, TimeSlot};

/// All of `user_id`'s slots intersecting the window.
pub fn overlapping_slots<'a>(
    slots: &'a [TimeSlot],
    user_id: Uuid,
    window: &SlotWindow,
) -> Vec<&'a TimeSlot> {
    slots
        .iter()
        .filter(|s| s.user_id == user_id && s.overlaps_window(window))
        .collect()
}

/// Does `user_id` hold slots that together cover the whole window?
///
/// Slots are unit-sized and contiguous when they form a block, so coverage
/// means: sort the intersecting slots and walk them without leaving a gap.
pub fn user_covers_window(slots: &[TimeSlot], user_id: Uuid, window: &SlotWindow) -> bool {
    let mut owned = overlapping_slots(slots, user_id, window);
    owned.sort_by_key(|s| s.start_minutes);

    let mut cursor = window.start_minutes;
    for slot in owned {
        if slot.start_minutes > cursor {
            return false;
        }
        cursor = cursor.max(slot.end_minutes);
        if cursor >= window.end_minutes {
            return true;
        }
    }
    cursor >= window.end_minutes
}

/// The merged outer window of a non-empty, same-date slot group.
pub fn merged_window(slots: &[&TimeSlot]) -> Option<SlotWindow> {
    let first = slots.first()?;
    let start = slots.iter().map(|s| s.start_minutes).min()?;
    let end = slots.iter().map(|s| s.end_minutes).max()?;
    Some(SlotWindow::new(first.date, start, end))
}

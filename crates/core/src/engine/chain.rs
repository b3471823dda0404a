//! Chain planner
//!
//! When a displaced party has no free candidate of their own, the engine
//! looks for a further member whose occupied block sits inside the displaced
//! party's availability, and recurses: does *that* member have room? Each
//! level adds one negotiable hop. Greedy first-viable search, bounded by the
//! room's configured maximum depth.

use tracing::debug;
use uuid::Uuid;

use crate::models::{ChainMove, Room, SlotWindow, TimeSlot};
use crate::schedule::schedule_by_day;

use super::candidates::find_candidates;
use super::overlap::merged_window;
use super::window_placeable;

/// One future hop: a party who must consent to vacating these slots.
#[derive(Debug, Clone)]
pub struct PlannedHop {
    pub user_id: Uuid,
    pub vacated: Vec<TimeSlot>,
}

/// A fully planned displacement chain.
///
/// `moves` is the replay list (displaced-party first, deepest last);
/// `hops` lists the parties still needing their own negotiable request,
/// in the order their hops must be spawned.
#[derive(Debug, Clone)]
pub struct ChainPlan {
    pub moves: Vec<ChainMove>,
    pub hops: Vec<PlannedHop>,
}

struct Search<'a> {
    room: &'a Room,
    negotiated: SlotWindow,
    max_depth: u8,
}

/// Plan homes for `displaced_user`, spawning hops as needed.
///
/// `exclude` holds users who may not be drawn into the chain (the original
/// requester and everyone already displaced upstream); the room owner is
/// never a chain party. `removed` and `claimed` describe moves the caller
/// has already planned, so candidate checks see the future slot table.
pub fn plan_chain(
    room: &Room,
    displaced_user: Uuid,
    vacated: Vec<TimeSlot>,
    negotiated: &SlotWindow,
    exclude: &[Uuid],
    removed: &[Uuid],
    claimed: &[SlotWindow],
) -> Option<ChainPlan> {
    let search = Search {
        room,
        negotiated: *negotiated,
        max_depth: room.settings.max_chain_depth,
    };
    let mut exclude = exclude.to_vec();
    if !exclude.contains(&displaced_user) {
        exclude.push(displaced_user);
    }
    search.find_home(
        displaced_user,
        vacated,
        exclude,
        removed.to_vec(),
        claimed.to_vec(),
        0,
    )
}

impl Search<'_> {
    /// Find a landing window for `user`, directly or by displacing someone
    /// deeper. Returns the accumulated plan from this level down.
    fn find_home(
        &self,
        user: Uuid,
        vacated: Vec<TimeSlot>,
        exclude: Vec<Uuid>,
        mut removed: Vec<Uuid>,
        mut claimed: Vec<SlotWindow>,
        depth: u8,
    ) -> Option<ChainPlan> {
        let vacated_refs: Vec<&TimeSlot> = vacated.iter().collect();
        let origin = merged_window(&vacated_refs)?;
        let duration = origin.duration_minutes();
        removed.extend(vacated.iter().map(|s| s.id));

        let member = self.room.member(user)?;
        let schedule = schedule_by_day(&member.availability, origin.date);

        // Free candidate first: displace nobody.
        for candidate in find_candidates(&schedule, &origin, duration, &self.negotiated) {
            let window = candidate.window(duration);
            if window_placeable(self.room, &window, &removed, &claimed) {
                debug!(user = %user, date = %window.date, start = window.start_minutes,
                       "chain search found free candidate");
                return Some(ChainPlan {
                    moves: vec![ChainMove::Displacement {
                        user_id: user,
                        vacated,
                        window,
                    }],
                    hops: Vec::new(),
                });
            }
        }

        if depth >= self.max_depth {
            debug!(user = %user, depth, "chain search hit depth bound");
            return None;
        }

        // No free space: displace the first member holding a block inside
        // this user's availability who can themselves be rehomed.
        for next in &self.room.members {
            if next.user_id == self.room.owner_id || exclude.contains(&next.user_id) {
                continue;
            }
            for block in contiguous_blocks(self.room, next.user_id) {
                let take = take_leading(&block, duration);
                let Some(block_window) = merged_window(&take.iter().collect::<Vec<_>>()) else {
                    continue;
                };
                if !schedule.covers(
                    block_window.weekday,
                    block_window.start_minutes,
                    block_window.end_minutes,
                ) {
                    continue;
                }
                if block_window.overlaps(&self.negotiated)
                    || claimed.iter().any(|w| w.overlaps(&block_window))
                    || take.iter().any(|s| removed.contains(&s.id))
                {
                    continue;
                }

                let mut next_exclude = exclude.clone();
                next_exclude.push(next.user_id);
                let mut next_claimed = claimed.clone();
                next_claimed.push(block_window);

                if let Some(sub) = self.find_home(
                    next.user_id,
                    take.clone(),
                    next_exclude,
                    removed.clone(),
                    next_claimed,
                    depth + 1,
                ) {
                    let mut moves = vec![ChainMove::Displacement {
                        user_id: user,
                        vacated,
                        window: block_window,
                    }];
                    moves.extend(sub.moves);
                    let mut hops = vec![PlannedHop {
                        user_id: next.user_id,
                        vacated: take,
                    }];
                    hops.extend(sub.hops);
                    return Some(ChainPlan { moves, hops });
                }
            }
        }

        None
    }
}

/// A user's slots grouped into contiguous same-date blocks, sorted in time.
fn contiguous_blocks(room: &Room, user_id: Uuid) -> Vec<Vec<TimeSlot>> {
    let mut slots: Vec<TimeSlot> = room
        .slots
        .iter()
        .filter(|s| s.user_id == user_id)
        .cloned()
        .collect();
    slots.sort_by_key(|s| (s.date, s.start_minutes));

    let mut blocks: Vec<Vec<TimeSlot>> = Vec::new();
    for slot in slots {
        let joins = blocks
            .last()
            .and_then(|b| b.last())
            .is_some_and(|last| last.date == slot.date && last.end_minutes == slot.start_minutes);
        match blocks.last_mut() {
            Some(block) if joins => block.push(slot),
            _ => blocks.push(vec![slot]),
        }
    }
    blocks
}

/// The leading slots of a block summing to at least `duration` minutes.
/// The remainder of the block stays put, keeping slot-minutes conserved.
fn take_leading(block: &[TimeSlot], duration: u16) -> Vec<TimeSlot> {
    let mut taken = Vec::new();
    let mut total = 0u16;
    for slot in block {
        if total >= duration {
            break;
        }
        total += slot.duration_minutes();
        taken.push(slot.clone());
    }
    if total >= duration {
        taken
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssignmentSource, AvailabilityEntry, Member};
    use crate::time::Weekday;
    use chrono::NaiveDate;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    fn open_owner() -> Member {
        Member::new(Uuid::new_v4(), "Owner".into()).with_availability(vec![
            AvailabilityEntry::recurring(Weekday::Mon, 480, 1080),
            AvailabilityEntry::recurring(Weekday::Tue, 480, 1080),
        ])
    }

    fn add_slots(room: &mut Room, user: Uuid, start: u16, end: u16) -> Vec<Uuid> {
        let slots = crate::models::split_into_units(
            user,
            SlotWindow::new(monday(), start, end),
            30,
            AssignmentSource::AutoAssign,
        );
        let ids = slots.iter().map(|s| s.id).collect();
        room.slots.extend(slots);
        ids
    }

    /// B occupies 10:00-11:00 with no free availability; C holds 13:00-14:00
    /// (inside B's availability) and is free 15:00-16:00.
    fn chain_room() -> (Room, Uuid, Uuid) {
        let mut room = Room::new("Studio".into(), open_owner());
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        room.add_member(Member::new(b, "Bea".into()).with_availability(vec![
            AvailabilityEntry::recurring(Weekday::Mon, 600, 660),
            AvailabilityEntry::recurring(Weekday::Mon, 780, 840),
        ]));
        room.add_member(Member::new(c, "Cid".into()).with_availability(vec![
            AvailabilityEntry::recurring(Weekday::Mon, 780, 840),
            AvailabilityEntry::recurring(Weekday::Mon, 900, 960),
        ]));
        add_slots(&mut room, b, 600, 660);
        add_slots(&mut room, c, 780, 840);
        (room, b, c)
    }

    #[test]
    fn test_plans_single_hop_through_third_member() {
        let (room, b, c) = chain_room();
        let requester = Uuid::new_v4();
        let negotiated = SlotWindow::new(monday(), 600, 660);
        let vacated: Vec<TimeSlot> =
            room.slots_for(b).into_iter().cloned().collect();

        let plan = plan_chain(
            &room,
            b,
            vacated,
            &negotiated,
            &[requester, room.owner_id],
            &[],
            &[negotiated],
        )
        .expect("chain should resolve through Cid");

        assert_eq!(plan.hops.len(), 1);
        assert_eq!(plan.hops[0].user_id, c);
        assert_eq!(plan.moves.len(), 2);
        // B lands in C's 13:00 block, C lands in their free 15:00 block
        assert_eq!(plan.moves[0].user_id(), b);
        assert_eq!(plan.moves[0].window().start_minutes, 780);
        assert_eq!(plan.moves[1].user_id(), c);
        assert_eq!(plan.moves[1].window().start_minutes, 900);
    }

    #[test]
    fn test_requester_excluded_from_chain() {
        let (mut room, b, _c) = chain_room();
        // The requester occupies C's only free window, so the only way to
        // rehome C is to displace the requester. That path is forbidden.
        let requester = Uuid::new_v4();
        room.add_member(
            Member::new(requester, "Ann".into()).with_availability(vec![
                AvailabilityEntry::recurring(Weekday::Mon, 900, 960),
                AvailabilityEntry::recurring(Weekday::Tue, 600, 660),
            ]),
        );
        add_slots(&mut room, requester, 900, 960);
        let negotiated = SlotWindow::new(monday(), 600, 660);
        let vacated: Vec<TimeSlot> =
            room.slots_for(b).into_iter().cloned().collect();

        let plan = plan_chain(
            &room,
            b,
            vacated.clone(),
            &negotiated,
            &[requester, room.owner_id],
            &[],
            &[negotiated],
        );
        assert!(plan.is_none());

        // Sanity: with the exclusion lifted the chain resolves through Ann.
        let plan = plan_chain(
            &room,
            b,
            vacated,
            &negotiated,
            &[room.owner_id],
            &[],
            &[negotiated],
        );
        assert!(plan.is_some());
    }

    #[test]
    fn test_depth_bound_respected() {
        let (mut room, b, _c) = chain_room();
        room.settings.max_chain_depth = 0;
        let negotiated = SlotWindow::new(monday(), 600, 660);
        let vacated: Vec<TimeSlot> =
            room.slots_for(b).into_iter().cloned().collect();

        let plan = plan_chain(
            &room,
            b,
            vacated,
            &negotiated,
            &[room.owner_id],
            &[],
            &[negotiated],
        );
        assert!(plan.is_none());
    }

    #[test]
    fn test_two_hop_chain() {
        // B -> C -> D: C also has no free space, D absorbs the final move.
        let mut room = Room::new("Studio".into(), open_owner());
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let d = Uuid::new_v4();
        room.add_member(Member::new(b, "Bea".into()).with_availability(vec![
            AvailabilityEntry::recurring(Weekday::Mon, 600, 660),
            AvailabilityEntry::recurring(Weekday::Mon, 720, 780),
        ]));
        room.add_member(Member::new(c, "Cid".into()).with_availability(vec![
            AvailabilityEntry::recurring(Weekday::Mon, 720, 780),
            AvailabilityEntry::recurring(Weekday::Mon, 840, 900),
        ]));
        room.add_member(Member::new(d, "Dot".into()).with_availability(vec![
            AvailabilityEntry::recurring(Weekday::Mon, 840, 900),
            AvailabilityEntry::recurring(Weekday::Mon, 960, 1020),
        ]));
        add_slots(&mut room, b, 600, 660);
        add_slots(&mut room, c, 720, 780);
        add_slots(&mut room, d, 840, 900);

        let requester = Uuid::new_v4();
        let negotiated = SlotWindow::new(monday(), 600, 660);
        let vacated: Vec<TimeSlot> =
            room.slots_for(b).into_iter().cloned().collect();

        let plan = plan_chain(
            &room,
            b,
            vacated,
            &negotiated,
            &[requester, room.owner_id],
            &[],
            &[negotiated],
        )
        .expect("two-hop chain should resolve");

        assert_eq!(plan.hops.len(), 2);
        assert_eq!(plan.hops[0].user_id, c);
        assert_eq!(plan.hops[1].user_id, d);
        assert_eq!(plan.moves.len(), 3);
        // Everyone lands inside their own availability, nobody overlaps
        assert_eq!(plan.moves[0].window().start_minutes, 720); // B
        assert_eq!(plan.moves[1].window().start_minutes, 840); // C
        assert_eq!(plan.moves[2].window().start_minutes, 960); // D
    }

    #[test]
    fn test_contiguous_blocks_grouping() {
        let mut room = Room::new("Studio".into(), open_owner());
        let u = Uuid::new_v4();
        add_slots(&mut room, u, 600, 660);
        add_slots(&mut room, u, 720, 750);

        let blocks = contiguous_blocks(&room, u);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].len(), 2);
        assert_eq!(blocks[1].len(), 1);
    }

    #[test]
    fn test_take_leading_requires_enough_minutes() {
        let mut room = Room::new("Studio".into(), open_owner());
        let u = Uuid::new_v4();
        add_slots(&mut room, u, 600, 660);
        let block = contiguous_blocks(&room, u).remove(0);

        assert_eq!(take_leading(&block, 30).len(), 1);
        assert_eq!(take_leading(&block, 60).len(), 2);
        assert!(take_leading(&block, 90).is_empty());
    }
}

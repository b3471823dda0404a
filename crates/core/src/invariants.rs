//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use crate::models::{Room, RequestStatus};

/// Validate that a Room's state is internally consistent
pub fn assert_room_invariants(room: &Room) {
    // Name must not be empty
    debug_assert!(
        !room.name.trim().is_empty(),
        "Room {} has empty name",
        room.id
    );

    // The owner is always a member
    debug_assert!(
        room.is_member(room.owner_id),
        "Room {} owner {} is not in the member list",
        room.id,
        room.owner_id
    );

    // The owner never holds a slot; the owner's time is what is divided up
    debug_assert!(
        room.slots.iter().all(|s| s.user_id != room.owner_id),
        "Room {} has a slot assigned to its owner",
        room.id
    );

    // No two slots may overlap: the room is a single shared resource
    for (i, a) in room.slots.iter().enumerate() {
        for b in room.slots.iter().skip(i + 1) {
            debug_assert!(
                !a.overlaps_window(&b.window()),
                "Room {} has overlapping slots {} and {}",
                room.id,
                a.id,
                b.id
            );
        }
    }

    // Chain hops must point at an existing, non-cancelled root
    for request in &room.requests {
        if let Some(chain) = &request.chain {
            if request.kind.is_chain_hop() && request.status == RequestStatus::Pending {
                debug_assert!(
                    room.request(chain.root_request_id).is_some(),
                    "Hop {} references missing root {}",
                    request.id,
                    chain.root_request_id
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Member;
    use uuid::Uuid;

    #[test]
    fn test_fresh_room_passes_invariants() {
        let room = Room::new("Studio".into(), Member::new(Uuid::new_v4(), "Owner".into()));
        assert_room_invariants(&room);
    }
}

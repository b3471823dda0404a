//! Request state machine
//!
//! Owns the lifecycle of a negotiation request and is the only code that
//! mutates a room's slot table. Transitions:
//!
//! ```text
//! pending -> approved | rejected | cancelled
//!          | waiting_for_chain | needs_chain_confirmation
//! waiting_for_chain -> approved | rejected   (via the child hop)
//! needs_chain_confirmation -> pending (proceed, immediately re-suspended)
//!                           | cancelled (decline)
//! ```

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{
    split_into_units, AssignmentSource, ChainData, ChainMove, PendingHop, Request, RequestKind,
    RequestStatus, Room, SlotWindow, TimeSlot,
};
use crate::schedule::schedule_by_day;
use crate::time::{to_time_string, DayLabels};

use super::candidates::find_candidates;
use super::chain::plan_chain;
use super::exchange::mutually_exchangeable;
use super::overlap::{merged_window, overlapping_slots, user_covers_window};
use super::window_placeable;

/// Injected engine configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub day_labels: DayLabels,
}

/// Input for creating a request. Chain hops are engine-spawned, never
/// created through this.
#[derive(Debug, Clone)]
pub struct CreateRequestInput {
    pub kind: RequestKind,
    pub requester_id: Uuid,
    pub target_user_id: Option<Uuid>,
    pub target_slot_id: Option<Uuid>,
    pub window: SlotWindow,
    pub message: Option<String>,
}

/// The exchange engine. Stateless apart from injected configuration; every
/// operation is a synchronous mutation of one room.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn day_labels(&self) -> &DayLabels {
        &self.config.day_labels
    }

    // ---- creation ----------------------------------------------------

    pub fn create_request(
        &self,
        room: &mut Room,
        input: CreateRequestInput,
        now: DateTime<Utc>,
    ) -> Result<Uuid> {
        if input.kind.is_chain_hop() {
            return Err(Error::InvalidOperation(
                "chain hops are created by the engine, not by members".into(),
            ));
        }
        if !room.is_member(input.requester_id) {
            return Err(Error::PermissionDenied(
                "requester is not a member of this room".into(),
            ));
        }
        if input.requester_id == room.owner_id {
            return Err(Error::PermissionDenied(
                "the room owner cannot request exchanges".into(),
            ));
        }
        if input.window.start_minutes >= input.window.end_minutes {
            return Err(Error::validation("time range is empty or inverted"));
        }

        if let Some(target) = input.target_user_id {
            if !room.is_member(target) {
                return Err(Error::NotFound("target user is not in this room".into()));
            }
            if target == input.requester_id {
                return Err(Error::validation("cannot target yourself"));
            }
            if target == room.owner_id {
                return Err(Error::PermissionDenied(
                    "the room owner cannot be displaced".into(),
                ));
            }
        }

        if let Some(slot_id) = input.target_slot_id {
            let slot = room
                .slot(slot_id)
                .ok_or_else(|| Error::NotFound("target slot does not exist".into()))?;
            if input.target_user_id.is_some_and(|t| t != slot.user_id) {
                return Err(Error::validation("target slot belongs to someone else"));
            }
        }
        if input.kind == RequestKind::SlotSwap && input.target_slot_id.is_none() {
            return Err(Error::validation("slot_swap requires a target slot"));
        }

        let duplicate = room.requests.iter().any(|r| {
            r.requester_id == input.requester_id
                && r.kind == input.kind
                && r.window == input.window
                && r.target_user_id == input.target_user_id
                && !r.status.is_terminal()
        });
        if duplicate {
            return Err(Error::duplicate(
                "an identical request is already pending",
            ));
        }

        let snapshot: Vec<TimeSlot> = room
            .slots_for(input.requester_id)
            .into_iter()
            .cloned()
            .collect();

        if input.kind == RequestKind::TimeChange && snapshot.is_empty() {
            return Err(Error::validation(
                "nothing to change: requester holds no slots",
            ));
        }

        self.check_travel_feasibility(room, &snapshot, &input.window)?;

        let message = self.describe_request(room, &input);
        let request_id = {
            let mut request =
                Request::new(input.kind, input.requester_id, input.window)
                    .with_message(message)
                    .with_requester_slots(snapshot);
            if let Some(target) = input.target_user_id {
                request = request.with_target(target);
            }
            if let Some(slot_id) = input.target_slot_id {
                request = request.with_target_slot(slot_id);
            }
            request.created_at = now;
            let id = request.id;
            room.requests.push(request);
            id
        };

        room.touch(now);
        info!(request = %request_id, kind = ?input.kind, "request created");
        Ok(request_id)
    }

    /// Travel-time simulation: a new engagement must not begin or end within
    /// the configured buffer of another same-day slot. Back-to-back slots
    /// (zero gap) extend a block and are always fine.
    fn check_travel_feasibility(
        &self,
        room: &Room,
        slots: &[TimeSlot],
        window: &SlotWindow,
    ) -> Result<()> {
        let buffer = room.settings.travel_buffer_minutes;
        if buffer == 0 {
            return Ok(());
        }
        for slot in slots.iter().filter(|s| s.date == window.date) {
            let gap = if slot.end_minutes <= window.start_minutes {
                window.start_minutes - slot.end_minutes
            } else if window.end_minutes <= slot.start_minutes {
                slot.start_minutes - window.end_minutes
            } else {
                continue;
            };
            if gap > 0 && gap < buffer {
                return Err(Error::validation(format!(
                    "slot is infeasible: only {gap} minutes of travel time next to an existing engagement"
                )));
            }
        }
        Ok(())
    }

    // ---- responses ---------------------------------------------------

    /// Approve or reject a pending request as the addressed respondent.
    ///
    /// Negotiation exhaustion is a normal outcome: the returned status may
    /// be `Rejected` even for an approval, with the explanation recorded on
    /// the request.
    pub fn respond(
        &self,
        room: &mut Room,
        request_id: Uuid,
        responder_id: Uuid,
        approve: bool,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<RequestStatus> {
        let request = room
            .request(request_id)
            .cloned()
            .ok_or_else(|| Error::NotFound("request not found".into()))?;

        if request.status != RequestStatus::Pending {
            return Err(Error::InvalidOperation(format!(
                "request is {:?}, not pending",
                request.status
            )));
        }
        let expected = request.target_user_id.unwrap_or(room.owner_id);
        if responder_id != expected {
            return Err(Error::PermissionDenied(
                "only the addressed member may respond to this request".into(),
            ));
        }

        let status = if approve {
            self.approve(room, &request, responder_id, message, now)?
        } else {
            self.reject(room, &request, responder_id, message, now)
        };
        room.touch(now);
        Ok(status)
    }

    fn reject(
        &self,
        room: &mut Room,
        request: &Request,
        responder_id: Uuid,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> RequestStatus {
        if let Some(r) = room.request_mut(request.id) {
            r.respond(RequestStatus::Rejected, responder_id, message, now);
        }
        info!(request = %request.id, "request rejected");

        // Rejection of a hop unwinds the whole chain, synchronously, with
        // no slot mutation anywhere.
        if let Some(chain) = &request.chain {
            let respondent = request.target_user_id.unwrap_or(responder_id);
            let reason = format!(
                "Chain request declined: no available slot for {}",
                room.display_name(respondent)
            );
            self.cascade_rejection(room, chain.root_request_id, request.id, &reason, now);
        }
        RequestStatus::Rejected
    }

    fn cascade_rejection(
        &self,
        room: &mut Room,
        root_id: Uuid,
        rejected_hop: Uuid,
        reason: &str,
        now: DateTime<Utc>,
    ) {
        let owner = room.owner_id;
        for r in room.requests.iter_mut() {
            if r.id == rejected_hop || r.status.is_terminal() {
                continue;
            }
            let in_chain = r.id == root_id
                || r.chain
                    .as_ref()
                    .is_some_and(|c| c.root_request_id == root_id);
            if in_chain {
                r.respond(RequestStatus::Rejected, owner, Some(reason.to_string()), now);
                debug!(request = %r.id, "rejection cascaded to chain member");
            }
        }
    }

    fn approve(
        &self,
        room: &mut Room,
        request: &Request,
        responder_id: Uuid,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<RequestStatus> {
        match request.kind {
            RequestKind::SlotRelease => {
                let ids: Vec<Uuid> =
                    overlapping_slots(&room.slots, request.requester_id, &request.window)
                        .iter()
                        .map(|s| s.id)
                        .collect();
                room.remove_slots(&ids);
                self.finish(room, request.id, RequestStatus::Approved, responder_id, message, now);
                Ok(RequestStatus::Approved)
            }
            RequestKind::SlotSwap => {
                let slot_id = request
                    .target_slot_id
                    .ok_or_else(|| Error::validation("slot_swap without a target slot"))?;
                let requester = request.requester_id;
                let slot = room
                    .slots
                    .iter_mut()
                    .find(|s| s.id == slot_id)
                    .ok_or_else(|| Error::NotFound("target slot no longer exists".into()))?;
                slot.user_id = requester;
                slot.assigned_by = AssignmentSource::RequestApproval;
                slot.assigned_at = now;
                self.finish(room, request.id, RequestStatus::Approved, responder_id, message, now);
                Ok(RequestStatus::Approved)
            }
            RequestKind::TimeRequest | RequestKind::TimeChange => {
                self.negotiate_time(room, request, responder_id, message, now)
            }
            RequestKind::ChainRequest | RequestKind::ChainExchangeRequest => {
                self.approve_hop(room, request, responder_id, message, now)
            }
        }
    }

    fn finish(
        &self,
        room: &mut Room,
        request_id: Uuid,
        status: RequestStatus,
        responder_id: Uuid,
        message: Option<String>,
        now: DateTime<Utc>,
    ) {
        if let Some(r) = room.request_mut(request_id) {
            r.respond(status, responder_id, message, now);
        }
    }

    /// The search pipeline for time requests: idempotence, direct placement,
    /// direct exchange, displacement, chain.
    fn negotiate_time(
        &self,
        room: &mut Room,
        request: &Request,
        responder_id: Uuid,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<RequestStatus> {
        let requester = request.requester_id;
        let window = request.window;

        // Idempotent re-request: the range is already fully held.
        if user_covers_window(&room.slots, requester, &window) {
            self.finish(room, request.id, RequestStatus::Approved, responder_id, message, now);
            return Ok(RequestStatus::Approved);
        }

        // For a time change the requester's current slots are forfeited and
        // may be landed on by displaced parties.
        let removed_self: Vec<Uuid> = if request.kind == RequestKind::TimeChange {
            request
                .requester_slots
                .iter()
                .filter(|s| room.slot(s.id).is_some())
                .map(|s| s.id)
                .collect()
        } else {
            Vec::new()
        };

        let in_the_way: Vec<&TimeSlot> = room
            .slots
            .iter()
            .filter(|s| !removed_self.contains(&s.id) && s.overlaps_window(&window))
            .collect();
        // Partial overlap with the requester's own holdings resolves the
        // same way as the fully-held range: approve without touching the
        // slot table.
        if in_the_way.iter().any(|s| s.user_id == requester) {
            self.finish(room, request.id, RequestStatus::Approved, responder_id, message, now);
            return Ok(RequestStatus::Approved);
        }

        let mut occupants: Vec<Uuid> = in_the_way.iter().map(|s| s.user_id).collect();
        occupants.sort();
        occupants.dedup();

        match occupants.len() {
            // Nobody in the way: plain placement.
            0 => {
                if window_placeable(room, &window, &removed_self, &[]) {
                    room.remove_slots(&removed_self);
                    let unit = room.settings.slot_unit_minutes;
                    room.slots.extend(split_into_units(
                        requester,
                        window,
                        unit,
                        AssignmentSource::RequestApproval,
                    ));
                    self.finish(room, request.id, RequestStatus::Approved, responder_id, message, now);
                    Ok(RequestStatus::Approved)
                } else {
                    let reason =
                        "The requested range is outside the bookable hours of this room".to_string();
                    self.finish(room, request.id, RequestStatus::Rejected, responder_id, Some(reason), now);
                    Ok(RequestStatus::Rejected)
                }
            }
            1 => self.negotiate_against(
                room,
                request,
                occupants[0],
                removed_self,
                responder_id,
                message,
                now,
            ),
            _ => {
                let reason = "The requested range spans more than one member's slots".to_string();
                self.finish(room, request.id, RequestStatus::Rejected, responder_id, Some(reason), now);
                Ok(RequestStatus::Rejected)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn negotiate_against(
        &self,
        room: &mut Room,
        request: &Request,
        target: Uuid,
        removed_self: Vec<Uuid>,
        responder_id: Uuid,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<RequestStatus> {
        let requester = request.requester_id;
        let window = request.window;
        let unit = room.settings.slot_unit_minutes;

        let target_slots: Vec<TimeSlot> = overlapping_slots(&room.slots, target, &window)
            .into_iter()
            .cloned()
            .collect();
        let target_refs: Vec<&TimeSlot> = target_slots.iter().collect();
        let target_ids: Vec<Uuid> = target_slots.iter().map(|s| s.id).collect();
        let landing = merged_window(&target_refs)
            .ok_or_else(|| Error::InvalidOperation("occupant without slots".into()))?;

        let requester_member = room
            .member(requester)
            .ok_or_else(|| Error::NotFound("requester left the room".into()))?;
        let target_member = room
            .member(target)
            .ok_or_else(|| Error::NotFound("target left the room".into()))?;
        let requester_schedule = schedule_by_day(&requester_member.availability, window.date);
        let target_schedule = schedule_by_day(&target_member.availability, window.date);

        // O(1) mutual swap before any search. The snapshot may be stale, so
        // only slots still present count, and every landing window is
        // re-verified against the live table before anything moves. A swap
        // that is no longer sound falls through to the search path.
        let live_snapshot: Vec<TimeSlot> = request
            .requester_slots
            .iter()
            .filter(|s| room.slot(s.id).is_some())
            .cloned()
            .collect();
        if mutually_exchangeable(
            &requester_schedule,
            &live_snapshot,
            &target_schedule,
            &target_refs,
        ) {
            let snapshot_ids: Vec<Uuid> = live_snapshot.iter().map(|s| s.id).collect();
            let mut removed = target_ids.clone();
            removed.extend(&snapshot_ids);

            let mut claimed: Vec<SlotWindow> = Vec::new();
            let sound = target_slots
                .iter()
                .chain(live_snapshot.iter())
                .map(|s| s.window())
                .all(|w| {
                    let free = window_placeable(room, &w, &removed, &claimed);
                    claimed.push(w);
                    free
                });

            if sound {
                debug!(request = %request.id, "direct exchange");
                room.remove_slots(&target_ids);
                room.remove_slots(&snapshot_ids);
                for slot in &target_slots {
                    room.slots.extend(split_into_units(
                        requester,
                        slot.window(),
                        unit,
                        AssignmentSource::DirectExchange,
                    ));
                }
                for slot in &live_snapshot {
                    room.slots.extend(split_into_units(
                        target,
                        slot.window(),
                        unit,
                        AssignmentSource::DirectExchange,
                    ));
                }
                self.finish(room, request.id, RequestStatus::Approved, responder_id, message, now);
                return Ok(RequestStatus::Approved);
            }
            debug!(request = %request.id, "direct exchange no longer sound");
        }

        // Displacement: relocate the target into their own free availability.
        let duration = landing.duration_minutes();
        let mut ignore = target_ids.clone();
        ignore.extend(&removed_self);
        for candidate in find_candidates(&target_schedule, &landing, duration, &window) {
            let destination = candidate.window(duration);
            if !window_placeable(room, &destination, &ignore, &[landing]) {
                continue;
            }
            debug!(request = %request.id, date = %destination.date,
                   start = destination.start_minutes, "displacement candidate accepted");
            room.remove_slots(&target_ids);
            room.remove_slots(&removed_self);
            room.slots.extend(split_into_units(
                target,
                destination,
                unit,
                AssignmentSource::RequestApproval,
            ));
            room.slots.extend(split_into_units(
                requester,
                landing,
                unit,
                AssignmentSource::RequestApproval,
            ));
            self.finish(room, request.id, RequestStatus::Approved, responder_id, message, now);
            return Ok(RequestStatus::Approved);
        }

        // No room anywhere for the target: try to build a chain.
        let plan = plan_chain(
            room,
            target,
            target_slots.clone(),
            &window,
            &[requester, room.owner_id],
            &removed_self,
            &[landing],
        );

        let Some(plan) = plan else {
            let reason = format!(
                "No direct exchange was possible, {} has no free slot, and no chain candidate exists",
                room.display_name(target)
            );
            self.finish(room, request.id, RequestStatus::Rejected, responder_id, Some(reason), now);
            return Ok(RequestStatus::Rejected);
        };

        // The requester's own move heads the replay list.
        let first_move = if removed_self.is_empty() {
            ChainMove::Direct {
                user_id: requester,
                window: landing,
            }
        } else {
            ChainMove::Displacement {
                user_id: requester,
                vacated: request
                    .requester_slots
                    .iter()
                    .filter(|s| removed_self.contains(&s.id))
                    .cloned()
                    .collect(),
                window: landing,
            }
        };
        let mut moves = vec![first_move];
        moves.extend(plan.moves);
        let hops: Vec<PendingHop> = plan
            .hops
            .into_iter()
            .map(|h| PendingHop {
                user_id: h.user_id,
                vacated: h.vacated,
            })
            .collect();

        if room.settings.require_chain_confirmation {
            // The requester must opt into the multi-hop plan first.
            let chain = ChainData {
                root_request_id: request.id,
                parent_request_id: None,
                depth: 0,
                intermediate_user_id: target,
                vacated: target_slots,
                moves,
                remaining: hops,
            };
            if let Some(r) = room.request_mut(request.id) {
                r.chain = Some(chain);
                r.status = RequestStatus::NeedsChainConfirmation;
            }
            info!(request = %request.id, "chain plan awaiting requester confirmation");
            return Ok(RequestStatus::NeedsChainConfirmation);
        }

        self.spawn_hop(room, request.id, None, 1, request, target, moves, hops, now)?;
        if let Some(r) = room.request_mut(request.id) {
            r.respond(RequestStatus::WaitingForChain, responder_id, message, now);
        }
        Ok(RequestStatus::WaitingForChain)
    }

    /// Create the next negotiable hop request.
    #[allow(clippy::too_many_arguments)]
    fn spawn_hop(
        &self,
        room: &mut Room,
        root_id: Uuid,
        parent_id: Option<Uuid>,
        depth: u8,
        root: &Request,
        displaced_for: Uuid,
        moves: Vec<ChainMove>,
        mut remaining: Vec<PendingHop>,
        now: DateTime<Utc>,
    ) -> Result<Uuid> {
        if remaining.is_empty() {
            return Err(Error::InvalidOperation("no hop left to spawn".into()));
        }
        let hop = remaining.remove(0);
        let hop_refs: Vec<&TimeSlot> = hop.vacated.iter().collect();
        let hop_window = merged_window(&hop_refs)
            .ok_or_else(|| Error::InvalidOperation("hop with no slots to vacate".into()))?;

        let kind = if depth <= 1 {
            RequestKind::ChainRequest
        } else {
            RequestKind::ChainExchangeRequest
        };
        let text = format!(
            "{} asks {} to give up {} so that {} can move there",
            room.display_name(root.requester_id),
            room.display_name(hop.user_id),
            self.window_text(&hop_window),
            room.display_name(displaced_for),
        );

        let mut hop_request = Request::new(kind, root.requester_id, hop_window)
            .with_target(hop.user_id)
            .with_message(text)
            .with_requester_slots(root.requester_slots.clone())
            .with_chain(ChainData {
                root_request_id: root_id,
                parent_request_id: parent_id,
                depth,
                intermediate_user_id: displaced_for,
                vacated: hop.vacated,
                moves,
                remaining,
            });
        hop_request.created_at = now;
        let id = hop_request.id;
        room.requests.push(hop_request);
        info!(hop = %id, root = %root_id, depth, "chain hop spawned");
        Ok(id)
    }

    /// A hop was approved: spawn the next hop, or replay the whole plan.
    fn approve_hop(
        &self,
        room: &mut Room,
        request: &Request,
        responder_id: Uuid,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<RequestStatus> {
        let chain = request
            .chain
            .clone()
            .ok_or_else(|| Error::InvalidOperation("chain hop without chain data".into()))?;

        if !chain.remaining.is_empty() {
            // This respondent consented, but someone deeper must still agree.
            let respondent = request
                .target_user_id
                .ok_or_else(|| Error::InvalidOperation("hop without respondent".into()))?;
            self.spawn_hop(
                room,
                chain.root_request_id,
                Some(request.id),
                chain.depth + 1,
                request,
                respondent,
                chain.moves,
                chain.remaining,
                now,
            )?;
            if let Some(r) = room.request_mut(request.id) {
                r.respond(RequestStatus::WaitingForChain, responder_id, message, now);
            }
            return Ok(RequestStatus::WaitingForChain);
        }

        // Leaf approval: every party consented. Re-verify against the live
        // slot table, then replay all moves atomically.
        if let Err(reason) = self.verify_moves(room, &chain.moves) {
            let status = self.reject(
                room,
                request,
                responder_id,
                Some(format!("Chain plan is no longer valid: {reason}")),
                now,
            );
            return Ok(status);
        }

        let unit = room.settings.slot_unit_minutes;
        let all_removed: Vec<Uuid> = chain
            .moves
            .iter()
            .flat_map(|m| m.vacated().iter().map(|s| s.id))
            .collect();
        room.remove_slots(&all_removed);
        for mv in &chain.moves {
            room.slots.extend(split_into_units(
                mv.user_id(),
                *mv.window(),
                unit,
                AssignmentSource::ChainResolution,
            ));
        }

        self.finish(room, request.id, RequestStatus::Approved, responder_id, message, now);
        let resolved = format!(
            "Chain resolved: all {} moves applied",
            chain.moves.len()
        );
        self.cascade_approval(room, chain.root_request_id, request.id, &resolved, now);
        info!(root = %chain.root_request_id, moves = chain.moves.len(), "chain replayed");
        Ok(RequestStatus::Approved)
    }

    /// Stale-data defense before replay: every vacated slot must still exist
    /// and every landing window must be free once the vacated slots go.
    fn verify_moves(&self, room: &Room, moves: &[ChainMove]) -> std::result::Result<(), String> {
        let all_removed: Vec<Uuid> = moves
            .iter()
            .flat_map(|m| m.vacated().iter().map(|s| s.id))
            .collect();
        for (i, mv) in moves.iter().enumerate() {
            for slot in mv.vacated() {
                if room.slot(slot.id).is_none() {
                    return Err(format!(
                        "a slot of {} was deleted in the meantime",
                        room.display_name(mv.user_id())
                    ));
                }
            }
            let claimed: Vec<SlotWindow> =
                moves[..i].iter().map(|m| *m.window()).collect();
            if !window_placeable(room, mv.window(), &all_removed, &claimed) {
                return Err(format!(
                    "the landing window {} is no longer free",
                    self.window_text(mv.window())
                ));
            }
        }
        Ok(())
    }

    fn cascade_approval(
        &self,
        room: &mut Room,
        root_id: Uuid,
        leaf_id: Uuid,
        note: &str,
        now: DateTime<Utc>,
    ) {
        let owner = room.owner_id;
        for r in room.requests.iter_mut() {
            if r.id == leaf_id || r.status.is_terminal() {
                continue;
            }
            let in_chain = r.id == root_id
                || r.chain
                    .as_ref()
                    .is_some_and(|c| c.root_request_id == root_id);
            if in_chain {
                r.respond(RequestStatus::Approved, owner, Some(note.to_string()), now);
            }
        }
    }

    // ---- cancellation and chain confirmation -------------------------

    /// Only the original requester may cancel, and only while pending.
    pub fn cancel(
        &self,
        room: &mut Room,
        request_id: Uuid,
        caller: Uuid,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let request = room
            .request(request_id)
            .ok_or_else(|| Error::NotFound("request not found".into()))?;
        if request.requester_id != caller {
            return Err(Error::PermissionDenied(
                "only the requester may cancel a request".into(),
            ));
        }
        // Hops resolve through approval or rejection so the ancestor always
        // reaches a terminal state; cancelling one would strand the chain.
        if request.kind.is_chain_hop() {
            return Err(Error::InvalidOperation(
                "chain hops cannot be cancelled; reject the hop instead".into(),
            ));
        }
        if request.status != RequestStatus::Pending {
            return Err(Error::InvalidOperation(
                "only pending requests can be cancelled".into(),
            ));
        }
        if let Some(r) = room.request_mut(request_id) {
            r.status = RequestStatus::Cancelled;
        }
        room.touch(now);
        info!(request = %request_id, "request cancelled");
        Ok(())
    }

    /// Resolve a `needs_chain_confirmation` request: proceed spawns the
    /// first hop; declining simply cancels.
    pub fn chain_confirm(
        &self,
        room: &mut Room,
        request_id: Uuid,
        caller: Uuid,
        proceed: bool,
        now: DateTime<Utc>,
    ) -> Result<RequestStatus> {
        let request = room
            .request(request_id)
            .cloned()
            .ok_or_else(|| Error::NotFound("request not found".into()))?;
        if request.requester_id != caller {
            return Err(Error::PermissionDenied(
                "only the requester may confirm a chain".into(),
            ));
        }
        if request.status != RequestStatus::NeedsChainConfirmation {
            return Err(Error::InvalidOperation(
                "request is not awaiting chain confirmation".into(),
            ));
        }

        if !proceed {
            if let Some(r) = room.request_mut(request_id) {
                r.status = RequestStatus::Cancelled;
            }
            room.touch(now);
            return Ok(RequestStatus::Cancelled);
        }

        let chain = request
            .chain
            .clone()
            .ok_or_else(|| Error::InvalidOperation("no chain plan stored".into()))?;

        // Back through pending, then immediately suspended on the new hop.
        if let Some(r) = room.request_mut(request_id) {
            r.status = RequestStatus::Pending;
        }
        self.spawn_hop(
            room,
            request_id,
            None,
            1,
            &request,
            chain.intermediate_user_id,
            chain.moves,
            chain.remaining,
            now,
        )?;
        if let Some(r) = room.request_mut(request_id) {
            r.status = RequestStatus::WaitingForChain;
        }
        room.touch(now);
        Ok(RequestStatus::WaitingForChain)
    }

    // ---- messages ----------------------------------------------------

    fn window_text(&self, window: &SlotWindow) -> String {
        format!(
            "{} {}-{} ({})",
            self.config.day_labels.label(window.weekday),
            to_time_string(window.start_minutes),
            to_time_string(window.end_minutes),
            window.date
        )
    }

    fn describe_request(&self, room: &Room, input: &CreateRequestInput) -> String {
        let who = room.display_name(input.requester_id);
        let when = self.window_text(&input.window);
        let base = match (input.kind, input.target_user_id) {
            (RequestKind::TimeRequest, Some(t)) => {
                format!("{who} asks to take {when} from {}", room.display_name(t))
            }
            (RequestKind::TimeRequest, None) => format!("{who} asks for {when}"),
            (RequestKind::TimeChange, Some(t)) => format!(
                "{who} wants to move their time to {when}, displacing {}",
                room.display_name(t)
            ),
            (RequestKind::TimeChange, None) => {
                format!("{who} wants to move their time to {when}")
            }
            (RequestKind::SlotSwap, Some(t)) => {
                format!("{who} proposes a swap with {} for {when}", room.display_name(t))
            }
            (RequestKind::SlotSwap, None) => format!("{who} proposes a swap for {when}"),
            (RequestKind::SlotRelease, _) => format!("{who} offers to release {when}"),
            (RequestKind::ChainRequest | RequestKind::ChainExchangeRequest, _) => {
                // Never reached: hops are engine-spawned with their own text.
                format!("{who}: chain hop at {when}")
            }
        };
        match &input.message {
            Some(note) if !note.is_empty() => format!("{base} ({note})"),
            _ => base,
        }
    }
}

//! Negotiation request model
//!
//! A request is the unit of renegotiation: a proposal that one member takes
//! over, changes, or releases slot time, resolved through approval or
//! rejection by the addressed party. Chain hops are requests too, linked
//! back to their originating request through [`ChainData`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::slot::{SlotWindow, TimeSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Mutual swap against an explicitly named slot.
    SlotSwap,
    /// Requester wants a time range, displacing the target if needed.
    TimeRequest,
    /// Requester moves their own occupied time to a new range.
    TimeChange,
    /// Requester gives a slot back.
    SlotRelease,
    /// First hop of a displacement chain.
    ChainRequest,
    /// Deeper hop of a displacement chain.
    ChainExchangeRequest,
}

impl RequestKind {
    pub fn is_chain_hop(self) -> bool {
        matches!(
            self,
            RequestKind::ChainRequest | RequestKind::ChainExchangeRequest
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    /// A hop was spawned; this request is suspended pending its outcome.
    WaitingForChain,
    /// The requester must opt into a multi-hop plan before it proceeds.
    NeedsChainConfirmation,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestStatus::Approved | RequestStatus::Rejected | RequestStatus::Cancelled
        )
    }
}

/// Who answered and what they said.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestResponse {
    pub responder_id: Uuid,
    pub message: Option<String>,
    pub responded_at: DateTime<Utc>,
}

/// One physical relocation, replayed in order once the chain leaf approves.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainMove {
    /// Assign `user_id` into `window` without displacing anyone.
    Direct { user_id: Uuid, window: SlotWindow },
    /// Remove `vacated` and assign `user_id` into `window`.
    Displacement {
        user_id: Uuid,
        vacated: Vec<TimeSlot>,
        window: SlotWindow,
    },
}

impl ChainMove {
    pub fn user_id(&self) -> Uuid {
        match self {
            ChainMove::Direct { user_id, .. } => *user_id,
            ChainMove::Displacement { user_id, .. } => *user_id,
        }
    }

    pub fn window(&self) -> &SlotWindow {
        match self {
            ChainMove::Direct { window, .. } => window,
            ChainMove::Displacement { window, .. } => window,
        }
    }

    pub fn vacated(&self) -> &[TimeSlot] {
        match self {
            ChainMove::Direct { .. } => &[],
            ChainMove::Displacement { vacated, .. } => vacated,
        }
    }
}

/// A party who still needs their own negotiable hop, with the slots that
/// hop will ask them to vacate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingHop {
    pub user_id: Uuid,
    pub vacated: Vec<TimeSlot>,
}

/// Chain metadata carried by hop requests (and, in confirmation-gated mode,
/// by the suspended originating request).
///
/// The move list is the complete accumulated plan; each hop snapshots the
/// slots its respondent must vacate so the plan can be replayed precisely or
/// unwound without touching the slot table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainData {
    /// The originating (ancestor) request.
    pub root_request_id: Uuid,
    /// The immediately preceding hop, if this is not the first.
    pub parent_request_id: Option<Uuid>,
    /// 1 for the first hop beyond the original target.
    pub depth: u8,
    /// The displaced party this hop makes room for.
    pub intermediate_user_id: Uuid,
    /// Slots the respondent of this hop must give up.
    pub vacated: Vec<TimeSlot>,
    /// All planned moves, root first.
    pub moves: Vec<ChainMove>,
    /// Parties that still need their own hop after this one approves.
    pub remaining: Vec<PendingHop>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: Uuid,
    pub kind: RequestKind,
    pub requester_id: Uuid,
    pub target_user_id: Option<Uuid>,
    pub target_slot_id: Option<Uuid>,
    /// The time range under negotiation.
    pub window: SlotWindow,
    /// Snapshot of the requester's slots at creation time; slots may be
    /// deleted before the request is resolved.
    pub requester_slots: Vec<TimeSlot>,
    pub status: RequestStatus,
    /// Human-readable description, auto-generated at creation.
    pub message: String,
    pub response: Option<RequestResponse>,
    pub chain: Option<ChainData>,
    pub created_at: DateTime<Utc>,
}

impl Request {
    pub fn new(kind: RequestKind, requester_id: Uuid, window: SlotWindow) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            requester_id,
            target_user_id: None,
            target_slot_id: None,
            window,
            requester_slots: Vec::new(),
            status: RequestStatus::Pending,
            message: String::new(),
            response: None,
            chain: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_target(mut self, target_user_id: Uuid) -> Self {
        self.target_user_id = Some(target_user_id);
        self
    }

    pub fn with_target_slot(mut self, slot_id: Uuid) -> Self {
        self.target_slot_id = Some(slot_id);
        self
    }

    pub fn with_message(mut self, message: String) -> Self {
        self.message = message;
        self
    }

    pub fn with_requester_slots(mut self, slots: Vec<TimeSlot>) -> Self {
        self.requester_slots = slots;
        self
    }

    pub fn with_chain(mut self, chain: ChainData) -> Self {
        self.chain = Some(chain);
        self
    }

    /// Record a response and move to a terminal or suspended status.
    pub fn respond(
        &mut self,
        status: RequestStatus,
        responder_id: Uuid,
        message: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.status = status;
        self.response = Some(RequestResponse {
            responder_id,
            message,
            responded_at: now,
        });
    }
}

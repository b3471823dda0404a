//! Room model - the unit of coordination
//!
//! A room owns its members, slot table, and request list as one document.
//! No other component persists copies of slots or requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::availability::AvailabilityEntry;
use super::request::Request;
use super::slot::{SlotWindow, TimeSlot};

/// A member of a room, carrying the synced copy of their availability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub user_id: Uuid,
    pub display_name: String,
    pub availability: Vec<AvailabilityEntry>,
    pub joined_at: DateTime<Utc>,
}

impl Member {
    pub fn new(user_id: Uuid, display_name: String) -> Self {
        Self {
            user_id,
            display_name,
            availability: Vec::new(),
            joined_at: Utc::now(),
        }
    }

    pub fn with_availability(mut self, availability: Vec<AvailabilityEntry>) -> Self {
        self.availability = availability;
        self
    }
}

/// Room-level negotiation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSettings {
    /// Windows no slot may occupy (breaks, holidays).
    pub blocked_windows: Vec<AvailabilityEntry>,
    /// Open/close bound in minutes, applied to every negotiated window.
    pub business_hours: Option<(u16, u16)>,
    /// Atomic slot granularity.
    pub slot_unit_minutes: u16,
    /// Maximum extra hops a displacement chain may spawn.
    pub max_chain_depth: u8,
    /// Gate chains behind explicit requester confirmation.
    pub require_chain_confirmation: bool,
    /// Travel-time simulation: minimum gap before an adjacent same-day slot.
    /// Zero disables the check.
    pub travel_buffer_minutes: u16,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            blocked_windows: Vec::new(),
            business_hours: None,
            slot_unit_minutes: 30,
            max_chain_depth: 3,
            require_chain_confirmation: false,
            travel_buffer_minutes: 0,
        }
    }
}

/// The coordination container owning members, slots, and requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    /// The owner provides the time being divided up. They cannot be
    /// displaced and cannot request exchanges; their availability is the
    /// outer bound every slot must fall inside.
    pub owner_id: Uuid,
    pub members: Vec<Member>,
    pub slots: Vec<TimeSlot>,
    pub requests: Vec<Request>,
    pub settings: RoomSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    pub fn new(name: String, owner: Member) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            owner_id: owner.user_id,
            members: vec![owner],
            slots: Vec::new(),
            requests: Vec::new(),
            settings: RoomSettings::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.members.iter().any(|m| m.user_id == user_id)
    }

    pub fn member(&self, user_id: Uuid) -> Option<&Member> {
        self.members.iter().find(|m| m.user_id == user_id)
    }

    pub fn member_mut(&mut self, user_id: Uuid) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| m.user_id == user_id)
    }

    /// Display name for messages; falls back to the id for departed users.
    pub fn display_name(&self, user_id: Uuid) -> String {
        self.member(user_id)
            .map(|m| m.display_name.clone())
            .unwrap_or_else(|| user_id.to_string())
    }

    pub fn add_member(&mut self, member: Member) {
        if !self.is_member(member.user_id) {
            self.members.push(member);
        }
    }

    /// Remove a member and delete their slots.
    pub fn remove_member(&mut self, user_id: Uuid) {
        self.members.retain(|m| m.user_id != user_id);
        self.slots.retain(|s| s.user_id != user_id);
    }

    pub fn owner_availability(&self) -> &[AvailabilityEntry] {
        self.member(self.owner_id)
            .map(|m| m.availability.as_slice())
            .unwrap_or(&[])
    }

    pub fn slots_for(&self, user_id: Uuid) -> Vec<&TimeSlot> {
        self.slots.iter().filter(|s| s.user_id == user_id).collect()
    }

    pub fn slot(&self, slot_id: Uuid) -> Option<&TimeSlot> {
        self.slots.iter().find(|s| s.id == slot_id)
    }

    pub fn remove_slots(&mut self, ids: &[Uuid]) {
        self.slots.retain(|s| !ids.contains(&s.id));
    }

    pub fn request(&self, request_id: Uuid) -> Option<&Request> {
        self.requests.iter().find(|r| r.id == request_id)
    }

    pub fn request_mut(&mut self, request_id: Uuid) -> Option<&mut Request> {
        self.requests.iter_mut().find(|r| r.id == request_id)
    }

    /// Is any existing slot in the way of this window, ignoring the given
    /// slot ids (those scheduled for removal)?
    pub fn window_occupied(&self, window: &SlotWindow, ignore: &[Uuid]) -> bool {
        self.slots
            .iter()
            .any(|s| !ignore.contains(&s.id) && s.overlaps_window(window))
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

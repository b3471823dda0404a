//! Domain models for slot coordination

mod availability;
mod request;
mod room;
mod slot;

pub use availability::AvailabilityEntry;
pub use request::{
    ChainData, ChainMove, PendingHop, Request, RequestKind, RequestResponse, RequestStatus,
};
pub use room::{Member, Room, RoomSettings};
pub use slot::{split_into_units, AssignmentSource, SlotStatus, SlotWindow, TimeSlot};

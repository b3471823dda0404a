//! Wire types
//!
//! The API speaks day labels and "HH:MM" clock times; the core speaks
//! `Weekday` and minutes-since-midnight. All translation lives here so
//! handlers stay one-line conversions around engine calls.

use chrono::{DateTime, NaiveDate, Utc};
use rota_core::{
    to_minutes, to_time_string, AssignmentSource, AvailabilityEntry, ChainData, DayLabels, Error,
    Member, Request, RequestKind, RequestResponse, RequestStatus, Result, Room, RoomSettings,
    SlotWindow, TimeSlot,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---- time windows ----------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowDto {
    pub date: NaiveDate,
    /// Derived day label, filled in on output.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub day: Option<String>,
    pub start_time: String,
    pub end_time: String,
}

impl WindowDto {
    pub fn into_window(self) -> Result<SlotWindow> {
        Ok(SlotWindow::new(
            self.date,
            to_minutes(&self.start_time)?,
            to_minutes(&self.end_time)?,
        ))
    }

    pub fn from_window(labels: &DayLabels, window: &SlotWindow) -> Self {
        Self {
            date: window.date,
            day: Some(labels.label(window.weekday).to_string()),
            start_time: to_time_string(window.start_minutes),
            end_time: to_time_string(window.end_minutes),
        }
    }
}

// ---- availability ----------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityDto {
    /// Recurring day label; ignored when `date` is given.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub day: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub date: Option<NaiveDate>,
    pub start_time: String,
    pub end_time: String,
}

impl AvailabilityDto {
    pub fn into_entry(self, labels: &DayLabels) -> Result<AvailabilityEntry> {
        let start = to_minutes(&self.start_time)?;
        let end = to_minutes(&self.end_time)?;
        if let Some(date) = self.date {
            return Ok(AvailabilityEntry::on_date(date, start, end));
        }
        let label = self
            .day
            .ok_or_else(|| Error::validation("availability entry needs a day or a date"))?;
        let weekday = labels
            .parse(&label)
            .ok_or_else(|| Error::validation(format!("unknown day label: {label}")))?;
        Ok(AvailabilityEntry::recurring(weekday, start, end))
    }

    pub fn from_entry(labels: &DayLabels, entry: &AvailabilityEntry) -> Self {
        Self {
            day: entry.weekday.map(|d| labels.label(d).to_string()),
            date: entry.date,
            start_time: to_time_string(entry.start_minutes),
            end_time: to_time_string(entry.end_minutes),
        }
    }
}

// ---- rooms -----------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RoomSettingsDto {
    pub blocked_windows: Vec<AvailabilityDto>,
    pub business_start: Option<String>,
    pub business_end: Option<String>,
    pub slot_unit_minutes: Option<u16>,
    pub max_chain_depth: Option<u8>,
    pub require_chain_confirmation: Option<bool>,
    pub travel_buffer_minutes: Option<u16>,
}

impl RoomSettingsDto {
    pub fn into_settings(self, labels: &DayLabels) -> Result<RoomSettings> {
        let defaults = RoomSettings::default();
        let business_hours = match (self.business_start, self.business_end) {
            (Some(start), Some(end)) => Some((to_minutes(&start)?, to_minutes(&end)?)),
            (None, None) => None,
            _ => {
                return Err(Error::validation(
                    "businessStart and businessEnd must be given together",
                ))
            }
        };
        let blocked_windows = self
            .blocked_windows
            .into_iter()
            .map(|dto| dto.into_entry(labels))
            .collect::<Result<Vec<_>>>()?;
        Ok(RoomSettings {
            blocked_windows,
            business_hours,
            slot_unit_minutes: self.slot_unit_minutes.unwrap_or(defaults.slot_unit_minutes),
            max_chain_depth: self.max_chain_depth.unwrap_or(defaults.max_chain_depth),
            require_chain_confirmation: self
                .require_chain_confirmation
                .unwrap_or(defaults.require_chain_confirmation),
            travel_buffer_minutes: self
                .travel_buffer_minutes
                .unwrap_or(defaults.travel_buffer_minutes),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub name: String,
    /// Display name for the owner (the caller).
    pub display_name: String,
    /// The owner's availability, bounding every assignment in the room.
    pub availability: Vec<AvailabilityDto>,
    #[serde(default)]
    pub settings: Option<RoomSettingsDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    /// Omitted for members without an account yet; an id is minted.
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub display_name: String,
    #[serde(default)]
    pub availability: Vec<AvailabilityDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedSlotRequest {
    pub user_id: Uuid,
    pub window: WindowDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDto {
    pub user_id: Uuid,
    pub display_name: String,
    pub availability: Vec<AvailabilityDto>,
    pub joined_at: DateTime<Utc>,
}

impl MemberDto {
    pub fn from_member(labels: &DayLabels, member: &Member) -> Self {
        Self {
            user_id: member.user_id,
            display_name: member.display_name.clone(),
            availability: member
                .availability
                .iter()
                .map(|e| AvailabilityDto::from_entry(labels, e))
                .collect(),
            joined_at: member.joined_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotDto {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub window: WindowDto,
    pub assigned_by: AssignmentSource,
}

impl SlotDto {
    pub fn from_slot(labels: &DayLabels, slot: &TimeSlot) -> Self {
        Self {
            id: slot.id,
            user_id: slot.user_id,
            window: WindowDto::from_window(labels, &slot.window()),
            assigned_by: slot.assigned_by,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDto {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub members: Vec<MemberDto>,
    pub slots: Vec<SlotDto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoomDto {
    pub fn from_room(labels: &DayLabels, room: &Room) -> Self {
        Self {
            id: room.id,
            name: room.name.clone(),
            owner_id: room.owner_id,
            members: room
                .members
                .iter()
                .map(|m| MemberDto::from_member(labels, m))
                .collect(),
            slots: room
                .slots
                .iter()
                .map(|s| SlotDto::from_slot(labels, s))
                .collect(),
            created_at: room.created_at,
            updated_at: room.updated_at,
        }
    }
}

// ---- requests --------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestDto {
    pub room_id: Uuid,
    #[serde(rename = "type")]
    pub kind: RequestKind,
    #[serde(default)]
    pub target_user_id: Option<Uuid>,
    #[serde(default)]
    pub target_slot_id: Option<Uuid>,
    #[serde(rename = "timeSlot")]
    pub window: WindowDto,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RespondBody {
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmAction {
    Proceed,
    Cancel,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfirmBody {
    pub action: ConfirmAction,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDto {
    pub responder_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub responded_at: DateTime<Utc>,
}

impl ResponseDto {
    fn from_response(response: &RequestResponse) -> Self {
        Self {
            responder_id: response.responder_id,
            message: response.message.clone(),
            responded_at: response.responded_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDto {
    pub root_request_id: Uuid,
    pub depth: u8,
    pub intermediate_user_id: Uuid,
}

impl ChainDto {
    fn from_chain(chain: &ChainData) -> Self {
        Self {
            root_request_id: chain.root_request_id,
            depth: chain.depth,
            intermediate_user_id: chain.intermediate_user_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDto {
    pub id: Uuid,
    pub room_id: Uuid,
    pub room_name: String,
    #[serde(rename = "type")]
    pub kind: RequestKind,
    pub status: RequestStatus,
    pub requester_id: Uuid,
    pub requester_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_user_id: Option<Uuid>,
    #[serde(rename = "timeSlot")]
    pub window: WindowDto,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<ChainDto>,
    pub created_at: DateTime<Utc>,
}

impl RequestDto {
    pub fn from_request(labels: &DayLabels, room: &Room, request: &Request) -> Self {
        Self {
            id: request.id,
            room_id: room.id,
            room_name: room.name.clone(),
            kind: request.kind,
            status: request.status,
            requester_id: request.requester_id,
            requester_name: room.display_name(request.requester_id),
            target_user_id: request.target_user_id,
            window: WindowDto::from_window(labels, &request.window),
            message: request.message.clone(),
            response: request.response.as_ref().map(ResponseDto::from_response),
            chain: request.chain.as_ref().map(ChainDto::from_chain),
            created_at: request.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rota_core::Weekday;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_window_roundtrip() {
        let labels = DayLabels::english();
        let window = SlotWindow::new(date("2026-08-24"), 540, 660);
        let dto = WindowDto::from_window(&labels, &window);
        assert_eq!(dto.day.as_deref(), Some("Mon"));
        assert_eq!(dto.start_time, "09:00");
        assert_eq!(dto.end_time, "11:00");
        assert_eq!(dto.into_window().unwrap(), window);
    }

    #[test]
    fn test_window_rejects_bad_time() {
        let dto = WindowDto {
            date: date("2026-08-24"),
            day: None,
            start_time: "9am".into(),
            end_time: "11:00".into(),
        };
        assert!(dto.into_window().is_err());
    }

    #[test]
    fn test_availability_recurring_by_label() {
        let labels = DayLabels::english();
        let dto = AvailabilityDto {
            day: Some("wed".into()),
            date: None,
            start_time: "08:00".into(),
            end_time: "18:00".into(),
        };
        let entry = dto.into_entry(&labels).unwrap();
        assert_eq!(entry.weekday, Some(Weekday::Wed));
        assert!(entry.date.is_none());
    }

    #[test]
    fn test_availability_needs_day_or_date() {
        let labels = DayLabels::english();
        let dto = AvailabilityDto {
            day: None,
            date: None,
            start_time: "08:00".into(),
            end_time: "18:00".into(),
        };
        assert!(dto.into_entry(&labels).is_err());
    }

    #[test]
    fn test_settings_business_hours_must_pair() {
        let labels = DayLabels::english();
        let dto = RoomSettingsDto {
            business_start: Some("08:00".into()),
            ..Default::default()
        };
        assert!(dto.into_settings(&labels).is_err());
    }

    #[test]
    fn test_settings_defaults_preserved() {
        let labels = DayLabels::english();
        let settings = RoomSettingsDto::default().into_settings(&labels).unwrap();
        let defaults = RoomSettings::default();
        assert_eq!(settings.slot_unit_minutes, defaults.slot_unit_minutes);
        assert_eq!(settings.max_chain_depth, defaults.max_chain_depth);
    }
}

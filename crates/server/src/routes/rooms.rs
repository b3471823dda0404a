//! Room administration
//!
//! Creating a room, adding members, and seeding the initial assignment.
//! All mutations here are owner actions; renegotiation between members
//! goes through the request endpoints instead.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use rota_core::{split_into_units, AssignmentSource, Error, Member, Result, Room};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthorizedUser;
use crate::dto::{
    AddMemberRequest, CreateRoomRequest, MemberDto, RoomDto, SeedSlotRequest, SlotDto,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms/{room_id}", get(show_room))
        .route("/rooms/{room_id}/members", post(add_member))
        .route("/rooms/{room_id}/slots", post(seed_slots))
}

async fn create_room(
    user: AuthorizedUser,
    State(state): State<AppState>,
    Json(body): Json<CreateRoomRequest>,
) -> ApiResult<(StatusCode, Json<RoomDto>)> {
    let labels = state.engine.day_labels();

    if body.name.trim().is_empty() {
        return Err(Error::validation("room name must not be empty").into());
    }
    let availability = body
        .availability
        .into_iter()
        .map(|dto| dto.into_entry(labels))
        .collect::<Result<Vec<_>>>()?;
    if availability.is_empty() {
        return Err(Error::validation("owner availability must not be empty").into());
    }

    let owner = Member::new(user.id(), body.display_name).with_availability(availability);
    let mut room = Room::new(body.name, owner);
    if let Some(settings) = body.settings {
        room.settings = settings.into_settings(labels)?;
    }

    state.db.lock().await.rooms().create(&room)?;
    info!(room = %room.id, owner = %user.id(), "Room created");

    Ok((StatusCode::CREATED, Json(RoomDto::from_room(labels, &room))))
}

async fn show_room(
    user: AuthorizedUser,
    Path(room_id): Path<Uuid>,
    State(state): State<AppState>,
) -> ApiResult<Json<RoomDto>> {
    let room = state.read_room(room_id).await?;
    if !room.is_member(user.id()) {
        return Err(Error::PermissionDenied("Not a member of this room".into()).into());
    }
    Ok(Json(RoomDto::from_room(state.engine.day_labels(), &room)))
}

async fn add_member(
    user: AuthorizedUser,
    Path(room_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<AddMemberRequest>,
) -> ApiResult<(StatusCode, Json<MemberDto>)> {
    let member = state
        .update_room(room_id, |engine, room| {
            require_owner(room, user.id())?;
            let labels = engine.day_labels();

            let member_id = body.user_id.unwrap_or_else(Uuid::new_v4);
            if room.is_member(member_id) {
                return Err(Error::validation("user is already a member"));
            }
            let availability = body
                .availability
                .into_iter()
                .map(|dto| dto.into_entry(labels))
                .collect::<Result<Vec<_>>>()?;

            let member = Member::new(member_id, body.display_name).with_availability(availability);
            room.add_member(member.clone());
            room.touch(Utc::now());
            Ok(MemberDto::from_member(labels, &member))
        })
        .await?;

    Ok((StatusCode::CREATED, Json(member)))
}

/// Seed or extend a member's assignment directly, bypassing negotiation.
/// The window is split into unit slots so later requests can claim parts
/// of it.
async fn seed_slots(
    user: AuthorizedUser,
    Path(room_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<SeedSlotRequest>,
) -> ApiResult<(StatusCode, Json<Vec<SlotDto>>)> {
    let slots = state
        .update_room(room_id, |engine, room| {
            require_owner(room, user.id())?;
            let labels = engine.day_labels();

            if body.user_id == room.owner_id {
                return Err(Error::validation("the owner does not hold slots"));
            }
            if !room.is_member(body.user_id) {
                return Err(Error::NotFound(format!("member {}", body.user_id)));
            }
            let window = body.window.into_window()?;
            if window.start_minutes >= window.end_minutes {
                return Err(Error::validation("window must start before it ends"));
            }
            if room.window_occupied(&window, &[]) {
                return Err(Error::validation("window overlaps an existing slot"));
            }

            let slots = split_into_units(
                body.user_id,
                window,
                room.settings.slot_unit_minutes,
                AssignmentSource::Manual,
            );
            let dtos = slots
                .iter()
                .map(|s| SlotDto::from_slot(labels, s))
                .collect();
            room.slots.extend(slots);
            room.touch(Utc::now());
            Ok(dtos)
        })
        .await?;

    Ok((StatusCode::CREATED, Json(slots)))
}

fn require_owner(room: &Room, caller: Uuid) -> Result<()> {
    if room.owner_id != caller {
        return Err(Error::PermissionDenied(
            "Only the room owner may do this".into(),
        ));
    }
    Ok(())
}

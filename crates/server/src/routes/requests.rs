//! Request endpoints
//!
//! Requests are addressed by id alone; the room is found among the
//! caller's rooms. Approve/reject share one path with the action name as
//! the final segment.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use rota_core::{CreateRequestInput, Error, Request, RequestStatus, Room};
use uuid::Uuid;

use crate::auth::AuthorizedUser;
use crate::dto::{ChainConfirmBody, ConfirmAction, CreateRequestDto, RequestDto, RespondBody};
use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/requests", post(create_request))
        .route("/requests/{request_id}", delete(cancel_request))
        .route("/requests/{request_id}/chain-confirm", post(chain_confirm))
        .route("/requests/{request_id}/{action}", post(respond_request))
        .route("/sent-requests", get(sent_requests))
        .route("/received-requests", get(received_requests))
}

async fn create_request(
    user: AuthorizedUser,
    State(state): State<AppState>,
    Json(body): Json<CreateRequestDto>,
) -> ApiResult<(StatusCode, Json<RequestDto>)> {
    let room_id = body.room_id;
    let dto = state
        .update_room(room_id, |engine, room| {
            let input = CreateRequestInput {
                kind: body.kind,
                requester_id: user.id(),
                target_user_id: body.target_user_id,
                target_slot_id: body.target_slot_id,
                window: body.window.into_window()?,
                message: body.message,
            };
            let request_id = engine.create_request(room, input, Utc::now())?;
            let request = room
                .request(request_id)
                .ok_or_else(|| Error::NotFound(format!("request {request_id}")))?;
            Ok(RequestDto::from_request(engine.day_labels(), room, request))
        })
        .await?;

    Ok((StatusCode::CREATED, Json(dto)))
}

async fn respond_request(
    user: AuthorizedUser,
    Path((request_id, action)): Path<(Uuid, String)>,
    State(state): State<AppState>,
    Json(body): Json<RespondBody>,
) -> ApiResult<Json<RequestDto>> {
    let approve = match action.as_str() {
        "approved" => true,
        "rejected" => false,
        other => {
            return Err(Error::validation(format!("unknown action: {other}")).into());
        }
    };

    let room_id = state.room_with_request(user.id(), request_id).await?;
    let dto = state
        .update_room(room_id, |engine, room| {
            engine.respond(room, request_id, user.id(), approve, body.message, Utc::now())?;
            let request = room
                .request(request_id)
                .ok_or_else(|| Error::NotFound(format!("request {request_id}")))?;
            Ok(RequestDto::from_request(engine.day_labels(), room, request))
        })
        .await?;

    Ok(Json(dto))
}

async fn cancel_request(
    user: AuthorizedUser,
    Path(request_id): Path<Uuid>,
    State(state): State<AppState>,
) -> ApiResult<StatusCode> {
    let room_id = state.room_with_request(user.id(), request_id).await?;
    state
        .update_room(room_id, |engine, room| {
            engine.cancel(room, request_id, user.id(), Utc::now())
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn chain_confirm(
    user: AuthorizedUser,
    Path(request_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<ChainConfirmBody>,
) -> ApiResult<Json<RequestDto>> {
    let room_id = state.room_with_request(user.id(), request_id).await?;
    let dto = state
        .update_room(room_id, |engine, room| {
            let proceed = body.action == ConfirmAction::Proceed;
            engine.chain_confirm(room, request_id, user.id(), proceed, Utc::now())?;
            let request = room
                .request(request_id)
                .ok_or_else(|| Error::NotFound(format!("request {request_id}")))?;
            Ok(RequestDto::from_request(engine.day_labels(), room, request))
        })
        .await?;
    Ok(Json(dto))
}

async fn sent_requests(
    user: AuthorizedUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<RequestDto>>> {
    collect_requests(&state, user.id(), |request, _room, caller| {
        request.requester_id == caller
    })
    .await
}

/// Requests waiting on the caller's answer. The room owner answers
/// requests with no explicit target.
async fn received_requests(
    user: AuthorizedUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<RequestDto>>> {
    collect_requests(&state, user.id(), |request, room, caller| {
        let respondent = request.target_user_id.unwrap_or(room.owner_id);
        respondent == caller && request.status == RequestStatus::Pending
    })
    .await
}

async fn collect_requests(
    state: &AppState,
    caller: Uuid,
    keep: impl Fn(&Request, &Room, Uuid) -> bool,
) -> ApiResult<Json<Vec<RequestDto>>> {
    let labels = state.engine.day_labels();
    let mut out = Vec::new();
    for room in state.rooms_for(caller).await? {
        for request in &room.requests {
            if keep(request, &room, caller) {
                out.push(RequestDto::from_request(labels, &room, request));
            }
        }
    }
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(out))
}

//! Session management endpoints.
//!
//! - `POST /api/admin/sessions` - create a session under an owned event
//! - `GET /api/events/:id/sessions` - list an event's sessions (public)

use super::{success, ApiSuccess};
use crate::auth::OrgActor;
use crate::server::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use gather_auth::OrgAction;
use gather_core::registration::validate_schedule;
use gather_core::types::{EventId, Session, SessionId};
use gather_web::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for creating a session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Parent event
    pub event_id: Uuid,
    /// Display name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Room or stage
    pub location: Option<String>,
    /// Scheduled start
    pub start_time: DateTime<Utc>,
    /// Scheduled end
    pub end_time: DateTime<Utc>,
    /// Independent capacity limit
    pub max_capacity: Option<u32>,
}

/// Session list payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionList {
    /// The sessions, ordered by start time
    pub sessions: Vec<Session>,
    /// Total count
    pub total: usize,
}

/// Create a session under an owned event.
pub async fn create_session(
    actor: OrgActor,
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<ApiSuccess<Session>>), AppError> {
    actor.require(OrgAction::ManageEvents)?;
    if request.name.trim().is_empty() {
        return Err(AppError::bad_request("Session name is required"));
    }
    validate_schedule(request.start_time, request.end_time, None)?;

    let event_id = EventId::from_uuid(request.event_id);
    state
        .store
        .event_owned_by(event_id, actor.organization.id)
        .await
        .map_err(gather_core::Error::from)?
        .ok_or_else(|| AppError::not_found("event"))?;

    let now = state.clock.now();
    let session = Session {
        id: SessionId::new(),
        event_id,
        name: request.name,
        description: request.description,
        location: request.location,
        start_time: request.start_time,
        end_time: request.end_time,
        max_capacity: request.max_capacity,
        created_at: now,
        updated_at: now,
    };
    state
        .store
        .create_session(&session)
        .await
        .map_err(gather_core::Error::from)?;
    tracing::info!(session_id = %session.id, event_id = %event_id, "session created");

    Ok((
        StatusCode::CREATED,
        Json(success("Session created", session)),
    ))
}

/// List an event's sessions. Public.
pub async fn list_event_sessions(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<ApiSuccess<SessionList>>, AppError> {
    let event_id = EventId::from_uuid(event_id);
    state
        .store
        .event(event_id)
        .await
        .map_err(gather_core::Error::from)?
        .ok_or_else(|| AppError::not_found("event"))?;

    let sessions = state
        .store
        .sessions_for_event(event_id)
        .await
        .map_err(gather_core::Error::from)?;
    let total = sessions.len();
    Ok(Json(success("Sessions", SessionList { sessions, total })))
}

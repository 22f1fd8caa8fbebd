//! Event and session registration endpoints.
//!
//! - `POST /api/events/:id/register` - register the caller for an event
//! - `DELETE /api/events/:id/register` - cancel the caller's registration
//! - `POST /api/sessions/register` - register the caller for a session

use super::{success, ApiSuccess};
use crate::auth::CurrentUser;
use crate::metrics;
use crate::server::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use gather_core::types::{EventId, RegistrationStatus, SessionId};
use gather_core::{ConflictReason, Error};
use gather_web::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Registration outcome returned to the caller.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationData {
    /// The event registered for
    pub event_id: EventId,
    /// When the registration was admitted
    pub registration_date: DateTime<Utc>,
    /// Status of the new registration
    pub status: RegistrationStatus,
}

/// Request body for session registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRegistrationRequest {
    /// Parent event id
    pub event_id: Uuid,
    /// Session to register for
    pub session_id: Uuid,
}

/// Session registration outcome.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRegistrationData {
    /// Parent event id
    pub event_id: EventId,
    /// The session registered for
    pub session_id: SessionId,
    /// When the registration was admitted
    pub registration_date: DateTime<Utc>,
    /// Status of the new registration
    pub status: RegistrationStatus,
}

// ============================================================================
// Handlers
// ============================================================================

fn registration_outcome(err: &Error) -> &'static str {
    match err {
        Error::Conflict(ConflictReason::AlreadyRegistered) => "duplicate",
        Error::Conflict(ConflictReason::CapacityExceeded) => "full",
        Error::Conflict(ConflictReason::DeadlinePassed) => "deadline",
        _ => "error",
    }
}

/// Register the authenticated user for an event.
pub async fn register_for_event(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<ApiSuccess<RegistrationData>>, AppError> {
    let event_id = EventId::from_uuid(event_id);
    let registration = state
        .registration
        .register_for_event(&user, event_id)
        .await
        .inspect_err(|err| metrics::record_registration("event", registration_outcome(err)))?;
    metrics::record_registration("event", "admitted");

    Ok(Json(success(
        "Successfully registered for the event",
        RegistrationData {
            event_id: registration.event_id,
            registration_date: registration.registration_date,
            status: registration.status,
        },
    )))
}

/// Cancel the authenticated user's event registration.
///
/// The record is kept with status `cancelled`; the seat becomes available
/// to later registrants.
pub async fn cancel_event_registration(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<ApiSuccess<()>>, AppError> {
    let event_id = EventId::from_uuid(event_id);
    state
        .registration
        .cancel_event_registration(&user, event_id)
        .await?;
    Ok(Json(success("Registration cancelled", ())))
}

/// Register the authenticated user for a session.
pub async fn register_for_session(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<SessionRegistrationRequest>,
) -> Result<Json<ApiSuccess<SessionRegistrationData>>, AppError> {
    let event_id = EventId::from_uuid(request.event_id);
    let session_id = SessionId::from_uuid(request.session_id);

    let registration = state
        .registration
        .register_for_session(&user, event_id, session_id)
        .await
        .inspect_err(|err| metrics::record_registration("session", registration_outcome(err)))?;
    metrics::record_registration("session", "admitted");

    Ok(Json(success(
        "Successfully registered for the session",
        SessionRegistrationData {
            event_id: registration.event_id,
            session_id: registration.session_id,
            registration_date: registration.registration_date,
            status: registration.status,
        },
    )))
}

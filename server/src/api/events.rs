//! Event management endpoints.
//!
//! Public listing/detail plus the organizer-scoped CRUD:
//! - `GET /api/events`, `GET /api/events/:id`
//! - `POST/GET /api/admin/events`, `PUT/DELETE /api/admin/events/:id`

use super::{success, ApiSuccess};
use crate::auth::OrgActor;
use crate::server::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use gather_auth::OrgAction;
use gather_core::registration::validate_schedule;
use gather_core::types::{Event, EventId, FoodCoupon, Session};
use gather_web::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating or updating an event.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    /// Display name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Venue name/address
    pub venue: Option<String>,
    /// Whether the event is held online
    #[serde(default)]
    pub is_online: bool,
    /// Streaming URL for online events
    pub online_url: Option<String>,
    /// Free-form category
    pub event_type: Option<String>,
    /// Scheduled start
    pub start_time: DateTime<Utc>,
    /// Scheduled end
    pub end_time: DateTime<Utc>,
    /// Capacity limit; absent = unbounded
    pub max_capacity: Option<u32>,
    /// Registrations close at this instant
    pub registration_deadline: Option<DateTime<Utc>>,
}

/// Event detail: the event plus its sessions, coupon definitions, and the
/// confirmed registration count.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetail {
    /// The event
    #[serde(flatten)]
    pub event: Event,
    /// Its sessions, ordered by start time
    pub sessions: Vec<Session>,
    /// Its coupon definitions
    pub food_coupons: Vec<FoodCoupon>,
    /// Confirmed registrations
    pub registered_count: u32,
}

// ============================================================================
// Handlers
// ============================================================================

/// List all events, newest first. Public.
pub async fn list_events(
    State(state): State<AppState>,
) -> Result<Json<ApiSuccess<Vec<Event>>>, AppError> {
    let events = state
        .store
        .list_events(None)
        .await
        .map_err(gather_core::Error::from)?;
    Ok(Json(success("Events", events)))
}

/// Event detail with sessions, coupons, and registration count. Public.
pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<ApiSuccess<EventDetail>>, AppError> {
    let event_id = EventId::from_uuid(event_id);
    let event = state
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
    let food_coupons = state
        .store
        .coupons_for_event(event_id)
        .await
        .map_err(gather_core::Error::from)?;
    let registered_count = state
        .store
        .confirmed_count(event_id)
        .await
        .map_err(gather_core::Error::from)?;

    Ok(Json(success(
        "Event",
        EventDetail {
            event,
            sessions,
            food_coupons,
            registered_count,
        },
    )))
}

/// List the caller's organization's events.
pub async fn list_organization_events(
    actor: OrgActor,
    State(state): State<AppState>,
) -> Result<Json<ApiSuccess<Vec<Event>>>, AppError> {
    let events = state
        .store
        .list_events(Some(actor.organization.id))
        .await
        .map_err(gather_core::Error::from)?;
    Ok(Json(success("Events", events)))
}

/// Create an event under the caller's organization.
pub async fn create_event(
    actor: OrgActor,
    State(state): State<AppState>,
    Json(request): Json<EventRequest>,
) -> Result<(StatusCode, Json<ApiSuccess<Event>>), AppError> {
    actor.require(OrgAction::ManageEvents)?;
    if request.name.trim().is_empty() {
        return Err(AppError::bad_request("Event name is required"));
    }
    validate_schedule(
        request.start_time,
        request.end_time,
        request.registration_deadline,
    )?;

    let now = state.clock.now();
    let event = Event {
        id: EventId::new(),
        organization_id: actor.organization.id,
        name: request.name,
        description: request.description,
        venue: request.venue,
        is_online: request.is_online,
        online_url: request.online_url,
        event_type: request.event_type,
        start_time: request.start_time,
        end_time: request.end_time,
        max_capacity: request.max_capacity,
        registration_deadline: request.registration_deadline,
        created_by: None,
        created_at: now,
        updated_at: now,
    };
    state
        .store
        .create_event(&event)
        .await
        .map_err(gather_core::Error::from)?;
    tracing::info!(event_id = %event.id, org_id = %event.organization_id, "event created");

    Ok((StatusCode::CREATED, Json(success("Event created", event))))
}

/// Update an owned event's attributes.
pub async fn update_event(
    actor: OrgActor,
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(request): Json<EventRequest>,
) -> Result<Json<ApiSuccess<Event>>, AppError> {
    actor.require(OrgAction::ManageEvents)?;
    validate_schedule(
        request.start_time,
        request.end_time,
        request.registration_deadline,
    )?;

    let event_id = EventId::from_uuid(event_id);
    let existing = state
        .store
        .event_owned_by(event_id, actor.organization.id)
        .await
        .map_err(gather_core::Error::from)?
        .ok_or_else(|| AppError::not_found("event"))?;

    let updated = Event {
        name: request.name,
        description: request.description,
        venue: request.venue,
        is_online: request.is_online,
        online_url: request.online_url,
        event_type: request.event_type,
        start_time: request.start_time,
        end_time: request.end_time,
        max_capacity: request.max_capacity,
        registration_deadline: request.registration_deadline,
        updated_at: state.clock.now(),
        ..existing
    };
    state
        .store
        .update_event(&updated)
        .await
        .map_err(gather_core::Error::from)?;

    Ok(Json(success("Event updated", updated)))
}

/// Delete an owned event and its dependents.
pub async fn delete_event(
    actor: OrgActor,
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<ApiSuccess<()>>, AppError> {
    actor.require(OrgAction::ManageEvents)?;

    let event_id = EventId::from_uuid(event_id);
    state
        .store
        .event_owned_by(event_id, actor.organization.id)
        .await
        .map_err(gather_core::Error::from)?
        .ok_or_else(|| AppError::not_found("event"))?;

    state
        .store
        .delete_event(event_id)
        .await
        .map_err(gather_core::Error::from)?;
    tracing::info!(event_id = %event_id, "event deleted");

    Ok(Json(success("Event deleted", ())))
}

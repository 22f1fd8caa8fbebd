//! Check-in endpoints (QR scanning).
//!
//! - `POST /api/admin/checkin` - check an attendee in; repeating the scan
//!   answers 208 Already Reported with the original timestamp instead of an
//!   error
//! - `GET /api/admin/attendee` - look up a scanned attendee's registration
//!   state and redeemed coupons

use super::{success, ApiSuccess};
use crate::auth::OrgActor;
use crate::metrics;
use crate::server::state::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use gather_auth::OrgAction;
use gather_core::types::{
    CouponUse, EventId, ExternalId, RegistrationStatus, UserId, UserIdentifier,
};
use gather_web::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for a check-in scan.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    /// Event the attendee is being scanned into
    pub event_id: Uuid,
    /// Scanned identifier: a platform user id or an external identity
    pub user_identifier: String,
}

/// Check-in outcome returned to the scanning UI.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInData {
    /// The event
    pub event_id: EventId,
    /// The event's display name
    pub event_name: String,
    /// The attendee's platform id
    pub user_id: UserId,
    /// The attendee's external identity
    pub external_id: ExternalId,
    /// The attendee's display name
    pub user_name: String,
    /// The check-in instant (the original one on repeats)
    pub check_in_time: DateTime<Utc>,
    /// `true` when this scan found an earlier check-in
    pub already_checked_in: bool,
}

/// Query parameters for the attendee lookup.
#[derive(Debug, Deserialize)]
pub struct AttendeeQuery {
    /// Event scope
    pub event_id: Uuid,
    /// Scanned identifier
    pub identifier: String,
}

/// Attendee lookup payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeData {
    /// The attendee's platform id
    pub user_id: UserId,
    /// The attendee's external identity
    pub external_id: ExternalId,
    /// The attendee's display name
    pub user_name: String,
    /// Email address
    pub email: String,
    /// Registration status for the event, if registered
    pub registration_status: Option<RegistrationStatus>,
    /// Whether the attendee has been checked in
    pub attended: bool,
    /// Check-in instant, if checked in
    pub check_in_time: Option<DateTime<Utc>>,
    /// Coupons redeemed at this event
    pub coupons_used: Vec<CouponUse>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Check an attendee into an event.
///
/// First scan answers 200; a repeat scan answers 208 Already Reported with
/// `alreadyCheckedIn: true` and the original check-in time. Scanning a
/// badge twice is expected operator behavior, not a fault.
pub async fn check_in(
    actor: OrgActor,
    State(state): State<AppState>,
    Json(request): Json<CheckInRequest>,
) -> Result<(StatusCode, Json<ApiSuccess<CheckInData>>), AppError> {
    actor.require(OrgAction::CheckInAttendees)?;

    let event_id = EventId::from_uuid(request.event_id);
    let identifier = UserIdentifier::parse(&request.user_identifier);
    let record = state
        .attendance
        .check_in(&actor.organization, event_id, &identifier)
        .await?;
    metrics::record_check_in(record.already_checked_in);

    let (status, message) = if record.already_checked_in {
        (StatusCode::ALREADY_REPORTED, "User is already checked in")
    } else {
        (StatusCode::OK, "User successfully checked in")
    };

    Ok((
        status,
        Json(success(
            message,
            CheckInData {
                event_id: record.event_id,
                event_name: record.event_name,
                user_id: record.user.id,
                external_id: record.user.external_id,
                user_name: record.user.full_name,
                check_in_time: record.checked_in_at,
                already_checked_in: record.already_checked_in,
            },
        )),
    ))
}

/// Look up a scanned attendee.
///
/// Reports profile, registration state, and redeemed coupons; an
/// unregistered attendee is reported as such rather than rejected.
pub async fn attendee_details(
    actor: OrgActor,
    State(state): State<AppState>,
    Query(query): Query<AttendeeQuery>,
) -> Result<Json<ApiSuccess<AttendeeData>>, AppError> {
    actor.require(OrgAction::CheckInAttendees)?;

    let event_id = EventId::from_uuid(query.event_id);
    let identifier = UserIdentifier::parse(&query.identifier);
    let details = state
        .attendance
        .attendee_details(&actor.organization, event_id, &identifier)
        .await?;

    let (registration_status, attended, check_in_time) = details
        .registration
        .map_or((None, false, None), |registration| {
            (
                Some(registration.status),
                registration.attended,
                registration.check_in_time,
            )
        });

    Ok(Json(success(
        "Attendee details",
        AttendeeData {
            user_id: details.user.id,
            external_id: details.user.external_id,
            user_name: details.user.full_name,
            email: details.user.email,
            registration_status,
            attended,
            check_in_time,
            coupons_used: details.coupons_used,
        },
    )))
}

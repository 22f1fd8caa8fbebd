//! User profile endpoints.
//!
//! - `GET /api/me` - the caller's profile with both registration views
//!   (events and sessions), derived from the same registration rows the
//!   event-side queries read

use super::{success, ApiSuccess};
use crate::auth::CurrentUser;
use crate::server::state::AppState;
use axum::extract::State;
use axum::Json;
use gather_core::types::{EventRegistration, SessionRegistration, User};
use gather_web::AppError;
use serde::Serialize;

/// Profile payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileData {
    /// The user record
    #[serde(flatten)]
    pub user: User,
    /// Event registrations, oldest first
    pub registered_events: Vec<EventRegistration>,
    /// Session registrations, oldest first
    pub registered_sessions: Vec<SessionRegistration>,
}

/// The caller's profile and registrations.
pub async fn me(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ApiSuccess<ProfileData>>, AppError> {
    let registered_events = state
        .store
        .registrations_for_user(user.id)
        .await
        .map_err(gather_core::Error::from)?;
    let registered_sessions = state
        .store
        .session_registrations_for_user(user.id)
        .await
        .map_err(gather_core::Error::from)?;

    Ok(Json(success(
        "Profile",
        ProfileData {
            user,
            registered_events,
            registered_sessions,
        },
    )))
}

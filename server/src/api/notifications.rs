//! Notification endpoints.
//!
//! - `POST /api/admin/notifications` - create and fan out to every
//!   currently confirmed registrant
//! - `POST /api/admin/notifications/:id/rematerialize` - repair pass for a
//!   partial fan-out (creates only the missing delivery records)
//! - `GET /api/notifications` - the caller's inbox, newest first
//! - `POST /api/notifications/:id/read` - mark one delivery read

use super::{success, ApiSuccess};
use crate::auth::{CurrentUser, OrgActor};
use crate::metrics;
use crate::server::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use gather_auth::OrgAction;
use gather_core::types::{EventId, Notification, NotificationId};
use gather_web::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a notification.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    /// Event scope
    pub event_id: Uuid,
    /// Short title
    pub title: String,
    /// Body text
    pub message: String,
    /// Whether a push delivery is requested (delivery itself is external)
    #[serde(default)]
    pub is_push: bool,
}

/// Creation outcome: the notification plus the fan-out size.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationCreatedData {
    /// The created notification
    pub notification: Notification,
    /// Delivery records materialized now
    pub delivered_count: usize,
}

/// One inbox entry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxEntry {
    /// The notification id
    pub notification_id: NotificationId,
    /// The event it belongs to
    pub event_id: EventId,
    /// Short title
    pub title: String,
    /// Body text
    pub message: String,
    /// Whether the caller has opened it
    pub is_read: bool,
    /// When the caller opened it, if ever
    pub read_at: Option<DateTime<Utc>>,
    /// When the notification was created
    pub created_at: DateTime<Utc>,
}

/// Repair outcome.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RematerializedData {
    /// Delivery records created by the repair pass
    pub delivered_count: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a notification and fan it out.
///
/// Fan-out targets the registrants confirmed at creation time; users who
/// register later do not retroactively receive it.
pub async fn create_notification(
    actor: OrgActor,
    State(state): State<AppState>,
    Json(request): Json<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<ApiSuccess<NotificationCreatedData>>), AppError> {
    actor.require(OrgAction::PublishNotifications)?;

    let event_id = EventId::from_uuid(request.event_id);
    let (notification, delivered_count) = state
        .notifications
        .create(
            &actor.organization,
            event_id,
            &request.title,
            &request.message,
            request.is_push,
        )
        .await?;
    metrics::record_deliveries(delivered_count);

    Ok((
        StatusCode::CREATED,
        Json(success(
            "Notification created",
            NotificationCreatedData {
                notification,
                delivered_count,
            },
        )),
    ))
}

/// Re-run the fan-out for an existing notification, creating only the
/// delivery records that are missing.
pub async fn rematerialize_notification(
    actor: OrgActor,
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<ApiSuccess<RematerializedData>>, AppError> {
    actor.require(OrgAction::PublishNotifications)?;

    let delivered_count = state
        .notifications
        .rematerialize(
            &actor.organization,
            NotificationId::from_uuid(notification_id),
        )
        .await?;
    metrics::record_deliveries(delivered_count);

    Ok(Json(success(
        "Notification fan-out repaired",
        RematerializedData { delivered_count },
    )))
}

/// The caller's inbox, newest first.
pub async fn list_notifications(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ApiSuccess<Vec<InboxEntry>>>, AppError> {
    let deliveries = state.notifications.list_for_user(&user).await?;
    let entries = deliveries
        .into_iter()
        .map(|(delivery, notification)| InboxEntry {
            notification_id: notification.id,
            event_id: notification.event_id,
            title: notification.title,
            message: notification.message,
            is_read: delivery.is_read,
            read_at: delivery.read_at,
            created_at: notification.created_at,
        })
        .collect();
    Ok(Json(success("Notifications", entries)))
}

/// Mark one delivery read. Idempotent.
pub async fn mark_notification_read(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<ApiSuccess<()>>, AppError> {
    state
        .notifications
        .mark_read(&user, NotificationId::from_uuid(notification_id))
        .await?;
    Ok(Json(success("Notification marked as read", ())))
}

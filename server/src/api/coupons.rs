//! Food coupon endpoints.
//!
//! - `POST /api/admin/coupons` - define a coupon on an owned event
//! - `POST /api/admin/coupons/redeem` - redeem one coupon for one attendee;
//!   a repeat redemption is a hard 409, unlike check-in's idempotent 208

use super::{success, ApiSuccess};
use crate::auth::OrgActor;
use crate::metrics;
use crate::server::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use gather_core::types::{CouponId, EventId, FoodCoupon, UserId, UserIdentifier};
use gather_core::{ConflictReason, Error};
use gather_auth::OrgAction;
use gather_web::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for defining a coupon.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCouponRequest {
    /// Event the coupon belongs to
    pub event_id: Uuid,
    /// Display name ("Lunch")
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Physical stock hint
    #[serde(default)]
    pub quantity: u32,
}

/// Request body for redeeming a coupon.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemCouponRequest {
    /// Event scope
    pub event_id: Uuid,
    /// Scanned identifier: platform user id or external identity
    pub user_identifier: String,
    /// The coupon to redeem
    pub coupon_id: i32,
}

/// Redemption receipt.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionData {
    /// The event
    pub event_id: EventId,
    /// The redeeming user
    pub user_id: UserId,
    /// The redeemed coupon
    pub coupon_id: CouponId,
    /// The coupon's display name
    pub coupon_name: String,
    /// When the redemption was recorded
    pub scanned_at: DateTime<Utc>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Define a coupon on an owned event. The per-event coupon number is
/// assigned by the store.
pub async fn add_coupon(
    actor: OrgActor,
    State(state): State<AppState>,
    Json(request): Json<AddCouponRequest>,
) -> Result<(StatusCode, Json<ApiSuccess<FoodCoupon>>), AppError> {
    actor.require(OrgAction::RedeemCoupons)?;

    let event_id = EventId::from_uuid(request.event_id);
    let coupon = state
        .coupons
        .add_coupon(
            &actor.organization,
            event_id,
            &request.name,
            request.description.as_deref(),
            request.quantity,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(success("Food coupon added", coupon)),
    ))
}

/// Redeem one coupon for one attendee.
///
/// At most one redemption exists per (event, user, coupon); a second
/// attempt answers 409 because each redemption hands over a physical
/// consumable.
pub async fn redeem_coupon(
    actor: OrgActor,
    State(state): State<AppState>,
    Json(request): Json<RedeemCouponRequest>,
) -> Result<Json<ApiSuccess<RedemptionData>>, AppError> {
    actor.require(OrgAction::RedeemCoupons)?;

    let event_id = EventId::from_uuid(request.event_id);
    let identifier = UserIdentifier::parse(&request.user_identifier);
    let receipt = state
        .coupons
        .redeem(
            &actor.organization,
            event_id,
            &identifier,
            CouponId::new(request.coupon_id),
        )
        .await
        .inspect_err(|err| {
            if matches!(err, Error::Conflict(ConflictReason::AlreadyRedeemed)) {
                metrics::record_redemption("already_redeemed");
            }
        })?;
    metrics::record_redemption("redeemed");

    Ok(Json(success(
        "Food coupon marked as used",
        RedemptionData {
            event_id: receipt.event_id,
            user_id: receipt.user.id,
            coupon_id: receipt.coupon.coupon_id,
            coupon_name: receipt.coupon.name,
            scanned_at: receipt.scanned_at,
        },
    )))
}

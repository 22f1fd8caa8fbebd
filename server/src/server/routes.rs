//! Router configuration for the Gather server.
//!
//! Builds the complete Axum router with all endpoints.

use super::health::{health_check, readiness_check};
use super::state::AppState;
use crate::api::{
    checkin, coupons, events, notifications, organizations, registrations, sessions, users,
};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use gather_web::correlation_id_layer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// Route groups:
/// - Health checks (no authentication)
/// - Public event browsing
/// - User-scoped registration and inbox routes (bearer → user)
/// - Admin routes (bearer → organization owner/member)
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Public event browsing
        .route("/events", get(events::list_events))
        .route("/events/:id", get(events::get_event))
        .route("/events/:id/sessions", get(sessions::list_event_sessions))
        // User-scoped routes
        .route("/events/:id/register", post(registrations::register_for_event))
        .route(
            "/events/:id/register",
            delete(registrations::cancel_event_registration),
        )
        .route("/sessions/register", post(registrations::register_for_session))
        .route("/me", get(users::me))
        .route("/notifications", get(notifications::list_notifications))
        .route(
            "/notifications/:id/read",
            post(notifications::mark_notification_read),
        )
        // Admin routes
        .route("/admin/checkin", post(checkin::check_in))
        .route("/admin/attendee", get(checkin::attendee_details))
        .route("/admin/coupons", post(coupons::add_coupon))
        .route("/admin/coupons/redeem", post(coupons::redeem_coupon))
        .route(
            "/admin/notifications",
            post(notifications::create_notification),
        )
        .route(
            "/admin/notifications/:id/rematerialize",
            post(notifications::rematerialize_notification),
        )
        .route("/admin/events", post(events::create_event))
        .route("/admin/events", get(events::list_organization_events))
        .route("/admin/events/:id", put(events::update_event))
        .route("/admin/events/:id", delete(events::delete_event))
        .route("/admin/sessions", post(sessions::create_session))
        .route(
            "/admin/organizations",
            post(organizations::create_organization),
        )
        .route("/admin/organizations/me", get(organizations::my_organization))
        .route(
            "/admin/organizations/members",
            post(organizations::add_member),
        );

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes)
        .layer(correlation_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

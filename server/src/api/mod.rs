//! HTTP API endpoints.
//!
//! One module per surface. Handlers are thin adapters: extract the caller,
//! call the engine, shape the response. Success bodies share the platform
//! envelope `{"success": true, "message": …, "data": …}`; errors are
//! shaped by `gather_web::AppError`.

pub mod checkin;
pub mod coupons;
pub mod events;
pub mod notifications;
pub mod organizations;
pub mod registrations;
pub mod sessions;
pub mod users;

use serde::Serialize;

/// Success envelope shared by all endpoints.
#[derive(Debug, Serialize)]
pub struct ApiSuccess<T> {
    /// Always `true` on success responses.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
    /// Endpoint-specific payload.
    pub data: T,
}

/// Builds the success envelope.
pub fn success<T: Serialize>(message: impl Into<String>, data: T) -> ApiSuccess<T> {
    ApiSuccess {
        success: true,
        message: message.into(),
        data,
    }
}

//! Error types for web handlers.
//!
//! [`AppError`] bridges the domain error taxonomy and HTTP responses. Every
//! error body carries a `success: false` flag, a machine-readable code, and
//! a human message; extended diagnostic detail is included only in
//! non-production (debug) builds. Store and consistency failures are logged
//! with full detail server-side and surfaced as a generic internal error.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gather_core::{ConflictReason, Error};
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
///
/// Construct directly for handler-level failures, or convert from
/// [`gather_core::Error`] for engine failures:
///
/// ```ignore
/// async fn handler(state: AppState) -> Result<Json<Data>, AppError> {
///     let registration = state.registration.register_for_event(&user, id).await?;
///     Ok(Json(registration))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Machine-readable code (for client error handling)
    code: &'static str,
    /// Human-readable message
    message: String,
    /// Internal detail (logged; exposed only in debug builds)
    detail: Option<String>,
}

impl AppError {
    /// Creates an error with an explicit status and code.
    #[must_use]
    pub const fn new(status: StatusCode, code: &'static str, message: String) -> Self {
        Self {
            status,
            code,
            message,
            detail: None,
        }
    }

    /// Attaches internal diagnostic detail.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// 400 Bad Request.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message.into())
    }

    /// 401 Unauthorized.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message.into())
    }

    /// 403 Forbidden.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden", message.into())
    }

    /// 404 Not Found.
    #[must_use]
    pub fn not_found(entity: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("{entity} not found"),
        )
    }

    /// 409 Conflict.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "conflict", message.into())
    }

    /// 500 Internal Server Error with a generic message.
    #[must_use]
    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "An internal error occurred".to_string(),
        )
    }

    /// The response status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// The machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

/// Conflicts that denote a consumed resource are hard conflicts (409);
/// precondition failures stay 400 to match the public API contract.
const fn conflict_status(reason: ConflictReason) -> StatusCode {
    match reason {
        ConflictReason::AlreadyRedeemed | ConflictReason::AlreadyCancelled => {
            StatusCode::CONFLICT
        }
        ConflictReason::DeadlinePassed
        | ConflictReason::AlreadyRegistered
        | ConflictReason::CapacityExceeded
        | ConflictReason::NotRegistered => StatusCode::BAD_REQUEST,
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound { entity } => Self::not_found(entity),
            Error::Validation { message } => Self::new(
                StatusCode::BAD_REQUEST,
                "validation_error",
                message,
            ),
            Error::Conflict(reason) => Self::new(
                conflict_status(reason),
                reason.code(),
                reason.message().to_string(),
            ),
            Error::Unauthorized { message } => Self::unauthorized(message),
            Error::Consistency { detail } => {
                tracing::error!(detail = %detail, "consistency fault");
                Self::internal().with_detail(detail)
            }
            Error::Store(store_err) => {
                tracing::error!(error = %store_err, "store failure");
                Self::internal().with_detail(store_err.to_string())
            }
        }
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorBody {
    /// Always `false` on error responses.
    success: bool,
    /// Machine-readable code.
    error: &'static str,
    /// Human-readable message.
    message: String,
    /// Diagnostic detail; present only in debug builds.
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                code = self.code,
                message = %self.message,
                detail = self.detail.as_deref().unwrap_or(""),
                "request failed"
            );
        }

        let detail = if cfg!(debug_assertions) {
            self.detail
        } else {
            None
        };

        let body = ErrorBody {
            success: false,
            error: self.code,
            message: self.message,
            detail,
        };

        (self.status, Json(body)).into_response()
    }
}

//! Axum plumbing for the Gather event platform.
//!
//! This crate bridges the domain layer and HTTP:
//!
//! - [`error::AppError`]: maps the domain error taxonomy onto status codes
//!   and the platform's JSON error body (`success` flag + machine-readable
//!   code + human message)
//! - [`extractors`]: bearer credentials and correlation ids
//! - [`middleware`]: per-request correlation-id tracking and tracing spans
//!
//! The identity-aware extractors (current user, organization actor) live in
//! the server crate where the concrete application state is known; this
//! crate stays state-generic.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod extractors;
pub mod middleware;

pub use error::AppError;
pub use extractors::{BearerToken, CorrelationId};
pub use middleware::{correlation_id_layer, CORRELATION_ID_HEADER};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;

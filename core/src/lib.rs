//! Gather - an event-management backend.
//!
//! This crate holds the domain model and the engines that protect its
//! invariants:
//!
//! - **Registration engine**: event and session admission (deadline,
//!   duplicate, and capacity checks), cancellation
//! - **Attendance engine**: exactly-once check-in, idempotent on repeat scans
//! - **Coupon engine**: at-most-once redemption of per-event food coupons
//! - **Notification fan-out**: one delivery record per confirmed registrant
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Imperative Shell (Axum)         │  ← HTTP, JSON, extractors
//! ├─────────────────────────────────────────┤
//! │         Engines (this crate)            │  ← precondition checks,
//! │  registration / attendance / coupons    │    error taxonomy
//! ├─────────────────────────────────────────┤
//! │         Store traits (this crate)       │  ← atomic admission,
//! │  Postgres impl / in-memory test impl    │    conditional check-in
//! └─────────────────────────────────────────┘
//! ```
//!
//! A registration is a single row keyed by (event, user); the event-side and
//! user-side views the HTTP layer exposes are both queries over that row, so
//! they cannot diverge. The operations with real race windows (admission
//! near a capacity boundary, the attended flip, coupon redemption) are
//! pushed down into the store traits, whose implementations must make them
//! atomic (see [`store`]).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod attendance;
pub mod clock;
pub mod coupons;
pub mod error;
pub mod notifications;
pub mod registration;
pub mod store;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use error::{ConflictReason, Error, Result};
pub use store::{Store, StoreError};
pub use types::*;

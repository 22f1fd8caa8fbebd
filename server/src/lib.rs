//! Gather HTTP server.
//!
//! Event-management backend: organizations create events, users register
//! for events and sessions, organizers check attendees in, redeem food
//! coupons, and fan out notifications.
//!
//! # Layout
//!
//! - [`config`]: environment-driven configuration
//! - [`auth`]: identity-aware extractors (`CurrentUser`, `OrgActor`)
//! - [`api`]: one module per HTTP surface
//! - [`server`]: router, shared state, health endpoints
//! - [`metrics`]: Prometheus business metrics

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod auth;
pub mod config;
pub mod metrics;
pub mod server;

pub use config::Config;
pub use server::{build_router, AppState};

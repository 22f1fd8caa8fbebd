//! Testing utilities for the Gather event platform.
//!
//! This crate provides:
//! - [`MemoryStore`]: an in-process implementation of every store trait,
//!   honoring the same atomicity contracts as the Postgres store (a single
//!   async mutex serializes admission, check-in, and redemption)
//! - [`FixedClock`]: deterministic time for engine tests
//! - [`fixtures`]: builders for domain entities with sensible defaults
//!
//! # Example
//!
//! ```ignore
//! use gather_testing::{fixtures, MemoryStore};
//! use gather_core::registration::{RegistrationEngine, RegistrationPolicy};
//! use std::sync::Arc;
//!
//! #[tokio::test]
//! async fn test_registration_flow() {
//!     let store = Arc::new(MemoryStore::new());
//!     let user = fixtures::user().insert(&store).await;
//!     let event = fixtures::event().insert(&store).await;
//!
//!     let engine = RegistrationEngine::new(
//!         store.clone(),
//!         Arc::new(gather_core::SystemClock),
//!         RegistrationPolicy::default(),
//!     );
//!     engine.register_for_event(&user, event.id).await.unwrap();
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod memory;

pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use gather_core::Clock;

/// Fixed clock for deterministic tests. Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Creates a clock pinned to `time`.
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

//! Clock abstraction for testable time.
//!
//! Engines never call `Utc::now()` directly; they take an `Arc<dyn Clock>`
//! so tests can pin time when exercising deadline and check-in behavior.

use chrono::{DateTime, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

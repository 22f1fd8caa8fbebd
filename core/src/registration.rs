//! Registration engine: event and session admission.
//!
//! Governs the registration lifecycle: deadline check, duplicate check,
//! capacity check, cancellation. The engine performs the time-based
//! precondition checks itself (the deadline has no race window worth
//! guarding) and delegates the racy ones, duplicate detection and capacity
//! enforcement, to the store's atomic admission operation, then maps the
//! outcome back onto the error taxonomy. Under concurrent registration near
//! the capacity boundary the store serializes admission per event, so at
//! most `max_capacity` confirmed registrations ever exist.

use crate::clock::Clock;
use crate::error::{ConflictReason, Error, Result};
use crate::store::{Admission, Cancellation, Store};
use crate::types::{
    EventId, EventRegistration, SessionId, SessionRegistration, User,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

// ============================================================================
// Policy
// ============================================================================

/// Tunable registration behavior.
#[derive(Clone, Copy, Debug, Default)]
pub struct RegistrationPolicy {
    /// Whether session registration requires a prior confirmed registration
    /// for the parent event. The source system left this check disabled in
    /// its active code path, so the default is `false`.
    pub require_event_registration: bool,
}

// ============================================================================
// Validation
// ============================================================================

/// Returns `true` when a deadline is set and `now` is at or past it.
#[must_use]
pub fn deadline_passed(deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    deadline.is_some_and(|d| now >= d)
}

/// Returns `true` when a capacity limit is set and already met.
#[must_use]
pub fn at_capacity(max_capacity: Option<u32>, confirmed: u32) -> bool {
    max_capacity.is_some_and(|max| confirmed >= max)
}

/// Validates a scheduling window: start strictly before end, and any
/// registration deadline not after the start.
///
/// # Errors
///
/// Returns [`Error::Validation`] describing the first violated rule.
pub fn validate_schedule(
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    registration_deadline: Option<DateTime<Utc>>,
) -> Result<()> {
    if start_time >= end_time {
        return Err(Error::validation("End time must be after start time"));
    }
    if let Some(deadline) = registration_deadline {
        if deadline > start_time {
            return Err(Error::validation(
                "Registration deadline must not be after the start time",
            ));
        }
    }
    Ok(())
}

// ============================================================================
// Engine
// ============================================================================

/// Registration engine over a [`Store`].
pub struct RegistrationEngine<S: ?Sized> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    policy: RegistrationPolicy,
}

impl<S: Store + ?Sized> RegistrationEngine<S> {
    /// Creates a new engine.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, policy: RegistrationPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    /// Registers a user for an event.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the event does not exist
    /// - [`Error::Conflict`] with `deadline_passed`, `already_registered`,
    ///   or `capacity_exceeded`
    /// - [`Error::Store`] if the store fails
    pub async fn register_for_event(
        &self,
        user: &User,
        event_id: EventId,
    ) -> Result<EventRegistration> {
        let event = self
            .store
            .event(event_id)
            .await?
            .ok_or(Error::not_found("event"))?;

        let now = self.clock.now();
        if deadline_passed(event.registration_deadline, now) {
            return Err(Error::Conflict(ConflictReason::DeadlinePassed));
        }

        match self
            .store
            .admit_event_registration(event_id, user.id, now)
            .await?
        {
            Admission::Admitted {
                registration_date,
                status,
            } => {
                tracing::info!(
                    event_id = %event_id,
                    user_id = %user.id,
                    "user registered for event"
                );
                Ok(EventRegistration {
                    event_id,
                    user_id: user.id,
                    registration_date,
                    status,
                    attended: false,
                    check_in_time: None,
                })
            }
            Admission::Duplicate => Err(Error::Conflict(ConflictReason::AlreadyRegistered)),
            Admission::Full => Err(Error::Conflict(ConflictReason::CapacityExceeded)),
            Admission::Missing => Err(Error::not_found("event")),
        }
    }

    /// Registers a user for a session under the given event.
    ///
    /// Session capacity is independent of the event's. Whether a confirmed
    /// event registration is required first is controlled by
    /// [`RegistrationPolicy::require_event_registration`].
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the event or session does not exist
    /// - [`Error::Validation`] if the session belongs to a different event
    /// - [`Error::Conflict`] with `not_registered`, `already_registered`,
    ///   or `capacity_exceeded`
    /// - [`Error::Store`] if the store fails
    pub async fn register_for_session(
        &self,
        user: &User,
        event_id: EventId,
        session_id: SessionId,
    ) -> Result<SessionRegistration> {
        let event = self
            .store
            .event(event_id)
            .await?
            .ok_or(Error::not_found("event"))?;
        let session = self
            .store
            .session(session_id)
            .await?
            .ok_or(Error::not_found("session"))?;

        if session.event_id != event.id {
            return Err(Error::validation(
                "Session does not belong to the specified event",
            ));
        }

        if self.policy.require_event_registration {
            let confirmed = self
                .store
                .event_registration(event_id, user.id)
                .await?
                .is_some_and(|r| r.status == crate::types::RegistrationStatus::Confirmed);
            if !confirmed {
                return Err(Error::Conflict(ConflictReason::NotRegistered));
            }
        }

        let now = self.clock.now();
        match self
            .store
            .admit_session_registration(session_id, event_id, user.id, now)
            .await?
        {
            Admission::Admitted {
                registration_date,
                status,
            } => {
                tracing::info!(
                    session_id = %session_id,
                    event_id = %event_id,
                    user_id = %user.id,
                    "user registered for session"
                );
                Ok(SessionRegistration {
                    session_id,
                    event_id,
                    user_id: user.id,
                    registration_date,
                    status,
                })
            }
            Admission::Duplicate => Err(Error::Conflict(ConflictReason::AlreadyRegistered)),
            Admission::Full => Err(Error::Conflict(ConflictReason::CapacityExceeded)),
            Admission::Missing => Err(Error::not_found("session")),
        }
    }

    /// Cancels a user's event registration. The record is kept with status
    /// `cancelled`; a freed seat becomes available to later registrants.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if no registration exists
    /// - [`Error::Conflict`] with `already_cancelled` on repeat
    /// - [`Error::Store`] if the store fails
    pub async fn cancel_event_registration(
        &self,
        user: &User,
        event_id: EventId,
    ) -> Result<()> {
        match self
            .store
            .cancel_event_registration(event_id, user.id)
            .await?
        {
            Cancellation::Cancelled => {
                tracing::info!(
                    event_id = %event_id,
                    user_id = %user.id,
                    "registration cancelled"
                );
                Ok(())
            }
            Cancellation::AlreadyCancelled => {
                Err(Error::Conflict(ConflictReason::AlreadyCancelled))
            }
            Cancellation::NotRegistered => Err(Error::not_found("registration")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_deadline_open_when_unset() {
        assert!(!deadline_passed(None, at(12)));
    }

    #[test]
    fn test_deadline_passed_at_exact_instant() {
        // The deadline instant itself is closed, matching "now <
        // registration_deadline" as the admission precondition.
        assert!(deadline_passed(Some(at(12)), at(12)));
        assert!(deadline_passed(Some(at(12)), at(13)));
        assert!(!deadline_passed(Some(at(12)), at(11)));
    }

    #[test]
    fn test_unbounded_capacity_never_full() {
        assert!(!at_capacity(None, u32::MAX));
    }

    #[test]
    fn test_capacity_boundary() {
        assert!(!at_capacity(Some(2), 1));
        assert!(at_capacity(Some(2), 2));
        assert!(at_capacity(Some(0), 0));
    }

    #[test]
    fn test_schedule_rejects_inverted_window() {
        let err = validate_schedule(at(14), at(12), None).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_schedule_rejects_deadline_after_start() {
        let err = validate_schedule(at(10), at(12), Some(at(11))).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_schedule_accepts_deadline_at_start() {
        assert!(validate_schedule(at(10), at(12), Some(at(10))).is_ok());
    }

    proptest! {
        /// Admitting only while below the limit can never exceed it,
        /// whatever the arrival order of admit/cancel attempts.
        #[test]
        fn prop_confirmed_never_exceeds_capacity(
            max in 0u32..50,
            attempts in proptest::collection::vec(any::<bool>(), 0..200),
        ) {
            let mut confirmed = 0u32;
            for is_registration in attempts {
                if is_registration {
                    if !at_capacity(Some(max), confirmed) {
                        confirmed += 1;
                    }
                } else if confirmed > 0 {
                    // cancellation frees a seat
                    confirmed -= 1;
                }
                prop_assert!(confirmed <= max);
            }
        }

        /// A deadline never admits at or after its instant.
        #[test]
        fn prop_deadline_is_half_open(offset_secs in -86_400i64..86_400) {
            let deadline = at(12);
            let now = deadline + chrono::Duration::seconds(offset_secs);
            prop_assert_eq!(deadline_passed(Some(deadline), now), offset_secs >= 0);
        }
    }
}

//! Attendance engine: one-time check-in keyed by a QR scan.
//!
//! Check-in transitions a confirmed registration's `attended` flag
//! false→true exactly once. A repeat scan is expected operator behavior
//! (the same badge held up twice), so it is **not** an error: the engine
//! reports the original check-in time with an explicit already-checked-in
//! indicator, and the HTTP layer maps that to 208 instead of 200. This is
//! the one place in the system where "first success" and "idempotent
//! repeat" are distinct outcomes rather than a collapsed generic success.

use crate::clock::Clock;
use crate::error::{ConflictReason, Error, Result};
use crate::store::{CheckIn, Store};
use crate::types::{
    EventId, Organization, RegistrationStatus, User, UserIdentifier,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Result of a check-in scan.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckInRecord {
    /// The event checked into
    pub event_id: EventId,
    /// The event's display name (for the scanning UI)
    pub event_name: String,
    /// The resolved attendee
    pub user: User,
    /// When the attendee was checked in (original instant on repeats)
    pub checked_in_at: DateTime<Utc>,
    /// `true` when this scan found an earlier check-in
    pub already_checked_in: bool,
}

/// Attendance engine over a [`Store`].
pub struct AttendanceEngine<S: ?Sized> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: Store + ?Sized> AttendanceEngine<S> {
    /// Creates a new engine.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Resolves a scanned identifier to a user record.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if no user matches; [`Error::Store`] on store
    /// failure.
    pub async fn resolve_attendee(&self, identifier: &UserIdentifier) -> Result<User> {
        let user = match identifier {
            UserIdentifier::Id(id) => self.store.user(*id).await?,
            UserIdentifier::External(id) => self.store.user_by_external_id(id).await?,
        };
        user.ok_or(Error::not_found("user"))
    }

    /// Checks an attendee into an event on behalf of the owning
    /// organization.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the event is absent or not owned by `org`
    ///   (indistinguishable by design), or the identifier resolves to no
    ///   user
    /// - [`Error::Conflict`] with `not_registered` if the user holds no
    ///   confirmed registration
    /// - [`Error::Store`] if the store fails
    pub async fn check_in(
        &self,
        org: &Organization,
        event_id: EventId,
        identifier: &UserIdentifier,
    ) -> Result<CheckInRecord> {
        let event = self
            .store
            .event_owned_by(event_id, org.id)
            .await?
            .ok_or(Error::not_found("event"))?;
        let user = self.resolve_attendee(identifier).await?;

        match self
            .store
            .record_check_in(event_id, user.id, self.clock.now())
            .await?
        {
            CheckIn::First { checked_in_at } => {
                tracing::info!(
                    event_id = %event_id,
                    user_id = %user.id,
                    "attendee checked in"
                );
                Ok(CheckInRecord {
                    event_id,
                    event_name: event.name,
                    user,
                    checked_in_at,
                    already_checked_in: false,
                })
            }
            CheckIn::Repeat { checked_in_at } => Ok(CheckInRecord {
                event_id,
                event_name: event.name,
                user,
                checked_in_at,
                already_checked_in: true,
            }),
            CheckIn::NotRegistered => {
                // The conditional update matched nothing. If a confirmed,
                // unattended registration is nevertheless readable, the
                // store broke its contract.
                if let Some(reg) = self.store.event_registration(event_id, user.id).await? {
                    if reg.status == RegistrationStatus::Confirmed && !reg.attended {
                        return Err(Error::Consistency {
                            detail: format!(
                                "check-in matched no row but a confirmed unattended \
                                 registration exists for event {event_id} user {}",
                                user.id
                            ),
                        });
                    }
                }
                Err(Error::Conflict(ConflictReason::NotRegistered))
            }
        }
    }

    /// Admin lookup for a scanned attendee: profile, registration state,
    /// and redeemed coupons for one event.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`Self::check_in`], minus the registration
    /// requirement: an unregistered attendee is reported, not rejected.
    pub async fn attendee_details(
        &self,
        org: &Organization,
        event_id: EventId,
        identifier: &UserIdentifier,
    ) -> Result<AttendeeDetails> {
        self.store
            .event_owned_by(event_id, org.id)
            .await?
            .ok_or(Error::not_found("event"))?;
        let user = self.resolve_attendee(identifier).await?;
        let registration = self.store.event_registration(event_id, user.id).await?;
        let coupons_used = self.store.coupons_used(event_id, user.id).await?;

        Ok(AttendeeDetails {
            user,
            registration,
            coupons_used,
        })
    }
}

/// What the scanning UI shows about an attendee.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendeeDetails {
    /// The resolved user
    pub user: User,
    /// Their registration for the event, if any
    pub registration: Option<crate::types::EventRegistration>,
    /// Coupons they have redeemed at the event
    pub coupons_used: Vec<crate::types::CouponUse>,
}

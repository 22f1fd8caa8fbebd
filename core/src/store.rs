//! Store traits for the entity store.
//!
//! This module defines the persistence seam between the engines and the
//! database. The traits are deliberately minimal: plain lookups plus the
//! handful of **atomic** operations the invariants depend on.
//!
//! # Atomicity contracts
//!
//! Per-request handling is fully concurrent and the store is the only shared
//! mutable resource, so an application-level read-check-then-write is not a
//! sufficient guard: two requests can both pass the check before either
//! writes. Implementations must therefore make these operations atomic:
//!
//! - [`RegistrationStore::admit_event_registration`]: duplicate and capacity
//!   checks evaluated in the same step as the insert. Admission is serialized
//!   per event; at most `max_capacity` confirmed registrations can ever
//!   exist.
//! - [`RegistrationStore::record_check_in`]: conditional flip of the
//!   `attended` flag; exactly one caller observes the first-success outcome.
//! - [`RegistrationStore::redeem_coupon`]: insert-if-absent on
//!   (event, user, coupon); a second redemption reports `AlreadyRedeemed`.
//! - [`NotificationStore::insert_delivery`]: skip-if-exists, so a repair
//!   pass can re-run a partial fan-out.
//!
//! # Implementations
//!
//! - `PostgresStore` (in `gather-postgres`): production implementation using
//!   a transaction with a row lock on the event for admission
//! - `MemoryStore` (in `gather-testing`): in-process implementation honoring
//!   the same contracts behind an async mutex

use crate::types::{
    CouponId, CouponUse, Event, EventId, EventRegistration, ExternalId, FoodCoupon, NewUser,
    Notification, NotificationDelivery, NotificationId, Organization, OrganizationId,
    RegistrationStatus, Session, SessionId, SessionRegistration, User, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors produced by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Could not reach the database.
    #[error("store connection error: {0}")]
    Connection(String),

    /// A query failed.
    #[error("store query error: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("store migration error: {0}")]
    Migration(String),
}

/// Outcome of an atomic admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A new registration row was created.
    Admitted {
        /// Timestamp written to the row
        registration_date: DateTime<Utc>,
        /// Status written to the row
        status: RegistrationStatus,
    },
    /// The user already holds a registration; nothing was written.
    Duplicate,
    /// Confirmed count has reached `max_capacity`; nothing was written.
    Full,
    /// The target event/session disappeared between check and write.
    Missing,
}

/// Outcome of an atomic check-in attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckIn {
    /// First scan: the attended flag flipped false→true now.
    First {
        /// Timestamp written to the registration
        checked_in_at: DateTime<Utc>,
    },
    /// The user was already checked in; nothing was written.
    Repeat {
        /// The original check-in timestamp
        checked_in_at: DateTime<Utc>,
    },
    /// No confirmed registration exists for this (event, user).
    NotRegistered,
}

/// Outcome of an atomic redemption attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redemption {
    /// The redemption row was created now.
    Redeemed {
        /// Timestamp written to the redemption record
        scanned_at: DateTime<Utc>,
    },
    /// A redemption for this (event, user, coupon) already exists.
    AlreadyRedeemed,
}

/// Outcome of a cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cancellation {
    /// Status set to cancelled now.
    Cancelled,
    /// The registration was already cancelled.
    AlreadyCancelled,
    /// No registration exists for this (event, user).
    NotRegistered,
}

/// Outcome of marking a notification delivery read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkRead {
    /// `read_at` was stamped now.
    Marked,
    /// The delivery was already read; the original `read_at` stands.
    AlreadyRead,
    /// No delivery record exists for this (notification, user).
    NotFound,
}

/// Organizations, events, sessions, and coupon definitions.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persists a new organization.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn create_organization(&self, org: &Organization) -> Result<(), StoreError>;

    /// Loads an organization by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn organization(&self, id: OrganizationId) -> Result<Option<Organization>, StoreError>;

    /// Finds the organization an actor may act for: first the one they own,
    /// otherwise the first one listing them as a member.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn organization_for_actor(
        &self,
        actor: &ExternalId,
    ) -> Result<Option<Organization>, StoreError>;

    /// Adds a member identity to an organization. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn add_organization_member(
        &self,
        org_id: OrganizationId,
        member: &ExternalId,
    ) -> Result<(), StoreError>;

    /// Persists a new event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn create_event(&self, event: &Event) -> Result<(), StoreError>;

    /// Loads an event by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn event(&self, id: EventId) -> Result<Option<Event>, StoreError>;

    /// Loads an event only if it belongs to the given organization.
    ///
    /// Callers use this for admin-scoped operations so that "absent" and
    /// "not yours" are indistinguishable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn event_owned_by(
        &self,
        id: EventId,
        org_id: OrganizationId,
    ) -> Result<Option<Event>, StoreError>;

    /// Lists events, optionally restricted to one organization, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn list_events(&self, org_id: Option<OrganizationId>) -> Result<Vec<Event>, StoreError>;

    /// Overwrites an event's mutable attributes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn update_event(&self, event: &Event) -> Result<(), StoreError>;

    /// Deletes an event and its dependents. Returns `false` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn delete_event(&self, id: EventId) -> Result<bool, StoreError>;

    /// Persists a new session.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn create_session(&self, session: &Session) -> Result<(), StoreError>;

    /// Loads a session by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn session(&self, id: SessionId) -> Result<Option<Session>, StoreError>;

    /// Lists an event's sessions ordered by start time.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn sessions_for_event(&self, event_id: EventId) -> Result<Vec<Session>, StoreError>;

    /// Lists an event's coupon definitions ordered by coupon id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn coupons_for_event(&self, event_id: EventId) -> Result<Vec<FoodCoupon>, StoreError>;

    /// Adds a coupon definition, assigning the next free per-event id.
    /// Returns `None` if the event is absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn add_coupon(
        &self,
        event_id: EventId,
        name: &str,
        description: Option<&str>,
        quantity: u32,
    ) -> Result<Option<FoodCoupon>, StoreError>;
}

/// User records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Loads a user by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Loads a user by their identity-provider id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn user_by_external_id(&self, id: &ExternalId) -> Result<Option<User>, StoreError>;

    /// Returns the user for a resolved identity, creating the record on
    /// first resolution. Concurrent calls for the same identity must yield
    /// one record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn find_or_create_user(&self, new_user: &NewUser) -> Result<User, StoreError>;
}

/// Registrations, check-ins, and coupon redemptions.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Atomically admits a user to an event: inserts a confirmed
    /// registration only if none exists for (event, user) and the confirmed
    /// count is below `max_capacity`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the transaction fails.
    async fn admit_event_registration(
        &self,
        event_id: EventId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<Admission, StoreError>;

    /// Atomically admits a user to a session against the session's own
    /// capacity. Event-level registration is not consulted here; that policy
    /// belongs to the engine.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the transaction fails.
    async fn admit_session_registration(
        &self,
        session_id: SessionId,
        event_id: EventId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<Admission, StoreError>;

    /// Loads one event registration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn event_registration(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Option<EventRegistration>, StoreError>;

    /// Lists an event's registrations, oldest first (the event-side view).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn registrations_for_event(
        &self,
        event_id: EventId,
    ) -> Result<Vec<EventRegistration>, StoreError>;

    /// Lists a user's event registrations, oldest first (the user-side view).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn registrations_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<EventRegistration>, StoreError>;

    /// Lists a user's session registrations, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn session_registrations_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<SessionRegistration>, StoreError>;

    /// Counts confirmed registrations for an event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn confirmed_count(&self, event_id: EventId) -> Result<u32, StoreError>;

    /// Sets a registration's status to cancelled. The row is kept.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn cancel_event_registration(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Cancellation, StoreError>;

    /// Atomically records a check-in: flips `attended` false→true and stamps
    /// `check_in_time` if and only if a confirmed, not-yet-attended
    /// registration exists. A repeat scan reports [`CheckIn::Repeat`] with
    /// the original timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn record_check_in(
        &self,
        event_id: EventId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<CheckIn, StoreError>;

    /// Atomically records a coupon redemption for (event, user, coupon).
    /// The caller must have verified that the coupon definition exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn redeem_coupon(
        &self,
        event_id: EventId,
        user_id: UserId,
        coupon_id: CouponId,
        at: DateTime<Utc>,
    ) -> Result<Redemption, StoreError>;

    /// Lists the coupons a user has redeemed at an event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn coupons_used(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Vec<CouponUse>, StoreError>;
}

/// Notifications and per-user delivery records.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Persists a notification.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn create_notification(&self, notification: &Notification) -> Result<(), StoreError>;

    /// Loads a notification by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn notification(
        &self,
        id: NotificationId,
    ) -> Result<Option<Notification>, StoreError>;

    /// Creates a delivery record unless one already exists. Returns `true`
    /// if a record was created.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn insert_delivery(
        &self,
        notification_id: NotificationId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Lists a user's deliveries with their notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn deliveries_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<(NotificationDelivery, Notification)>, StoreError>;

    /// Stamps `read_at` on a delivery, once.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn mark_delivery_read(
        &self,
        notification_id: NotificationId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<MarkRead, StoreError>;
}

/// The full entity store the engines operate on.
pub trait Store: EventStore + UserStore + RegistrationStore + NotificationStore {}

impl<T> Store for T where T: EventStore + UserStore + RegistrationStore + NotificationStore {}

//! Builders for domain entities with sensible defaults.
//!
//! Every builder produces a valid entity; tests override only the fields
//! they exercise. Times default to a fixed date so assertions are stable.

use chrono::{DateTime, TimeZone, Utc};
use gather_core::store::{EventStore, StoreError, UserStore};
use gather_core::types::{
    Event, EventId, ExternalId, NewUser, Organization, OrganizationId, Role, Session, SessionId,
    User, UserId,
};

/// Base instant all fixture times are derived from.
#[must_use]
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0)
        .earliest()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Starts an organization builder.
#[must_use]
pub fn organization() -> OrganizationBuilder {
    OrganizationBuilder {
        name: "Acme Conferences".to_string(),
        owner: ExternalId::new("owner-1"),
    }
}

/// Builder for [`Organization`].
pub struct OrganizationBuilder {
    name: String,
    owner: ExternalId,
}

impl OrganizationBuilder {
    /// Sets the display name.
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Sets the owner's external identity.
    #[must_use]
    pub fn owner(mut self, owner: &str) -> Self {
        self.owner = ExternalId::new(owner);
        self
    }

    /// Builds the organization.
    #[must_use]
    pub fn build(self) -> Organization {
        let now = base_time();
        Organization {
            id: OrganizationId::new(),
            name: self.name,
            description: None,
            contact_email: None,
            website: None,
            owner_external_id: self.owner,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builds and persists the organization.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    pub async fn insert<S: EventStore>(self, store: &S) -> Result<Organization, StoreError> {
        let org = self.build();
        store.create_organization(&org).await?;
        Ok(org)
    }
}

/// Starts a user builder.
#[must_use]
pub fn user() -> UserBuilder {
    UserBuilder {
        external_id: ExternalId::new("ext-user-1"),
        email: "attendee@example.com".to_string(),
        full_name: "Ada Attendee".to_string(),
        role: Role::User,
    }
}

/// Builder for [`User`].
pub struct UserBuilder {
    external_id: ExternalId,
    email: String,
    full_name: String,
    role: Role,
}

impl UserBuilder {
    /// Sets the external identity.
    #[must_use]
    pub fn external_id(mut self, id: &str) -> Self {
        self.external_id = ExternalId::new(id);
        self
    }

    /// Sets the email address.
    #[must_use]
    pub fn email(mut self, email: &str) -> Self {
        self.email = email.to_string();
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn full_name(mut self, name: &str) -> Self {
        self.full_name = name.to_string();
        self
    }

    /// Sets the platform role.
    #[must_use]
    pub const fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Builds the user without persisting.
    #[must_use]
    pub fn build(self) -> User {
        let now = base_time();
        User {
            id: UserId::new(),
            external_id: self.external_id,
            email: self.email,
            full_name: self.full_name,
            role: self.role,
            created_at: now,
            updated_at: now,
        }
    }

    /// Persists via find-or-create and returns the stored record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    pub async fn insert<S: UserStore>(self, store: &S) -> Result<User, StoreError> {
        store
            .find_or_create_user(&NewUser {
                external_id: self.external_id,
                email: self.email,
                full_name: self.full_name,
            })
            .await
    }
}

/// Starts an event builder owned by `org_id`.
#[must_use]
pub fn event(org_id: OrganizationId) -> EventBuilder {
    let start = base_time() + chrono::Duration::days(30);
    EventBuilder {
        organization_id: org_id,
        name: "RustConf".to_string(),
        start_time: start,
        end_time: start + chrono::Duration::hours(8),
        max_capacity: None,
        registration_deadline: None,
    }
}

/// Builder for [`Event`].
pub struct EventBuilder {
    organization_id: OrganizationId,
    name: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    max_capacity: Option<u32>,
    registration_deadline: Option<DateTime<Utc>>,
}

impl EventBuilder {
    /// Sets the display name.
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Sets the capacity limit.
    #[must_use]
    pub const fn max_capacity(mut self, max: u32) -> Self {
        self.max_capacity = Some(max);
        self
    }

    /// Sets the registration deadline.
    #[must_use]
    pub const fn registration_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.registration_deadline = Some(deadline);
        self
    }

    /// Sets the scheduling window.
    #[must_use]
    pub const fn window(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    /// Builds the event without persisting.
    #[must_use]
    pub fn build(self) -> Event {
        let now = base_time();
        Event {
            id: EventId::new(),
            organization_id: self.organization_id,
            name: self.name,
            description: None,
            venue: None,
            is_online: false,
            online_url: None,
            event_type: None,
            start_time: self.start_time,
            end_time: self.end_time,
            max_capacity: self.max_capacity,
            registration_deadline: self.registration_deadline,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builds and persists the event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    pub async fn insert<S: EventStore>(self, store: &S) -> Result<Event, StoreError> {
        let event = self.build();
        store.create_event(&event).await?;
        Ok(event)
    }
}

/// Starts a session builder under `event_id`.
#[must_use]
pub fn session(event_id: EventId) -> SessionBuilder {
    let start = base_time() + chrono::Duration::days(30) + chrono::Duration::hours(1);
    SessionBuilder {
        event_id,
        name: "Opening Keynote".to_string(),
        start_time: start,
        end_time: start + chrono::Duration::hours(1),
        max_capacity: None,
    }
}

/// Builder for [`Session`].
pub struct SessionBuilder {
    event_id: EventId,
    name: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    max_capacity: Option<u32>,
}

impl SessionBuilder {
    /// Sets the display name.
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Sets the capacity limit.
    #[must_use]
    pub const fn max_capacity(mut self, max: u32) -> Self {
        self.max_capacity = Some(max);
        self
    }

    /// Builds the session without persisting.
    #[must_use]
    pub fn build(self) -> Session {
        let now = base_time();
        Session {
            id: SessionId::new(),
            event_id: self.event_id,
            name: self.name,
            description: None,
            location: None,
            start_time: self.start_time,
            end_time: self.end_time,
            max_capacity: self.max_capacity,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builds and persists the session.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    pub async fn insert<S: EventStore>(self, store: &S) -> Result<Session, StoreError> {
        let session = self.build();
        store.create_session(&session).await?;
        Ok(session)
    }
}

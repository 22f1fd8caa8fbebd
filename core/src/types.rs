//! Domain types for the Gather event platform.
//!
//! Value objects and entities shared by the engines, the stores, and the
//! HTTP layer. Identifier newtypes wrap [`Uuid`] so an event id can never be
//! passed where a user id is expected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing `Uuid`.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner `Uuid`.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for an organization
    OrganizationId
}

uuid_id! {
    /// Unique identifier for an event
    EventId
}

uuid_id! {
    /// Unique identifier for a session within an event
    SessionId
}

uuid_id! {
    /// Unique identifier for a user
    UserId
}

uuid_id! {
    /// Unique identifier for a notification
    NotificationId
}

/// Identity assigned by the external identity provider. Stable across
/// sign-ins; one user record per external id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(String);

impl ExternalId {
    /// Wraps a provider-assigned identity string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a food coupon, unique **within one event** (small integer
/// assigned sequentially by the organizer, not a UUID).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CouponId(i32);

impl CouponId {
    /// Wraps a per-event coupon number.
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Returns the inner number.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

impl fmt::Display for CouponId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Enumerations
// ============================================================================

/// Platform-level role of a user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular attendee.
    #[default]
    User,
    /// Platform administrator.
    Admin,
}

/// Lifecycle status of a registration.
///
/// Only `Confirmed` registrations count toward capacity and are eligible for
/// check-in and coupon redemption. Cancellation sets the status; it never
/// removes the record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    /// Created but not yet counted.
    Pending,
    /// Validated; counts toward capacity.
    #[default]
    Confirmed,
    /// Withdrawn; record retained for audit.
    Cancelled,
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

/// An organization that owns events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    /// Organization id
    pub id: OrganizationId,
    /// Display name
    pub name: String,
    /// Optional free-form description
    pub description: Option<String>,
    /// Contact email shown to attendees
    pub contact_email: Option<String>,
    /// Public website
    pub website: Option<String>,
    /// External identity of the owner
    pub owner_external_id: ExternalId,
    /// When the organization was created
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// A user known to the platform.
///
/// Created on first successful identity resolution or explicit signup; the
/// `external_id` links back to the identity provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User id
    pub id: UserId,
    /// Identity-provider id
    pub external_id: ExternalId,
    /// Email address
    pub email: String,
    /// Display name
    pub full_name: String,
    /// Platform role
    pub role: Role,
    /// When the user record was created
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// Attributes needed to create a user record from a resolved identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    /// Identity-provider id
    pub external_id: ExternalId,
    /// Email address
    pub email: String,
    /// Display name
    pub full_name: String,
}

/// An event owned by an organization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Event id
    pub id: EventId,
    /// Owning organization
    pub organization_id: OrganizationId,
    /// Display name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Venue name/address, if in person
    pub venue: Option<String>,
    /// Whether the event is held online
    pub is_online: bool,
    /// Streaming URL for online events
    pub online_url: Option<String>,
    /// Free-form category ("conference", "meetup", ...)
    pub event_type: Option<String>,
    /// Scheduled start
    pub start_time: DateTime<Utc>,
    /// Scheduled end; always after `start_time`
    pub end_time: DateTime<Utc>,
    /// Maximum number of confirmed registrations; `None` = unbounded
    pub max_capacity: Option<u32>,
    /// Registrations close at this instant; `None` = open until start
    pub registration_deadline: Option<DateTime<Utc>>,
    /// User who created the event
    pub created_by: Option<UserId>,
    /// When the event was created
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// A named consumable attached to an event (lunch voucher, drink token).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodCoupon {
    /// Coupon number, unique within the event
    pub coupon_id: CouponId,
    /// Display name ("Lunch")
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Physical stock hint; informational, not decremented on redemption
    pub quantity: u32,
}

/// A session (talk, workshop) belonging to exactly one event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Session id
    pub id: SessionId,
    /// Parent event
    pub event_id: EventId,
    /// Display name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Room or stage, if in person
    pub location: Option<String>,
    /// Scheduled start
    pub start_time: DateTime<Utc>,
    /// Scheduled end; always after `start_time`
    pub end_time: DateTime<Utc>,
    /// Independent capacity limit; `None` = unbounded
    pub max_capacity: Option<u32>,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Registration records
// ============================================================================

/// A user's registration for an event.
///
/// This row is the single source of truth: the "registered users of event E"
/// and "events user U registered for" views are both queries over it, so the
/// two perspectives agree by construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRegistration {
    /// The event
    pub event_id: EventId,
    /// The registered user
    pub user_id: UserId,
    /// When the registration was admitted
    pub registration_date: DateTime<Utc>,
    /// Lifecycle status
    pub status: RegistrationStatus,
    /// Whether the user has been checked in
    pub attended: bool,
    /// Check-in instant; set exactly once, on the first scan
    pub check_in_time: Option<DateTime<Utc>>,
}

/// A user's registration for a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRegistration {
    /// The session
    pub session_id: SessionId,
    /// The session's parent event
    pub event_id: EventId,
    /// The registered user
    pub user_id: UserId,
    /// When the registration was admitted
    pub registration_date: DateTime<Utc>,
    /// Lifecycle status
    pub status: RegistrationStatus,
}

/// One redeemed coupon for a (user, event) pair.
///
/// Canonical shape is `{couponId, scannedAt}`. The legacy document store also
/// carried bare integers in the same array; [`CouponUse`] deserializes both,
/// mapping the legacy form to `scanned_at: None` (scan time unknown,
/// pre-migration). Serialization always emits the canonical shape.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponUse {
    /// The coupon that was redeemed
    pub coupon_id: CouponId,
    /// When it was scanned; `None` only for records imported from the legacy
    /// bare-integer form
    pub scanned_at: Option<DateTime<Utc>>,
}

impl<'de> Deserialize<'de> for CouponUse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Legacy(i32),
            Canonical {
                #[serde(rename = "couponId")]
                coupon_id: CouponId,
                #[serde(rename = "scannedAt")]
                scanned_at: Option<DateTime<Utc>>,
            },
        }

        match Repr::deserialize(deserializer)? {
            Repr::Legacy(id) => Ok(Self {
                coupon_id: CouponId::new(id),
                scanned_at: None,
            }),
            Repr::Canonical {
                coupon_id,
                scanned_at,
            } => Ok(Self {
                coupon_id,
                scanned_at,
            }),
        }
    }
}

// ============================================================================
// Notifications
// ============================================================================

/// An event-scoped announcement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Notification id
    pub id: NotificationId,
    /// The event the announcement belongs to
    pub event_id: EventId,
    /// Short title
    pub title: String,
    /// Body text
    pub message: String,
    /// Whether a push delivery was requested (delivery itself is external)
    pub is_push: bool,
    /// When the notification was created
    pub created_at: DateTime<Utc>,
}

/// Per-user delivery record for a notification.
///
/// Materialized once per confirmed registrant at creation time; users who
/// register later do not receive earlier notifications.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDelivery {
    /// The notification
    pub notification_id: NotificationId,
    /// The recipient
    pub user_id: UserId,
    /// Whether the user has opened it
    pub is_read: bool,
    /// When it was opened, if ever
    pub read_at: Option<DateTime<Utc>>,
    /// When the delivery record was materialized
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Identifier resolution
// ============================================================================

/// How a scanned QR code (or an admin form) names a user: either the
/// platform's own id or the identity-provider id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserIdentifier {
    /// The platform user id.
    Id(UserId),
    /// The identity-provider id.
    External(ExternalId),
}

impl UserIdentifier {
    /// Parses an identifier string: a well-formed UUID is taken as a
    /// [`UserId`], anything else as an [`ExternalId`].
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match Uuid::parse_str(raw) {
            Ok(uuid) => Self::Id(UserId::from_uuid(uuid)),
            Err(_) => Self::External(ExternalId::new(raw)),
        }
    }
}

impl fmt::Display for UserIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::External(id) => write!(f, "{id}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_status_serde_is_lowercase() {
        let json = serde_json::to_string(&RegistrationStatus::Confirmed).unwrap();
        assert_eq!(json, "\"confirmed\"");
        let parsed: RegistrationStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(parsed, RegistrationStatus::Cancelled);
    }

    #[test]
    fn test_coupon_use_parses_canonical_shape() {
        let parsed: CouponUse =
            serde_json::from_str(r#"{"couponId": 3, "scannedAt": "2025-06-01T12:00:00Z"}"#)
                .unwrap();
        assert_eq!(parsed.coupon_id, CouponId::new(3));
        assert!(parsed.scanned_at.is_some());
    }

    #[test]
    fn test_coupon_use_parses_legacy_bare_integer() {
        let parsed: CouponUse = serde_json::from_str("7").unwrap();
        assert_eq!(parsed.coupon_id, CouponId::new(7));
        assert_eq!(parsed.scanned_at, None);
    }

    #[test]
    fn test_coupon_use_serializes_canonical_only() {
        let legacy: CouponUse = serde_json::from_str("7").unwrap();
        let json = serde_json::to_value(&legacy).unwrap();
        assert_eq!(json["couponId"], 7);
        assert!(json.get("scannedAt").is_some());
    }

    #[test]
    fn test_mixed_coupon_array_normalizes() {
        let parsed: Vec<CouponUse> =
            serde_json::from_str(r#"[1, {"couponId": 2, "scannedAt": null}, 3]"#).unwrap();
        let ids: Vec<i32> = parsed.iter().map(|c| c.coupon_id.as_i32()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_ids_display_as_uuid() {
        let id = EventId::new();
        assert_eq!(id.to_string(), id.as_uuid().to_string());
    }

    #[test]
    fn test_user_identifier_parses_uuid_as_id() {
        let uuid = Uuid::new_v4();
        let parsed = UserIdentifier::parse(&uuid.to_string());
        assert_eq!(parsed, UserIdentifier::Id(UserId::from_uuid(uuid)));
    }

    #[test]
    fn test_user_identifier_falls_back_to_external() {
        let parsed = UserIdentifier::parse("auth0|abc123");
        assert_eq!(
            parsed,
            UserIdentifier::External(ExternalId::new("auth0|abc123"))
        );
    }
}

//! In-memory entity store.
//!
//! A single `tokio::sync::Mutex` around the whole state serializes every
//! operation, which trivially satisfies the atomicity contracts of
//! `gather_core::store`: admission, check-in, and redemption each run as
//! one critical section, exactly like the Postgres implementation's
//! transaction with a row lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gather_core::store::{
    Admission, Cancellation, CheckIn, EventStore, MarkRead, NotificationStore, Redemption,
    RegistrationStore, StoreError, UserStore,
};
use gather_core::types::{
    CouponId, CouponUse, Event, EventId, EventRegistration, ExternalId, FoodCoupon, NewUser,
    Notification, NotificationDelivery, NotificationId, Organization, OrganizationId, Role,
    RegistrationStatus, Session, SessionId, SessionRegistration, User, UserId,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::Mutex;

#[derive(Default)]
struct Inner {
    organizations: HashMap<OrganizationId, Organization>,
    members: HashMap<OrganizationId, HashSet<ExternalId>>,
    users: HashMap<UserId, User>,
    events: HashMap<EventId, Event>,
    coupons: HashMap<EventId, Vec<FoodCoupon>>,
    sessions: HashMap<SessionId, Session>,
    event_registrations: BTreeMap<(EventId, UserId), EventRegistration>,
    session_registrations: BTreeMap<(SessionId, UserId), SessionRegistration>,
    redemptions: BTreeMap<(EventId, UserId, CouponId), DateTime<Utc>>,
    notifications: HashMap<NotificationId, Notification>,
    deliveries: BTreeMap<(NotificationId, UserId), NotificationDelivery>,
}

impl Inner {
    fn confirmed_event_count(&self, event_id: EventId) -> u32 {
        u32::try_from(
            self.event_registrations
                .values()
                .filter(|r| r.event_id == event_id && r.status == RegistrationStatus::Confirmed)
                .count(),
        )
        .unwrap_or(u32::MAX)
    }

    fn confirmed_session_count(&self, session_id: SessionId) -> u32 {
        u32::try_from(
            self.session_registrations
                .values()
                .filter(|r| {
                    r.session_id == session_id && r.status == RegistrationStatus::Confirmed
                })
                .count(),
        )
        .unwrap_or(u32::MAX)
    }
}

/// In-memory implementation of the full entity store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn create_organization(&self, org: &Organization) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.organizations.insert(org.id, org.clone());
        Ok(())
    }

    async fn organization(&self, id: OrganizationId) -> Result<Option<Organization>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.organizations.get(&id).cloned())
    }

    async fn organization_for_actor(
        &self,
        actor: &ExternalId,
    ) -> Result<Option<Organization>, StoreError> {
        let inner = self.inner.lock().await;
        if let Some(owned) = inner
            .organizations
            .values()
            .find(|o| &o.owner_external_id == actor)
        {
            return Ok(Some(owned.clone()));
        }
        Ok(inner
            .organizations
            .values()
            .find(|o| {
                inner
                    .members
                    .get(&o.id)
                    .is_some_and(|members| members.contains(actor))
            })
            .cloned())
    }

    async fn add_organization_member(
        &self,
        org_id: OrganizationId,
        member: &ExternalId,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner
            .members
            .entry(org_id)
            .or_default()
            .insert(member.clone());
        Ok(())
    }

    async fn create_event(&self, event: &Event) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn event(&self, id: EventId) -> Result<Option<Event>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.events.get(&id).cloned())
    }

    async fn event_owned_by(
        &self,
        id: EventId,
        org_id: OrganizationId,
    ) -> Result<Option<Event>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .events
            .get(&id)
            .filter(|e| e.organization_id == org_id)
            .cloned())
    }

    async fn list_events(&self, org_id: Option<OrganizationId>) -> Result<Vec<Event>, StoreError> {
        let inner = self.inner.lock().await;
        let mut events: Vec<Event> = inner
            .events
            .values()
            .filter(|e| org_id.is_none_or(|org| e.organization_id == org))
            .cloned()
            .collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }

    async fn update_event(&self, event: &Event) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn delete_event(&self, id: EventId) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.events.remove(&id).is_none() {
            return Ok(false);
        }
        inner.coupons.remove(&id);
        inner.sessions.retain(|_, s| s.event_id != id);
        inner.event_registrations.retain(|_, r| r.event_id != id);
        inner.session_registrations.retain(|_, r| r.event_id != id);
        inner.redemptions.retain(|(event, _, _), _| *event != id);
        let removed: Vec<NotificationId> = inner
            .notifications
            .values()
            .filter(|n| n.event_id == id)
            .map(|n| n.id)
            .collect();
        inner.notifications.retain(|_, n| n.event_id != id);
        inner
            .deliveries
            .retain(|(notification, _), _| !removed.contains(notification));
        Ok(true)
    }

    async fn create_session(&self, session: &Session) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn session(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.sessions.get(&id).cloned())
    }

    async fn sessions_for_event(&self, event_id: EventId) -> Result<Vec<Session>, StoreError> {
        let inner = self.inner.lock().await;
        let mut sessions: Vec<Session> = inner
            .sessions
            .values()
            .filter(|s| s.event_id == event_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(sessions)
    }

    async fn coupons_for_event(&self, event_id: EventId) -> Result<Vec<FoodCoupon>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.coupons.get(&event_id).cloned().unwrap_or_default())
    }

    async fn add_coupon(
        &self,
        event_id: EventId,
        name: &str,
        description: Option<&str>,
        quantity: u32,
    ) -> Result<Option<FoodCoupon>, StoreError> {
        let mut inner = self.inner.lock().await;
        if !inner.events.contains_key(&event_id) {
            return Ok(None);
        }
        let coupons = inner.coupons.entry(event_id).or_default();
        let next_id = coupons
            .iter()
            .map(|c| c.coupon_id.as_i32())
            .max()
            .unwrap_or(0)
            + 1;
        let coupon = FoodCoupon {
            coupon_id: CouponId::new(next_id),
            name: name.to_string(),
            description: description.map(ToString::to_string),
            quantity,
        };
        coupons.push(coupon.clone());
        Ok(Some(coupon))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.users.get(&id).cloned())
    }

    async fn user_by_external_id(&self, id: &ExternalId) -> Result<Option<User>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.users.values().find(|u| &u.external_id == id).cloned())
    }

    async fn find_or_create_user(&self, new_user: &NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(existing) = inner
            .users
            .values()
            .find(|u| u.external_id == new_user.external_id)
        {
            return Ok(existing.clone());
        }
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            external_id: new_user.external_id.clone(),
            email: new_user.email.clone(),
            full_name: new_user.full_name.clone(),
            role: Role::User,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl RegistrationStore for MemoryStore {
    async fn admit_event_registration(
        &self,
        event_id: EventId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<Admission, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(event) = inner.events.get(&event_id) else {
            return Ok(Admission::Missing);
        };
        let max_capacity = event.max_capacity;
        if inner.event_registrations.contains_key(&(event_id, user_id)) {
            return Ok(Admission::Duplicate);
        }
        if let Some(max) = max_capacity {
            if inner.confirmed_event_count(event_id) >= max {
                return Ok(Admission::Full);
            }
        }
        inner.event_registrations.insert(
            (event_id, user_id),
            EventRegistration {
                event_id,
                user_id,
                registration_date: at,
                status: RegistrationStatus::Confirmed,
                attended: false,
                check_in_time: None,
            },
        );
        Ok(Admission::Admitted {
            registration_date: at,
            status: RegistrationStatus::Confirmed,
        })
    }

    async fn admit_session_registration(
        &self,
        session_id: SessionId,
        event_id: EventId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<Admission, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(session) = inner.sessions.get(&session_id) else {
            return Ok(Admission::Missing);
        };
        let max_capacity = session.max_capacity;
        if inner
            .session_registrations
            .contains_key(&(session_id, user_id))
        {
            return Ok(Admission::Duplicate);
        }
        if let Some(max) = max_capacity {
            if inner.confirmed_session_count(session_id) >= max {
                return Ok(Admission::Full);
            }
        }
        inner.session_registrations.insert(
            (session_id, user_id),
            SessionRegistration {
                session_id,
                event_id,
                user_id,
                registration_date: at,
                status: RegistrationStatus::Confirmed,
            },
        );
        Ok(Admission::Admitted {
            registration_date: at,
            status: RegistrationStatus::Confirmed,
        })
    }

    async fn event_registration(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Option<EventRegistration>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.event_registrations.get(&(event_id, user_id)).cloned())
    }

    async fn registrations_for_event(
        &self,
        event_id: EventId,
    ) -> Result<Vec<EventRegistration>, StoreError> {
        let inner = self.inner.lock().await;
        let mut registrations: Vec<EventRegistration> = inner
            .event_registrations
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect();
        registrations.sort_by(|a, b| a.registration_date.cmp(&b.registration_date));
        Ok(registrations)
    }

    async fn registrations_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<EventRegistration>, StoreError> {
        let inner = self.inner.lock().await;
        let mut registrations: Vec<EventRegistration> = inner
            .event_registrations
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        registrations.sort_by(|a, b| a.registration_date.cmp(&b.registration_date));
        Ok(registrations)
    }

    async fn session_registrations_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<SessionRegistration>, StoreError> {
        let inner = self.inner.lock().await;
        let mut registrations: Vec<SessionRegistration> = inner
            .session_registrations
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        registrations.sort_by(|a, b| a.registration_date.cmp(&b.registration_date));
        Ok(registrations)
    }

    async fn confirmed_count(&self, event_id: EventId) -> Result<u32, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.confirmed_event_count(event_id))
    }

    async fn cancel_event_registration(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Cancellation, StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.event_registrations.get_mut(&(event_id, user_id)) {
            None => Ok(Cancellation::NotRegistered),
            Some(registration) if registration.status == RegistrationStatus::Cancelled => {
                Ok(Cancellation::AlreadyCancelled)
            }
            Some(registration) => {
                registration.status = RegistrationStatus::Cancelled;
                Ok(Cancellation::Cancelled)
            }
        }
    }

    async fn record_check_in(
        &self,
        event_id: EventId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<CheckIn, StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.event_registrations.get_mut(&(event_id, user_id)) {
            Some(registration) if registration.status == RegistrationStatus::Confirmed => {
                if registration.attended {
                    let checked_in_at = registration.check_in_time.unwrap_or(at);
                    Ok(CheckIn::Repeat { checked_in_at })
                } else {
                    registration.attended = true;
                    registration.check_in_time = Some(at);
                    Ok(CheckIn::First { checked_in_at: at })
                }
            }
            _ => Ok(CheckIn::NotRegistered),
        }
    }

    async fn redeem_coupon(
        &self,
        event_id: EventId,
        user_id: UserId,
        coupon_id: CouponId,
        at: DateTime<Utc>,
    ) -> Result<Redemption, StoreError> {
        let mut inner = self.inner.lock().await;
        let key = (event_id, user_id, coupon_id);
        if inner.redemptions.contains_key(&key) {
            return Ok(Redemption::AlreadyRedeemed);
        }
        inner.redemptions.insert(key, at);
        Ok(Redemption::Redeemed { scanned_at: at })
    }

    async fn coupons_used(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Vec<CouponUse>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .redemptions
            .iter()
            .filter(|((event, user, _), _)| *event == event_id && *user == user_id)
            .map(|((_, _, coupon_id), scanned_at)| CouponUse {
                coupon_id: *coupon_id,
                scanned_at: Some(*scanned_at),
            })
            .collect())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn create_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner
            .notifications
            .insert(notification.id, notification.clone());
        Ok(())
    }

    async fn notification(
        &self,
        id: NotificationId,
    ) -> Result<Option<Notification>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.notifications.get(&id).cloned())
    }

    async fn insert_delivery(
        &self,
        notification_id: NotificationId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        let key = (notification_id, user_id);
        if inner.deliveries.contains_key(&key) {
            return Ok(false);
        }
        inner.deliveries.insert(
            key,
            NotificationDelivery {
                notification_id,
                user_id,
                is_read: false,
                read_at: None,
                created_at: at,
            },
        );
        Ok(true)
    }

    async fn deliveries_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<(NotificationDelivery, Notification)>, StoreError> {
        let inner = self.inner.lock().await;
        let mut deliveries: Vec<(NotificationDelivery, Notification)> = inner
            .deliveries
            .values()
            .filter(|d| d.user_id == user_id)
            .filter_map(|d| {
                inner
                    .notifications
                    .get(&d.notification_id)
                    .map(|n| (d.clone(), n.clone()))
            })
            .collect();
        deliveries.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at));
        Ok(deliveries)
    }

    async fn mark_delivery_read(
        &self,
        notification_id: NotificationId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<MarkRead, StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.deliveries.get_mut(&(notification_id, user_id)) {
            None => Ok(MarkRead::NotFound),
            Some(delivery) if delivery.is_read => Ok(MarkRead::AlreadyRead),
            Some(delivery) => {
                delivery.is_read = true;
                delivery.read_at = Some(at);
                Ok(MarkRead::Marked)
            }
        }
    }
}

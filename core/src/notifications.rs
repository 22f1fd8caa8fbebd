//! Notification fan-out.
//!
//! Creating a notification materializes one delivery record per user
//! holding a confirmed registration **at creation time**; later registrants
//! do not receive it. Delivery records are insert-if-absent, so a fan-out
//! that failed partway can be repaired by re-running it; there is no
//! at-least-once delivery machinery beyond that.

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::store::{MarkRead, Store};
use crate::types::{
    EventId, Notification, NotificationDelivery, NotificationId, Organization,
    RegistrationStatus, User,
};
use std::sync::Arc;

/// Notification engine over a [`Store`].
pub struct NotificationEngine<S: ?Sized> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: Store + ?Sized> NotificationEngine<S> {
    /// Creates a new engine.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Creates an event-scoped notification and fans it out to every
    /// currently confirmed registrant. Returns the notification and the
    /// number of delivery records created.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the event is absent or not owned by `org`
    /// - [`Error::Validation`] if title or message is empty
    /// - [`Error::Store`] if a write fails; deliveries already created
    ///   stay, and [`Self::rematerialize`] completes the set
    pub async fn create(
        &self,
        org: &Organization,
        event_id: EventId,
        title: &str,
        message: &str,
        is_push: bool,
    ) -> Result<(Notification, usize)> {
        if title.trim().is_empty() || message.trim().is_empty() {
            return Err(Error::validation("Title and message are required"));
        }

        self.store
            .event_owned_by(event_id, org.id)
            .await?
            .ok_or(Error::not_found("event"))?;

        let now = self.clock.now();
        let notification = Notification {
            id: NotificationId::new(),
            event_id,
            title: title.to_string(),
            message: message.to_string(),
            is_push,
            created_at: now,
        };
        self.store.create_notification(&notification).await?;

        let delivered = self.fan_out(&notification).await?;
        tracing::info!(
            notification_id = %notification.id,
            event_id = %event_id,
            delivered,
            "notification created and fanned out"
        );
        Ok((notification, delivered))
    }

    /// Re-runs the fan-out for an existing notification, creating only the
    /// delivery records that are missing. The repair pass for a partial
    /// fan-out.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the notification is absent or its event is
    ///   not owned by `org`
    /// - [`Error::Store`] if a write fails
    pub async fn rematerialize(
        &self,
        org: &Organization,
        notification_id: NotificationId,
    ) -> Result<usize> {
        let notification = self
            .store
            .notification(notification_id)
            .await?
            .ok_or(Error::not_found("notification"))?;
        self.store
            .event_owned_by(notification.event_id, org.id)
            .await?
            .ok_or(Error::not_found("notification"))?;

        let delivered = self.fan_out(&notification).await?;
        tracing::info!(
            notification_id = %notification_id,
            delivered,
            "notification fan-out repaired"
        );
        Ok(delivered)
    }

    async fn fan_out(&self, notification: &Notification) -> Result<usize> {
        let registrations = self
            .store
            .registrations_for_event(notification.event_id)
            .await?;
        let now = self.clock.now();

        let mut created = 0;
        for registration in registrations
            .iter()
            .filter(|r| r.status == RegistrationStatus::Confirmed)
        {
            if self
                .store
                .insert_delivery(notification.id, registration.user_id, now)
                .await?
            {
                created += 1;
            }
        }
        Ok(created)
    }

    /// Lists a user's deliveries with their notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the query fails.
    pub async fn list_for_user(
        &self,
        user: &User,
    ) -> Result<Vec<(NotificationDelivery, Notification)>> {
        Ok(self.store.deliveries_for_user(user.id).await?)
    }

    /// Marks one delivery read. Idempotent: repeating the call leaves the
    /// original `read_at` in place.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the user holds no delivery for this
    ///   notification
    /// - [`Error::Store`] if the write fails
    pub async fn mark_read(&self, user: &User, notification_id: NotificationId) -> Result<()> {
        match self
            .store
            .mark_delivery_read(notification_id, user.id, self.clock.now())
            .await?
        {
            MarkRead::Marked | MarkRead::AlreadyRead => Ok(()),
            MarkRead::NotFound => Err(Error::not_found("notification")),
        }
    }
}

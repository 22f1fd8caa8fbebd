//! Notifications and per-user delivery records.

use crate::{map_err, PostgresStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gather_core::store::{MarkRead, NotificationStore, StoreError};
use gather_core::types::{
    EventId, Notification, NotificationDelivery, NotificationId, UserId,
};
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    event_id: Uuid,
    title: String,
    message: String,
    is_push: bool,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: NotificationId::from_uuid(row.id),
            event_id: EventId::from_uuid(row.event_id),
            title: row.title,
            message: row.message,
            is_push: row.is_push,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl NotificationStore for PostgresStore {
    async fn create_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO notifications (id, event_id, title, message, is_push, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(notification.id.as_uuid())
        .bind(notification.event_id.as_uuid())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.is_push)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn notification(
        &self,
        id: NotificationId,
    ) -> Result<Option<Notification>, StoreError> {
        let row: Option<NotificationRow> = sqlx::query_as(
            "SELECT id, event_id, title, message, is_push, created_at \
             FROM notifications WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(row.map(Notification::from))
    }

    async fn insert_delivery(
        &self,
        notification_id: NotificationId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO notification_deliveries (notification_id, user_id, created_at) \
             VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
        )
        .bind(notification_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn deliveries_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<(NotificationDelivery, Notification)>, StoreError> {
        type DeliveryJoinRow = (
            Uuid,
            Uuid,
            bool,
            Option<DateTime<Utc>>,
            DateTime<Utc>,
            Uuid,
            String,
            String,
            bool,
            DateTime<Utc>,
        );
        let rows: Vec<DeliveryJoinRow> = sqlx::query_as(
            "SELECT d.notification_id, d.user_id, d.is_read, d.read_at, d.created_at, \
                    n.event_id, n.title, n.message, n.is_push, n.created_at \
             FROM notification_deliveries d \
             JOIN notifications n ON n.id = d.notification_id \
             WHERE d.user_id = $1 \
             ORDER BY n.created_at DESC",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;

        Ok(rows
            .into_iter()
            .map(
                |(
                    notification_id,
                    user,
                    is_read,
                    read_at,
                    delivery_created_at,
                    event_id,
                    title,
                    message,
                    is_push,
                    notification_created_at,
                )| {
                    (
                        NotificationDelivery {
                            notification_id: NotificationId::from_uuid(notification_id),
                            user_id: UserId::from_uuid(user),
                            is_read,
                            read_at,
                            created_at: delivery_created_at,
                        },
                        Notification {
                            id: NotificationId::from_uuid(notification_id),
                            event_id: EventId::from_uuid(event_id),
                            title,
                            message,
                            is_push,
                            created_at: notification_created_at,
                        },
                    )
                },
            )
            .collect())
    }

    async fn mark_delivery_read(
        &self,
        notification_id: NotificationId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<MarkRead, StoreError> {
        let result = sqlx::query(
            "UPDATE notification_deliveries SET is_read = TRUE, read_at = $3 \
             WHERE notification_id = $1 AND user_id = $2 AND is_read = FALSE",
        )
        .bind(notification_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        if result.rows_affected() > 0 {
            return Ok(MarkRead::Marked);
        }

        let exists: Option<(bool,)> = sqlx::query_as(
            "SELECT is_read FROM notification_deliveries \
             WHERE notification_id = $1 AND user_id = $2",
        )
        .bind(notification_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;
        match exists {
            Some(_) => Ok(MarkRead::AlreadyRead),
            None => Ok(MarkRead::NotFound),
        }
    }
}

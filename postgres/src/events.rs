//! Organizations, events, sessions, and coupon definitions.

use crate::{map_err, PostgresStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gather_core::store::{EventStore, StoreError};
use gather_core::types::{
    CouponId, Event, EventId, ExternalId, FoodCoupon, Organization, OrganizationId, Session,
    SessionId,
};
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct OrganizationRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    contact_email: Option<String>,
    website: Option<String>,
    owner_external_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrganizationRow> for Organization {
    fn from(row: OrganizationRow) -> Self {
        Self {
            id: OrganizationId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            contact_email: row.contact_email,
            website: row.website,
            owner_external_id: ExternalId::new(row.owner_external_id),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    organization_id: Uuid,
    name: String,
    description: Option<String>,
    venue: Option<String>,
    is_online: bool,
    online_url: Option<String>,
    event_type: Option<String>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    max_capacity: Option<i32>,
    registration_deadline: Option<DateTime<Utc>>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, StoreError> {
        let max_capacity = row
            .max_capacity
            .map(|raw| {
                u32::try_from(raw).map_err(|_| {
                    StoreError::Query(format!("negative max_capacity in store: {raw}"))
                })
            })
            .transpose()?;
        Ok(Self {
            id: EventId::from_uuid(row.id),
            organization_id: OrganizationId::from_uuid(row.organization_id),
            name: row.name,
            description: row.description,
            venue: row.venue,
            is_online: row.is_online,
            online_url: row.online_url,
            event_type: row.event_type,
            start_time: row.start_time,
            end_time: row.end_time,
            max_capacity,
            registration_deadline: row.registration_deadline,
            created_by: row.created_by.map(gather_core::types::UserId::from_uuid),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    event_id: Uuid,
    name: String,
    description: Option<String>,
    location: Option<String>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    max_capacity: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for Session {
    type Error = StoreError;

    fn try_from(row: SessionRow) -> Result<Self, StoreError> {
        let max_capacity = row
            .max_capacity
            .map(|raw| {
                u32::try_from(raw).map_err(|_| {
                    StoreError::Query(format!("negative max_capacity in store: {raw}"))
                })
            })
            .transpose()?;
        Ok(Self {
            id: SessionId::from_uuid(row.id),
            event_id: EventId::from_uuid(row.event_id),
            name: row.name,
            description: row.description,
            location: row.location,
            start_time: row.start_time,
            end_time: row.end_time,
            max_capacity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CouponRow {
    coupon_id: i32,
    name: String,
    description: Option<String>,
    quantity: i32,
}

impl From<CouponRow> for FoodCoupon {
    fn from(row: CouponRow) -> Self {
        Self {
            coupon_id: CouponId::new(row.coupon_id),
            name: row.name,
            description: row.description,
            quantity: u32::try_from(row.quantity).unwrap_or(0),
        }
    }
}

const SELECT_EVENT: &str = "SELECT id, organization_id, name, description, venue, is_online, \
     online_url, event_type, start_time, end_time, max_capacity, \
     registration_deadline, created_by, created_at, updated_at FROM events";

#[async_trait]
impl EventStore for PostgresStore {
    async fn create_organization(&self, org: &Organization) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO organizations \
             (id, name, description, contact_email, website, owner_external_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(org.id.as_uuid())
        .bind(&org.name)
        .bind(&org.description)
        .bind(&org.contact_email)
        .bind(&org.website)
        .bind(org.owner_external_id.as_str())
        .bind(org.created_at)
        .bind(org.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn organization(&self, id: OrganizationId) -> Result<Option<Organization>, StoreError> {
        let row: Option<OrganizationRow> = sqlx::query_as(
            "SELECT id, name, description, contact_email, website, owner_external_id, \
             created_at, updated_at FROM organizations WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(row.map(Organization::from))
    }

    async fn organization_for_actor(
        &self,
        actor: &ExternalId,
    ) -> Result<Option<Organization>, StoreError> {
        // Owner takes precedence over membership, matching the admin scope
        // resolution order.
        let row: Option<OrganizationRow> = sqlx::query_as(
            "SELECT o.id, o.name, o.description, o.contact_email, o.website, \
             o.owner_external_id, o.created_at, o.updated_at \
             FROM organizations o \
             LEFT JOIN organization_members m ON m.organization_id = o.id \
             WHERE o.owner_external_id = $1 OR m.external_id = $1 \
             ORDER BY (o.owner_external_id = $1) DESC, o.created_at \
             LIMIT 1",
        )
        .bind(actor.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(row.map(Organization::from))
    }

    async fn add_organization_member(
        &self,
        org_id: OrganizationId,
        member: &ExternalId,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO organization_members (organization_id, external_id) \
             VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(org_id.as_uuid())
        .bind(member.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn create_event(&self, event: &Event) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO events \
             (id, organization_id, name, description, venue, is_online, online_url, \
              event_type, start_time, end_time, max_capacity, registration_deadline, \
              created_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(event.id.as_uuid())
        .bind(event.organization_id.as_uuid())
        .bind(&event.name)
        .bind(&event.description)
        .bind(&event.venue)
        .bind(event.is_online)
        .bind(&event.online_url)
        .bind(&event.event_type)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(event.max_capacity.map(|c| i32::try_from(c).unwrap_or(i32::MAX)))
        .bind(event.registration_deadline)
        .bind(event.created_by.map(|id| *id.as_uuid()))
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn event(&self, id: EventId) -> Result<Option<Event>, StoreError> {
        let row: Option<EventRow> = sqlx::query_as(&format!("{SELECT_EVENT} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;
        row.map(Event::try_from).transpose()
    }

    async fn event_owned_by(
        &self,
        id: EventId,
        org_id: OrganizationId,
    ) -> Result<Option<Event>, StoreError> {
        let row: Option<EventRow> = sqlx::query_as(&format!(
            "{SELECT_EVENT} WHERE id = $1 AND organization_id = $2"
        ))
        .bind(id.as_uuid())
        .bind(org_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;
        row.map(Event::try_from).transpose()
    }

    async fn list_events(&self, org_id: Option<OrganizationId>) -> Result<Vec<Event>, StoreError> {
        let rows: Vec<EventRow> = match org_id {
            Some(org) => {
                sqlx::query_as(&format!(
                    "{SELECT_EVENT} WHERE organization_id = $1 ORDER BY created_at DESC"
                ))
                .bind(org.as_uuid())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as(&format!("{SELECT_EVENT} ORDER BY created_at DESC"))
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(map_err)?;
        rows.into_iter().map(Event::try_from).collect()
    }

    async fn update_event(&self, event: &Event) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE events SET name = $2, description = $3, venue = $4, is_online = $5, \
             online_url = $6, event_type = $7, start_time = $8, end_time = $9, \
             max_capacity = $10, registration_deadline = $11, updated_at = $12 \
             WHERE id = $1",
        )
        .bind(event.id.as_uuid())
        .bind(&event.name)
        .bind(&event.description)
        .bind(&event.venue)
        .bind(event.is_online)
        .bind(&event.online_url)
        .bind(&event.event_type)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(event.max_capacity.map(|c| i32::try_from(c).unwrap_or(i32::MAX)))
        .bind(event.registration_deadline)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn delete_event(&self, id: EventId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_session(&self, session: &Session) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO sessions \
             (id, event_id, name, description, location, start_time, end_time, \
              max_capacity, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(session.id.as_uuid())
        .bind(session.event_id.as_uuid())
        .bind(&session.name)
        .bind(&session.description)
        .bind(&session.location)
        .bind(session.start_time)
        .bind(session.end_time)
        .bind(session.max_capacity.map(|c| i32::try_from(c).unwrap_or(i32::MAX)))
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn session(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT id, event_id, name, description, location, start_time, end_time, \
             max_capacity, created_at, updated_at FROM sessions WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;
        row.map(Session::try_from).transpose()
    }

    async fn sessions_for_event(&self, event_id: EventId) -> Result<Vec<Session>, StoreError> {
        let rows: Vec<SessionRow> = sqlx::query_as(
            "SELECT id, event_id, name, description, location, start_time, end_time, \
             max_capacity, created_at, updated_at FROM sessions \
             WHERE event_id = $1 ORDER BY start_time",
        )
        .bind(event_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;
        rows.into_iter().map(Session::try_from).collect()
    }

    async fn coupons_for_event(&self, event_id: EventId) -> Result<Vec<FoodCoupon>, StoreError> {
        let rows: Vec<CouponRow> = sqlx::query_as(
            "SELECT coupon_id, name, description, quantity FROM food_coupons \
             WHERE event_id = $1 ORDER BY coupon_id",
        )
        .bind(event_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(rows.into_iter().map(FoodCoupon::from).collect())
    }

    async fn add_coupon(
        &self,
        event_id: EventId,
        name: &str,
        description: Option<&str>,
        quantity: u32,
    ) -> Result<Option<FoodCoupon>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;

        // Lock the event row so concurrent definitions get distinct ids.
        let exists: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM events WHERE id = $1 FOR UPDATE")
                .bind(event_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_err)?;
        if exists.is_none() {
            return Ok(None);
        }

        let (coupon_id,): (i32,) = sqlx::query_as(
            "INSERT INTO food_coupons (event_id, coupon_id, name, description, quantity) \
             SELECT $1, COALESCE(MAX(coupon_id), 0) + 1, $2, $3, $4 \
             FROM food_coupons WHERE event_id = $1 \
             RETURNING coupon_id",
        )
        .bind(event_id.as_uuid())
        .bind(name)
        .bind(description)
        .bind(i32::try_from(quantity).unwrap_or(i32::MAX))
        .fetch_one(&mut *tx)
        .await
        .map_err(map_err)?;

        tx.commit().await.map_err(map_err)?;

        Ok(Some(FoodCoupon {
            coupon_id: CouponId::new(coupon_id),
            name: name.to_string(),
            description: description.map(ToString::to_string),
            quantity,
        }))
    }
}

//! Registrations, check-ins, and coupon redemptions.
//!
//! Admission runs inside a transaction that locks the event (or session)
//! row with `SELECT … FOR UPDATE`, serializing admission per event so the
//! duplicate and capacity checks are evaluated against a state no
//! concurrent admission can move underneath them. The primary key on
//! (event_id, user_id) is the backstop: a racing duplicate that somehow
//! reaches the insert becomes a rejected write, not a second record.

use crate::{is_unique_violation, map_err, status_from_str, status_to_str, PostgresStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gather_core::store::{
    Admission, Cancellation, CheckIn, Redemption, RegistrationStore, StoreError,
};
use gather_core::types::{
    CouponId, CouponUse, EventId, EventRegistration, RegistrationStatus, SessionId,
    SessionRegistration, UserId,
};
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct EventRegistrationRow {
    event_id: Uuid,
    user_id: Uuid,
    registration_date: DateTime<Utc>,
    status: String,
    attended: bool,
    check_in_time: Option<DateTime<Utc>>,
}

impl TryFrom<EventRegistrationRow> for EventRegistration {
    type Error = StoreError;

    fn try_from(row: EventRegistrationRow) -> Result<Self, StoreError> {
        Ok(Self {
            event_id: EventId::from_uuid(row.event_id),
            user_id: UserId::from_uuid(row.user_id),
            registration_date: row.registration_date,
            status: status_from_str(&row.status)?,
            attended: row.attended,
            check_in_time: row.check_in_time,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SessionRegistrationRow {
    session_id: Uuid,
    event_id: Uuid,
    user_id: Uuid,
    registration_date: DateTime<Utc>,
    status: String,
}

impl TryFrom<SessionRegistrationRow> for SessionRegistration {
    type Error = StoreError;

    fn try_from(row: SessionRegistrationRow) -> Result<Self, StoreError> {
        Ok(Self {
            session_id: SessionId::from_uuid(row.session_id),
            event_id: EventId::from_uuid(row.event_id),
            user_id: UserId::from_uuid(row.user_id),
            registration_date: row.registration_date,
            status: status_from_str(&row.status)?,
        })
    }
}

#[async_trait]
impl RegistrationStore for PostgresStore {
    async fn admit_event_registration(
        &self,
        event_id: EventId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<Admission, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;

        // Serialize admission per event.
        let capacity: Option<(Option<i32>,)> =
            sqlx::query_as("SELECT max_capacity FROM events WHERE id = $1 FOR UPDATE")
                .bind(event_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_err)?;
        let Some((max_capacity,)) = capacity else {
            return Ok(Admission::Missing);
        };

        let duplicate: Option<(Uuid,)> = sqlx::query_as(
            "SELECT user_id FROM event_registrations WHERE event_id = $1 AND user_id = $2",
        )
        .bind(event_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_err)?;
        if duplicate.is_some() {
            return Ok(Admission::Duplicate);
        }

        if let Some(max) = max_capacity {
            let (confirmed,): (i64,) = sqlx::query_as(
                "SELECT COUNT(*) FROM event_registrations \
                 WHERE event_id = $1 AND status = 'confirmed'",
            )
            .bind(event_id.as_uuid())
            .fetch_one(&mut *tx)
            .await
            .map_err(map_err)?;
            if confirmed >= i64::from(max) {
                return Ok(Admission::Full);
            }
        }

        let insert = sqlx::query(
            "INSERT INTO event_registrations \
             (event_id, user_id, registration_date, status, attended) \
             VALUES ($1, $2, $3, $4, FALSE)",
        )
        .bind(event_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(at)
        .bind(status_to_str(RegistrationStatus::Confirmed))
        .execute(&mut *tx)
        .await;

        match insert {
            Ok(_) => {
                tx.commit().await.map_err(map_err)?;
                Ok(Admission::Admitted {
                    registration_date: at,
                    status: RegistrationStatus::Confirmed,
                })
            }
            Err(err) if is_unique_violation(&err) => Ok(Admission::Duplicate),
            Err(err) => Err(map_err(err)),
        }
    }

    async fn admit_session_registration(
        &self,
        session_id: SessionId,
        event_id: EventId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<Admission, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;

        let capacity: Option<(Option<i32>,)> =
            sqlx::query_as("SELECT max_capacity FROM sessions WHERE id = $1 FOR UPDATE")
                .bind(session_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_err)?;
        let Some((max_capacity,)) = capacity else {
            return Ok(Admission::Missing);
        };

        let duplicate: Option<(Uuid,)> = sqlx::query_as(
            "SELECT user_id FROM session_registrations \
             WHERE session_id = $1 AND user_id = $2",
        )
        .bind(session_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_err)?;
        if duplicate.is_some() {
            return Ok(Admission::Duplicate);
        }

        if let Some(max) = max_capacity {
            let (confirmed,): (i64,) = sqlx::query_as(
                "SELECT COUNT(*) FROM session_registrations \
                 WHERE session_id = $1 AND status = 'confirmed'",
            )
            .bind(session_id.as_uuid())
            .fetch_one(&mut *tx)
            .await
            .map_err(map_err)?;
            if confirmed >= i64::from(max) {
                return Ok(Admission::Full);
            }
        }

        let insert = sqlx::query(
            "INSERT INTO session_registrations \
             (session_id, event_id, user_id, registration_date, status) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(session_id.as_uuid())
        .bind(event_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(at)
        .bind(status_to_str(RegistrationStatus::Confirmed))
        .execute(&mut *tx)
        .await;

        match insert {
            Ok(_) => {
                tx.commit().await.map_err(map_err)?;
                Ok(Admission::Admitted {
                    registration_date: at,
                    status: RegistrationStatus::Confirmed,
                })
            }
            Err(err) if is_unique_violation(&err) => Ok(Admission::Duplicate),
            Err(err) => Err(map_err(err)),
        }
    }

    async fn event_registration(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Option<EventRegistration>, StoreError> {
        let row: Option<EventRegistrationRow> = sqlx::query_as(
            "SELECT event_id, user_id, registration_date, status, attended, check_in_time \
             FROM event_registrations WHERE event_id = $1 AND user_id = $2",
        )
        .bind(event_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;
        row.map(EventRegistration::try_from).transpose()
    }

    async fn registrations_for_event(
        &self,
        event_id: EventId,
    ) -> Result<Vec<EventRegistration>, StoreError> {
        let rows: Vec<EventRegistrationRow> = sqlx::query_as(
            "SELECT event_id, user_id, registration_date, status, attended, check_in_time \
             FROM event_registrations WHERE event_id = $1 ORDER BY registration_date",
        )
        .bind(event_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;
        rows.into_iter().map(EventRegistration::try_from).collect()
    }

    async fn registrations_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<EventRegistration>, StoreError> {
        let rows: Vec<EventRegistrationRow> = sqlx::query_as(
            "SELECT event_id, user_id, registration_date, status, attended, check_in_time \
             FROM event_registrations WHERE user_id = $1 ORDER BY registration_date",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;
        rows.into_iter().map(EventRegistration::try_from).collect()
    }

    async fn session_registrations_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<SessionRegistration>, StoreError> {
        let rows: Vec<SessionRegistrationRow> = sqlx::query_as(
            "SELECT session_id, event_id, user_id, registration_date, status \
             FROM session_registrations WHERE user_id = $1 ORDER BY registration_date",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;
        rows.into_iter()
            .map(SessionRegistration::try_from)
            .collect()
    }

    async fn confirmed_count(&self, event_id: EventId) -> Result<u32, StoreError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM event_registrations \
             WHERE event_id = $1 AND status = 'confirmed'",
        )
        .bind(event_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn cancel_event_registration(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Cancellation, StoreError> {
        let result = sqlx::query(
            "UPDATE event_registrations SET status = 'cancelled' \
             WHERE event_id = $1 AND user_id = $2 AND status <> 'cancelled'",
        )
        .bind(event_id.as_uuid())
        .bind(user_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        if result.rows_affected() > 0 {
            return Ok(Cancellation::Cancelled);
        }

        let existing: Option<(String,)> = sqlx::query_as(
            "SELECT status FROM event_registrations WHERE event_id = $1 AND user_id = $2",
        )
        .bind(event_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;
        match existing {
            Some(_) => Ok(Cancellation::AlreadyCancelled),
            None => Ok(Cancellation::NotRegistered),
        }
    }

    async fn record_check_in(
        &self,
        event_id: EventId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<CheckIn, StoreError> {
        // Conditional flip: only one of two racing scans matches the
        // attended = FALSE predicate.
        let flipped: Option<(Option<DateTime<Utc>>,)> = sqlx::query_as(
            "UPDATE event_registrations SET attended = TRUE, check_in_time = $3 \
             WHERE event_id = $1 AND user_id = $2 \
               AND status = 'confirmed' AND attended = FALSE \
             RETURNING check_in_time",
        )
        .bind(event_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;
        if let Some((check_in_time,)) = flipped {
            return Ok(CheckIn::First {
                checked_in_at: check_in_time.unwrap_or(at),
            });
        }

        let existing: Option<(String, bool, Option<DateTime<Utc>>)> = sqlx::query_as(
            "SELECT status, attended, check_in_time FROM event_registrations \
             WHERE event_id = $1 AND user_id = $2",
        )
        .bind(event_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;
        match existing {
            Some((status, true, check_in_time))
                if status_from_str(&status)? == RegistrationStatus::Confirmed =>
            {
                Ok(CheckIn::Repeat {
                    checked_in_at: check_in_time.unwrap_or(at),
                })
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
        let inserted: Option<(DateTime<Utc>,)> = sqlx::query_as(
            "INSERT INTO coupon_redemptions (event_id, user_id, coupon_id, scanned_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT DO NOTHING \
             RETURNING scanned_at",
        )
        .bind(event_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(coupon_id.as_i32())
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;
        match inserted {
            Some((scanned_at,)) => Ok(Redemption::Redeemed { scanned_at }),
            None => Ok(Redemption::AlreadyRedeemed),
        }
    }

    async fn coupons_used(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Vec<CouponUse>, StoreError> {
        let rows: Vec<(i32, DateTime<Utc>)> = sqlx::query_as(
            "SELECT coupon_id, scanned_at FROM coupon_redemptions \
             WHERE event_id = $1 AND user_id = $2 ORDER BY coupon_id",
        )
        .bind(event_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(rows
            .into_iter()
            .map(|(coupon_id, scanned_at)| CouponUse {
                coupon_id: CouponId::new(coupon_id),
                scanned_at: Some(scanned_at),
            })
            .collect())
    }
}

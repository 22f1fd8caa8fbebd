//! User records.

use crate::{map_err, PostgresStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gather_core::store::{StoreError, UserStore};
use gather_core::types::{ExternalId, NewUser, Role, User, UserId};
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    external_id: String,
    email: String,
    full_name: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, StoreError> {
        let role = match row.role.as_str() {
            "user" => Role::User,
            "admin" => Role::Admin,
            other => {
                return Err(StoreError::Query(format!(
                    "unknown user role in store: {other}"
                )))
            }
        };
        Ok(Self {
            id: UserId::from_uuid(row.id),
            external_id: ExternalId::new(row.external_id),
            email: row.email,
            full_name: row.full_name,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_USER: &str =
    "SELECT id, external_id, email, full_name, role, created_at, updated_at FROM users";

#[async_trait]
impl UserStore for PostgresStore {
    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> = sqlx::query_as(&format!("{SELECT_USER} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;
        row.map(User::try_from).transpose()
    }

    async fn user_by_external_id(&self, id: &ExternalId) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("{SELECT_USER} WHERE external_id = $1"))
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_err)?;
        row.map(User::try_from).transpose()
    }

    async fn find_or_create_user(&self, new_user: &NewUser) -> Result<User, StoreError> {
        // Single-statement upsert: concurrent first resolutions of the same
        // identity race on the external_id unique index, and both get the
        // one surviving row back.
        let row: UserRow = sqlx::query_as(
            "INSERT INTO users (id, external_id, email, full_name, role) \
             VALUES ($1, $2, $3, $4, 'user') \
             ON CONFLICT (external_id) \
             DO UPDATE SET updated_at = now() \
             RETURNING id, external_id, email, full_name, role, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(new_user.external_id.as_str())
        .bind(&new_user.email)
        .bind(&new_user.full_name)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)?;
        User::try_from(row)
    }
}

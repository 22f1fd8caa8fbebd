//! `PostgreSQL` entity store for the Gather event platform.
//!
//! Implements the store traits from `gather-core` over a sqlx connection
//! pool. Queries are runtime-checked (`sqlx::query`/`query_as`) so the
//! crate builds without a live `DATABASE_URL`.
//!
//! # Concurrency
//!
//! The operations with race windows are made atomic here:
//!
//! - **Admission** runs in a transaction that takes `SELECT … FOR UPDATE`
//!   on the event (or session) row, serializing admission per event; the
//!   primary key on (`event_id`, `user_id`) rejects racing duplicates that
//!   slip past the in-transaction check.
//! - **Check-in** is a single conditional `UPDATE … WHERE attended = FALSE`,
//!   so exactly one of two racing scans observes the first-success outcome.
//! - **Redemption** is `INSERT … ON CONFLICT DO NOTHING`; the second writer
//!   sees zero rows and reports the conflict.
//!
//! # Example
//!
//! ```ignore
//! use gather_postgres::PostgresStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresStore::connect("postgres://localhost/gather").await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod events;
mod notifications;
mod registrations;
mod users;

use gather_core::store::StoreError;
use gather_core::types::RegistrationStatus;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Schema migration applied by [`PostgresStore::migrate`].
const SCHEMA: &str = include_str!("../migrations/0001_schema.sql");

/// `PostgreSQL`-backed implementation of the full entity store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connects to the database with default pool settings.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if the pool cannot be created.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self::new(pool))
    }

    /// Wraps an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Access the underlying pool (health checks, manual queries).
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the schema. Idempotent; every statement is
    /// `CREATE … IF NOT EXISTS`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Migration`] if a statement fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        tracing::info!("schema migration applied");
        Ok(())
    }
}

/// Maps a sqlx error onto the store taxonomy.
pub(crate) fn map_err(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Connection(err.to_string())
        }
        other => StoreError::Query(other.to_string()),
    }
}

/// `PostgreSQL` unique-violation SQLSTATE.
pub(crate) const UNIQUE_VIOLATION: &str = "23505";

/// Whether a sqlx error is a unique-constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION)
}

/// Text encoding of [`RegistrationStatus`] used in the status columns.
pub(crate) const fn status_to_str(status: RegistrationStatus) -> &'static str {
    match status {
        RegistrationStatus::Pending => "pending",
        RegistrationStatus::Confirmed => "confirmed",
        RegistrationStatus::Cancelled => "cancelled",
    }
}

/// Decodes a status column, rejecting unknown values.
pub(crate) fn status_from_str(raw: &str) -> Result<RegistrationStatus, StoreError> {
    match raw {
        "pending" => Ok(RegistrationStatus::Pending),
        "confirmed" => Ok(RegistrationStatus::Confirmed),
        "cancelled" => Ok(RegistrationStatus::Cancelled),
        other => Err(StoreError::Query(format!(
            "unknown registration status in store: {other}"
        ))),
    }
}

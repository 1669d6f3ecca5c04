//! RegistryStore implementation over PostgreSQL.

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::{PgPool, PgTransaction};
use time::{Date, OffsetDateTime};

use gatherly_core::{Event, EventStatus, Registration, RegistrationStatus, Timestamp, User};
use gatherly_storage::{
    EventCommit, EventPatch, EventRecord, RegistrationOp, RegistryStore, StorageError,
};

use crate::error::db_error;

/// PostgreSQL registry storage backend.
///
/// All writes to one event's key space flow through revision-guarded
/// transactions, so the conditional-commit contract holds across any number
/// of service instances sharing the database.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

const EVENT_COLUMNS: &str = "event_id, title, description, event_date, location, capacity, \
     organizer, status, waitlist_enabled, confirmed_count, revision, next_position";
const REGISTRATION_COLUMNS: &str = "event_id, user_id, status, registered_at, waitlist_position";

type EventRow = (
    String,
    String,
    Option<String>,
    Date,
    String,
    i64,
    String,
    String,
    bool,
    i64,
    i64,
    i64,
);
type RegistrationRow = (String, String, String, OffsetDateTime, Option<i64>);
type UserRow = (String, String, OffsetDateTime);

fn event_record_from_row(row: EventRow) -> Result<EventRecord, StorageError> {
    let (
        event_id,
        title,
        description,
        date,
        location,
        capacity,
        organizer,
        status,
        waitlist_enabled,
        confirmed_count,
        revision,
        next_position,
    ) = row;
    let status = status
        .parse::<EventStatus>()
        .map_err(|e| StorageError::invalid_record(e.to_string()))?;
    Ok(EventRecord {
        event: Event {
            event_id,
            title,
            description,
            date,
            location,
            capacity: capacity as u32,
            organizer,
            status,
            waitlist_enabled,
            confirmed_count: confirmed_count as u32,
        },
        revision: revision as u64,
        next_position: next_position as u64,
    })
}

fn registration_from_row(row: RegistrationRow) -> Result<Registration, StorageError> {
    let (event_id, user_id, status, registered_at, waitlist_position) = row;
    let status = status
        .parse::<RegistrationStatus>()
        .map_err(|e| StorageError::invalid_record(e.to_string()))?;
    Ok(Registration {
        event_id,
        user_id,
        status,
        registered_at: Timestamp::new(registered_at),
        waitlist_position: waitlist_position.map(|p| p as u64),
    })
}

fn registrations_from_rows(rows: Vec<RegistrationRow>) -> Result<Vec<Registration>, StorageError> {
    rows.into_iter().map(registration_from_row).collect()
}

impl PostgresStore {
    /// Wraps an already-connected pool. The schema must exist; use
    /// [`crate::create_registry_store`] for pool + schema bootstrap.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn apply_op(
        tx: &mut PgTransaction<'_>,
        event_id: &str,
        op: &RegistrationOp,
    ) -> Result<(), StorageError> {
        match op {
            RegistrationOp::Insert(registration) => {
                let result = query(
                    "INSERT INTO registrations \
                     (event_id, user_id, status, registered_at, waitlist_position) \
                     VALUES ($1, $2, $3, $4, $5) ON CONFLICT DO NOTHING",
                )
                .bind(&registration.event_id)
                .bind(&registration.user_id)
                .bind(registration.status.to_string())
                .bind(*registration.registered_at.inner())
                .bind(registration.waitlist_position.map(|p| p as i64))
                .execute(&mut **tx)
                .await
                .map_err(db_error)?;

                if result.rows_affected() == 0 {
                    return Err(StorageError::already_exists(
                        "Registration",
                        format!("{event_id}/{}", registration.user_id),
                    ));
                }
            }
            RegistrationOp::Promote { user_id } => {
                let result = query(
                    "UPDATE registrations SET status = 'confirmed', waitlist_position = NULL \
                     WHERE event_id = $1 AND user_id = $2",
                )
                .bind(event_id)
                .bind(user_id)
                .execute(&mut **tx)
                .await
                .map_err(db_error)?;

                if result.rows_affected() == 0 {
                    return Err(StorageError::not_found(
                        "Registration",
                        format!("{event_id}/{user_id}"),
                    ));
                }
            }
            RegistrationOp::Remove { user_id } => {
                let result =
                    query("DELETE FROM registrations WHERE event_id = $1 AND user_id = $2")
                        .bind(event_id)
                        .bind(user_id)
                        .execute(&mut **tx)
                        .await
                        .map_err(db_error)?;

                if result.rows_affected() == 0 {
                    return Err(StorageError::not_found(
                        "Registration",
                        format!("{event_id}/{user_id}"),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RegistryStore for PostgresStore {
    async fn create_user(&self, user: &User) -> Result<User, StorageError> {
        let result = query(
            "INSERT INTO users (user_id, user_name, created_at) VALUES ($1, $2, $3) \
             ON CONFLICT DO NOTHING",
        )
        .bind(&user.user_id)
        .bind(&user.name)
        .bind(*user.created_at.inner())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::already_exists("User", &user.user_id));
        }
        Ok(user.clone())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StorageError> {
        let row: Option<UserRow> =
            query_as("SELECT user_id, user_name, created_at FROM users WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        Ok(row.map(|(user_id, name, created_at)| User {
            user_id,
            name,
            created_at: Timestamp::new(created_at),
        }))
    }

    async fn create_event(&self, event: &Event) -> Result<EventRecord, StorageError> {
        let result = query(
            "INSERT INTO events (event_id, title, description, event_date, location, capacity, \
             organizer, status, waitlist_enabled, confirmed_count, revision, next_position) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 0, 1, 1) ON CONFLICT DO NOTHING",
        )
        .bind(&event.event_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.date)
        .bind(&event.location)
        .bind(event.capacity as i64)
        .bind(&event.organizer)
        .bind(event.status.to_string())
        .bind(event.waitlist_enabled)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::already_exists("Event", &event.event_id));
        }

        let mut created = event.clone();
        created.confirmed_count = 0;
        Ok(EventRecord::new(created))
    }

    async fn get_event(&self, event_id: &str) -> Result<Option<EventRecord>, StorageError> {
        let row: Option<EventRow> =
            query_as(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE event_id = $1"))
                .bind(event_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        row.map(event_record_from_row).transpose()
    }

    async fn list_events(
        &self,
        status: Option<EventStatus>,
    ) -> Result<Vec<EventRecord>, StorageError> {
        let rows: Vec<EventRow> = match status {
            Some(status) => query_as(&format!(
                "SELECT {EVENT_COLUMNS} FROM events WHERE status = $1 ORDER BY event_id"
            ))
            .bind(status.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?,
            None => query_as(&format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY event_id"))
                .fetch_all(&self.pool)
                .await
                .map_err(db_error)?,
        };

        rows.into_iter().map(event_record_from_row).collect()
    }

    async fn update_event(
        &self,
        event_id: &str,
        patch: &EventPatch,
    ) -> Result<EventRecord, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let row: Option<EventRow> = query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE event_id = $1 FOR UPDATE"
        ))
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?;

        let Some(row) = row else {
            return Err(StorageError::not_found("Event", event_id));
        };

        let mut record = event_record_from_row(row)?;
        patch.apply(&mut record.event);
        record.revision += 1;

        query(
            "UPDATE events SET title = $2, description = $3, event_date = $4, location = $5, \
             capacity = $6, organizer = $7, status = $8, waitlist_enabled = $9, \
             revision = revision + 1 WHERE event_id = $1",
        )
        .bind(event_id)
        .bind(&record.event.title)
        .bind(&record.event.description)
        .bind(record.event.date)
        .bind(&record.event.location)
        .bind(record.event.capacity as i64)
        .bind(&record.event.organizer)
        .bind(record.event.status.to_string())
        .bind(record.event.waitlist_enabled)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(record)
    }

    async fn delete_event(&self, event_id: &str) -> Result<(), StorageError> {
        let result = query("DELETE FROM events WHERE event_id = $1")
            .bind(event_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Event", event_id));
        }
        Ok(())
    }

    async fn get_registration(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> Result<Option<Registration>, StorageError> {
        let row: Option<RegistrationRow> = query_as(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations \
             WHERE event_id = $1 AND user_id = $2"
        ))
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(registration_from_row).transpose()
    }

    async fn registrations_for_event(
        &self,
        event_id: &str,
        status: Option<RegistrationStatus>,
    ) -> Result<Vec<Registration>, StorageError> {
        let rows: Vec<RegistrationRow> = match status {
            Some(status) => query_as(&format!(
                "SELECT {REGISTRATION_COLUMNS} FROM registrations \
                 WHERE event_id = $1 AND status = $2 ORDER BY registered_at, user_id"
            ))
            .bind(event_id)
            .bind(status.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?,
            None => query_as(&format!(
                "SELECT {REGISTRATION_COLUMNS} FROM registrations \
                 WHERE event_id = $1 ORDER BY registered_at, user_id"
            ))
            .bind(event_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?,
        };

        registrations_from_rows(rows)
    }

    async fn registrations_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Registration>, StorageError> {
        let rows: Vec<RegistrationRow> = query_as(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations \
             WHERE user_id = $1 ORDER BY registered_at, event_id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        registrations_from_rows(rows)
    }

    async fn waitlist_for_event(&self, event_id: &str) -> Result<Vec<Registration>, StorageError> {
        let rows: Vec<RegistrationRow> = query_as(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations \
             WHERE event_id = $1 AND status = 'waitlisted' \
             ORDER BY waitlist_position, registered_at"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        registrations_from_rows(rows)
    }

    async fn commit_event(
        &self,
        event_id: &str,
        expected_revision: u64,
        commit: EventCommit,
    ) -> Result<EventRecord, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // The revision guard. Under READ COMMITTED a concurrent commit blocks
        // on the row lock, re-evaluates the predicate after the winner
        // commits, and matches zero rows.
        let guard = query(
            "UPDATE events SET confirmed_count = $3, next_position = $4, \
             revision = revision + 1 WHERE event_id = $1 AND revision = $2",
        )
        .bind(event_id)
        .bind(expected_revision as i64)
        .bind(commit.confirmed_count as i64)
        .bind(commit.next_position as i64)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        if guard.rows_affected() == 0 {
            let actual: Option<(i64,)> =
                query_as("SELECT revision FROM events WHERE event_id = $1")
                    .bind(event_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(db_error)?;
            tx.rollback().await.map_err(db_error)?;
            return Err(match actual {
                None => StorageError::not_found("Event", event_id),
                Some((revision,)) => {
                    StorageError::revision_conflict(event_id, expected_revision, revision as u64)
                }
            });
        }

        for op in &commit.ops {
            if let Err(err) = Self::apply_op(&mut tx, event_id, op).await {
                tx.rollback().await.map_err(db_error)?;
                return Err(err);
            }
        }

        let row: EventRow =
            query_as(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE event_id = $1"))
                .bind(event_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        event_record_from_row(row)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

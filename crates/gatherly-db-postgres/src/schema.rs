//! Schema bootstrap for the PostgreSQL backend.

use sqlx_core::query::query;
use sqlx_postgres::PgPool;
use tracing::debug;

use crate::error::Result;

const DDL: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        user_id TEXT PRIMARY KEY,
        user_name TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS events (
        event_id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT,
        event_date DATE NOT NULL,
        location TEXT NOT NULL,
        capacity BIGINT NOT NULL,
        organizer TEXT NOT NULL,
        status TEXT NOT NULL,
        waitlist_enabled BOOLEAN NOT NULL,
        confirmed_count BIGINT NOT NULL DEFAULT 0,
        revision BIGINT NOT NULL DEFAULT 1,
        next_position BIGINT NOT NULL DEFAULT 1
    )"#,
    r#"CREATE TABLE IF NOT EXISTS registrations (
        event_id TEXT NOT NULL REFERENCES events(event_id) ON DELETE CASCADE,
        user_id TEXT NOT NULL,
        status TEXT NOT NULL,
        registered_at TIMESTAMPTZ NOT NULL,
        waitlist_position BIGINT,
        PRIMARY KEY (event_id, user_id)
    )"#,
    // The reverse lookup: all registrations for one user, no event scan.
    r#"CREATE INDEX IF NOT EXISTS idx_registrations_user
        ON registrations (user_id)"#,
    // The ordered waitlist per event.
    r#"CREATE INDEX IF NOT EXISTS idx_registrations_waitlist
        ON registrations (event_id, waitlist_position)
        WHERE status = 'waitlisted'"#,
];

/// Creates the tables and indexes if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    for statement in DDL {
        query(statement).execute(pool).await?;
    }
    debug!("PostgreSQL schema ensured");
    Ok(())
}

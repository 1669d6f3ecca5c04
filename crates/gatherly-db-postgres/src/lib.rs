//! PostgreSQL storage backend for the Gatherly registration service.
//!
//! Implements the `RegistryStore` trait from `gatherly-storage` on top of a
//! pooled PostgreSQL connection. The conditional `commit_event` write runs as
//! a SQL transaction whose first statement is the revision guard
//! (`UPDATE events ... WHERE event_id = $1 AND revision = $2`); when the
//! guard matches zero rows the transaction rolls back and the commit fails
//! with a revision conflict, applying nothing.
//!
//! Secondary lookups are backed by indexes: registrations carry a `user_id`
//! index (all registrations for a user without scanning events) and a partial
//! `(event_id, waitlist_position)` index over waitlisted rows (the ordered
//! waitlist query).

mod config;
mod error;
mod pool;
mod schema;
mod store;

pub use config::PostgresConfig;
pub use error::{PostgresError, Result};
pub use pool::create_pool;
pub use store::PostgresStore;

use gatherly_storage::DynRegistryStore;

/// Creates a PostgreSQL-backed RegistryStore: connects the pool and
/// bootstraps the schema.
pub async fn create_registry_store(config: &PostgresConfig) -> Result<DynRegistryStore> {
    let pool = pool::create_pool(config).await?;
    schema::ensure_schema(&pool).await?;
    Ok(std::sync::Arc::new(PostgresStore::new(pool)))
}

//! # gatherly-storage
//!
//! Storage abstraction layer for the Gatherly registration service.
//!
//! This crate defines the traits and types that all storage backends must
//! implement. It does not contain any implementations - those are provided by
//! separate crates (`gatherly-db-memory`, `gatherly-db-postgres`).
//!
//! ## Overview
//!
//! The main trait is [`RegistryStore`], which defines the contract for:
//! - Point lookups (event, user, registration by key)
//! - Secondary lookups (registrations per user, ordered waitlist per event)
//! - Event and user CRUD plumbing
//! - The conditional write used by the registration engine
//!
//! ## The conditional write
//!
//! Every [`EventRecord`] carries a `revision` token. Mutations to an event's
//! key space go through [`RegistryStore::commit_event`], which applies an
//! [`EventCommit`] (counter values plus registration ops) if and only if the
//! revision still matches, bumping it on success. A mismatch fails cleanly
//! with [`StorageError::RevisionConflict`] and applies nothing; callers
//! re-read and retry. This is what makes the read-check-write admission
//! sequence safe across concurrent requests and stateless service instances.
//!
//! ## Example
//!
//! ```ignore
//! use gatherly_storage::{EventCommit, RegistryStore, StorageError};
//!
//! async fn bump_count(store: &dyn RegistryStore, event_id: &str) -> Result<(), StorageError> {
//!     let record = store
//!         .get_event(event_id)
//!         .await?
//!         .ok_or_else(|| StorageError::not_found("Event", event_id))?;
//!
//!     let commit = EventCommit::keep(&record).with_confirmed_count(record.event.confirmed_count + 1);
//!     store.commit_event(event_id, record.revision, commit).await?;
//!     Ok(())
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::RegistryStore;
pub use types::{EventCommit, EventPatch, EventRecord, RegistrationOp};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared storage trait object.
pub type DynRegistryStore = std::sync::Arc<dyn RegistryStore>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use gatherly_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ErrorCategory, StorageError};
    pub use crate::traits::RegistryStore;
    pub use crate::types::{EventCommit, EventPatch, EventRecord, RegistrationOp};
    pub use crate::{DynRegistryStore, StorageResult};
}

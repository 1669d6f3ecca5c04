//! Storage traits for the registry storage abstraction layer.
//!
//! This module defines the core trait that all storage backends must implement.

use async_trait::async_trait;

use gatherly_core::{Event, Registration, RegistrationStatus, User};

use crate::error::StorageError;
use crate::types::{EventCommit, EventPatch, EventRecord};

/// The main storage trait that all registry backends must implement.
///
/// This trait covers the primitives the registration engine consumes: point
/// lookups, the secondary lookups backing the waitlist index and the per-user
/// registration listing, CRUD plumbing for events and users, and the
/// conditional `commit_event` write. Implementations must be thread-safe
/// (`Send + Sync`).
///
/// # Example
///
/// ```ignore
/// use gatherly_storage::{RegistryStore, StorageError, EventRecord};
///
/// async fn load_event(store: &dyn RegistryStore, id: &str) -> Result<EventRecord, StorageError> {
///     store
///         .get_event(id)
///         .await?
///         .ok_or_else(|| StorageError::not_found("Event", id))
/// }
/// ```
#[async_trait]
pub trait RegistryStore: Send + Sync {
    // ==================== Users ====================

    /// Creates a new user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if a user with the same ID exists.
    async fn create_user(&self, user: &User) -> Result<User, StorageError>;

    /// Reads a user by ID.
    ///
    /// Returns `None` if the user does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, not for missing users.
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StorageError>;

    // ==================== Events ====================

    /// Creates a new event, starting its revision and position counters.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if an event with the same ID exists.
    async fn create_event(&self, event: &Event) -> Result<EventRecord, StorageError>;

    /// Reads an event record (event plus revision/position counters) by ID.
    ///
    /// Returns `None` if the event does not exist.
    async fn get_event(&self, event_id: &str) -> Result<Option<EventRecord>, StorageError>;

    /// Lists all events, optionally filtered by status.
    async fn list_events(
        &self,
        status: Option<gatherly_core::EventStatus>,
    ) -> Result<Vec<EventRecord>, StorageError>;

    /// Applies a metadata patch to an event, bumping its revision.
    ///
    /// The patch never touches the confirmed count or the position counter.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the event does not exist.
    async fn update_event(
        &self,
        event_id: &str,
        patch: &EventPatch,
    ) -> Result<EventRecord, StorageError>;

    /// Deletes an event and all registrations in its key space.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the event does not exist.
    async fn delete_event(&self, event_id: &str) -> Result<(), StorageError>;

    // ==================== Registrations ====================

    /// Reads a registration by its (event, user) key.
    ///
    /// Returns `None` if no registration exists for the pair.
    async fn get_registration(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> Result<Option<Registration>, StorageError>;

    /// Lists registrations for an event, optionally filtered by status,
    /// ordered by registration time.
    async fn registrations_for_event(
        &self,
        event_id: &str,
        status: Option<RegistrationStatus>,
    ) -> Result<Vec<Registration>, StorageError>;

    /// Lists all registrations held by a user, across events, without
    /// scanning every event.
    async fn registrations_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Registration>, StorageError>;

    /// Lists the waitlisted registrations for an event ordered by ascending
    /// position, ties broken by ascending registration time.
    ///
    /// The first entry is the promotion head. The ordering must reflect the
    /// state after the latest committed write; it backs the capacity
    /// invariant and tolerates no cross-commit staleness.
    async fn waitlist_for_event(&self, event_id: &str) -> Result<Vec<Registration>, StorageError>;

    // ==================== Conditional write ====================

    /// Applies a commit to one event's key space as a single atomic unit,
    /// guarded by the revision the caller observed.
    ///
    /// On success the event's counters take the committed values, all
    /// registration ops are applied, and the revision is bumped. On any
    /// failure nothing is applied.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::RevisionConflict` if the event's revision no
    /// longer equals `expected_revision`.
    /// Returns `StorageError::NotFound` if the event, or a registration named
    /// by a `Promote`/`Remove` op, does not exist.
    /// Returns `StorageError::AlreadyExists` if an `Insert` op targets an
    /// occupied (event, user) key.
    async fn commit_event(
        &self,
        event_id: &str,
        expected_revision: u64,
        commit: EventCommit,
    ) -> Result<EventRecord, StorageError>;

    // ==================== Metadata ====================

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

// Ensure the trait is object-safe by using it as a trait object
#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test that RegistryStore is object-safe
    fn _assert_store_object_safe(_: &dyn RegistryStore) {}
}

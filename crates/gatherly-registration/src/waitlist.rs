//! Waitlist queries over the store.

use gatherly_core::Registration;
use gatherly_storage::{DynRegistryStore, EventRecord, RegistryStore, StorageError};

/// Queue view of an event's waitlisted registrations.
///
/// The index is derived, not stored: it reads the store's ordered waitlist
/// query, which reflects the latest committed state. Decisions built on it
/// are only ever applied through a revision-guarded commit, so a head read
/// that goes stale mid-operation conflicts the commit instead of promoting
/// the wrong user.
#[derive(Clone)]
pub struct WaitlistIndex {
    store: DynRegistryStore,
}

impl WaitlistIndex {
    pub fn new(store: DynRegistryStore) -> Self {
        Self { store }
    }

    /// Returns the promotion head: the waitlisted registration with the
    /// minimum position, ties broken by earliest registration time.
    pub async fn head(&self, event_id: &str) -> Result<Option<Registration>, StorageError> {
        let mut waitlist = self.store.waitlist_for_event(event_id).await?;
        if waitlist.is_empty() {
            Ok(None)
        } else {
            Ok(Some(waitlist.remove(0)))
        }
    }

    /// Returns the full waitlist in promotion order.
    pub async fn entries(&self, event_id: &str) -> Result<Vec<Registration>, StorageError> {
        self.store.waitlist_for_event(event_id).await
    }

    /// The position ticket the next waitlist join will receive.
    pub fn next_position(record: &EventRecord) -> u64 {
        record.next_position
    }
}

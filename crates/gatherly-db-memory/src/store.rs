use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use papaya::{Compute, HashMap as PapayaHashMap, Operation};

use gatherly_core::{Event, EventStatus, Registration, RegistrationStatus, User};
use gatherly_storage::{
    EventCommit, EventPatch, EventRecord, RegistrationOp, RegistryStore, StorageError,
};

/// One event's whole key space: the event record plus its registrations,
/// keyed by user. Commits replace the slot as a unit, which is what makes
/// the revision guard equivalent to a per-event serializable transaction.
#[derive(Debug, Clone)]
struct EventSlot {
    event: Event,
    revision: u64,
    next_position: u64,
    registrations: BTreeMap<String, Registration>,
}

impl EventSlot {
    fn new(event: Event) -> Self {
        Self {
            event,
            revision: 1,
            next_position: 1,
            registrations: BTreeMap::new(),
        }
    }

    fn record(&self) -> EventRecord {
        EventRecord {
            event: self.event.clone(),
            revision: self.revision,
            next_position: self.next_position,
        }
    }

    /// Builds the slot state after a commit, or the error that fails the
    /// whole commit. Never mutates `self`.
    fn apply(&self, event_id: &str, commit: &EventCommit) -> Result<EventSlot, StorageError> {
        let mut next = self.clone();
        next.event.confirmed_count = commit.confirmed_count;
        next.next_position = commit.next_position;
        next.revision += 1;

        for op in &commit.ops {
            match op {
                RegistrationOp::Insert(registration) => {
                    if next.registrations.contains_key(&registration.user_id) {
                        return Err(StorageError::already_exists(
                            "Registration",
                            format!("{event_id}/{}", registration.user_id),
                        ));
                    }
                    next.registrations
                        .insert(registration.user_id.clone(), registration.clone());
                }
                RegistrationOp::Promote { user_id } => {
                    let registration = next.registrations.get_mut(user_id).ok_or_else(|| {
                        StorageError::not_found("Registration", format!("{event_id}/{user_id}"))
                    })?;
                    registration.promote();
                }
                RegistrationOp::Remove { user_id } => {
                    next.registrations.remove(user_id).ok_or_else(|| {
                        StorageError::not_found("Registration", format!("{event_id}/{user_id}"))
                    })?;
                }
            }
        }

        Ok(next)
    }
}

/// Why a conditional commit was rejected inside the atomic compute step.
enum CommitFailure {
    EventMissing,
    RevisionMoved(u64),
    Invalid(StorageError),
}

/// In-memory registry storage backend using papaya lock-free HashMaps.
///
/// This storage implementation provides:
/// - Lock-free concurrent access via papaya::HashMap
/// - Per-event atomic conditional commits (revision-guarded CAS)
/// - The ordered waitlist and per-user secondary lookups
#[derive(Debug, Default)]
pub struct InMemoryStore {
    events: Arc<PapayaHashMap<String, EventSlot>>,
    users: Arc<PapayaHashMap<String, User>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            events: Arc::new(PapayaHashMap::new()),
            users: Arc::new(PapayaHashMap::new()),
        }
    }
}

#[async_trait]
impl RegistryStore for InMemoryStore {
    async fn create_user(&self, user: &User) -> Result<User, StorageError> {
        let guard = self.users.pin();
        let result = guard.compute(user.user_id.clone(), |entry| match entry {
            Some(_) => Operation::Abort(()),
            None => Operation::Insert(user.clone()),
        });

        match result {
            Compute::Inserted(_, stored) => Ok(stored.clone()),
            Compute::Aborted(()) => Err(StorageError::already_exists("User", &user.user_id)),
            _ => Err(StorageError::internal("unexpected user insert outcome")),
        }
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StorageError> {
        let guard = self.users.pin();
        Ok(guard.get(user_id).cloned())
    }

    async fn create_event(&self, event: &Event) -> Result<EventRecord, StorageError> {
        let guard = self.events.pin();
        let result = guard.compute(event.event_id.clone(), |entry| match entry {
            Some(_) => Operation::Abort(()),
            None => Operation::Insert(EventSlot::new(event.clone())),
        });

        match result {
            Compute::Inserted(_, slot) => Ok(slot.record()),
            Compute::Aborted(()) => Err(StorageError::already_exists("Event", &event.event_id)),
            _ => Err(StorageError::internal("unexpected event insert outcome")),
        }
    }

    async fn get_event(&self, event_id: &str) -> Result<Option<EventRecord>, StorageError> {
        let guard = self.events.pin();
        Ok(guard.get(event_id).map(EventSlot::record))
    }

    async fn list_events(
        &self,
        status: Option<EventStatus>,
    ) -> Result<Vec<EventRecord>, StorageError> {
        let guard = self.events.pin();
        let mut records: Vec<EventRecord> = guard
            .iter()
            .filter(|(_, slot)| status.is_none_or(|s| slot.event.status == s))
            .map(|(_, slot)| slot.record())
            .collect();
        records.sort_by(|a, b| a.event.event_id.cmp(&b.event.event_id));
        Ok(records)
    }

    async fn update_event(
        &self,
        event_id: &str,
        patch: &EventPatch,
    ) -> Result<EventRecord, StorageError> {
        let guard = self.events.pin();
        let result = guard.compute(event_id.to_string(), |entry| match entry {
            None => Operation::Abort(()),
            Some((_, slot)) => {
                let mut next = slot.clone();
                patch.apply(&mut next.event);
                next.revision += 1;
                Operation::Insert(next)
            }
        });

        match result {
            Compute::Updated {
                new: (_, slot), ..
            } => Ok(slot.record()),
            Compute::Aborted(()) => Err(StorageError::not_found("Event", event_id)),
            _ => Err(StorageError::internal("unexpected event update outcome")),
        }
    }

    async fn delete_event(&self, event_id: &str) -> Result<(), StorageError> {
        let guard = self.events.pin();
        match guard.remove(event_id) {
            Some(_) => Ok(()),
            None => Err(StorageError::not_found("Event", event_id)),
        }
    }

    async fn get_registration(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> Result<Option<Registration>, StorageError> {
        let guard = self.events.pin();
        Ok(guard
            .get(event_id)
            .and_then(|slot| slot.registrations.get(user_id).cloned()))
    }

    async fn registrations_for_event(
        &self,
        event_id: &str,
        status: Option<RegistrationStatus>,
    ) -> Result<Vec<Registration>, StorageError> {
        let guard = self.events.pin();
        let mut registrations: Vec<Registration> = match guard.get(event_id) {
            Some(slot) => slot
                .registrations
                .values()
                .filter(|r| status.is_none_or(|s| r.status == s))
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        registrations.sort_by(|a, b| {
            a.registered_at
                .cmp(&b.registered_at)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        Ok(registrations)
    }

    async fn registrations_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Registration>, StorageError> {
        let guard = self.events.pin();
        let mut registrations: Vec<Registration> = guard
            .iter()
            .filter_map(|(_, slot)| slot.registrations.get(user_id).cloned())
            .collect();
        registrations.sort_by(|a, b| {
            a.registered_at
                .cmp(&b.registered_at)
                .then_with(|| a.event_id.cmp(&b.event_id))
        });
        Ok(registrations)
    }

    async fn waitlist_for_event(&self, event_id: &str) -> Result<Vec<Registration>, StorageError> {
        let guard = self.events.pin();
        let mut waitlisted: Vec<Registration> = match guard.get(event_id) {
            Some(slot) => slot
                .registrations
                .values()
                .filter(|r| r.is_waitlisted())
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        waitlisted.sort_by(|a, b| {
            a.waitlist_position
                .cmp(&b.waitlist_position)
                .then_with(|| a.registered_at.cmp(&b.registered_at))
        });
        Ok(waitlisted)
    }

    async fn commit_event(
        &self,
        event_id: &str,
        expected_revision: u64,
        commit: EventCommit,
    ) -> Result<EventRecord, StorageError> {
        let guard = self.events.pin();
        let result = guard.compute(event_id.to_string(), |entry| match entry {
            None => Operation::Abort(CommitFailure::EventMissing),
            Some((_, slot)) => {
                if slot.revision != expected_revision {
                    return Operation::Abort(CommitFailure::RevisionMoved(slot.revision));
                }
                match slot.apply(event_id, &commit) {
                    Ok(next) => Operation::Insert(next),
                    Err(err) => Operation::Abort(CommitFailure::Invalid(err)),
                }
            }
        });

        match result {
            Compute::Updated {
                new: (_, slot), ..
            } => Ok(slot.record()),
            Compute::Aborted(CommitFailure::EventMissing) => {
                Err(StorageError::not_found("Event", event_id))
            }
            Compute::Aborted(CommitFailure::RevisionMoved(actual)) => Err(
                StorageError::revision_conflict(event_id, expected_revision, actual),
            ),
            Compute::Aborted(CommitFailure::Invalid(err)) => Err(err),
            _ => Err(StorageError::internal("unexpected commit outcome")),
        }
    }

    fn backend_name(&self) -> &'static str {
        "in-memory-papaya"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatherly_core::now_utc;
    use time::macros::date;

    fn sample_event(event_id: &str, capacity: u32) -> Event {
        Event {
            event_id: event_id.to_string(),
            title: "Rust Meetup".to_string(),
            description: None,
            date: date!(2025 - 09 - 01),
            location: "Main Hall".to_string(),
            capacity,
            organizer: "Community".to_string(),
            status: EventStatus::Published,
            waitlist_enabled: true,
            confirmed_count: 0,
        }
    }

    fn sample_user(user_id: &str) -> User {
        User {
            user_id: user_id.to_string(),
            name: user_id.to_string(),
            created_at: now_utc(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let store = InMemoryStore::new();
        store.create_user(&sample_user("alice")).await.unwrap();

        let user = store.get_user("alice").await.unwrap();
        assert_eq!(user.unwrap().user_id, "alice");
        assert!(store.get_user("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_user_rejected() {
        let store = InMemoryStore::new();
        store.create_user(&sample_user("alice")).await.unwrap();

        let err = store.create_user(&sample_user("alice")).await.unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn test_create_event_starts_counters() {
        let store = InMemoryStore::new();
        let record = store.create_event(&sample_event("evt-1", 5)).await.unwrap();

        assert_eq!(record.revision, 1);
        assert_eq!(record.next_position, 1);
        assert_eq!(record.event.confirmed_count, 0);
    }

    #[tokio::test]
    async fn test_duplicate_event_rejected() {
        let store = InMemoryStore::new();
        store.create_event(&sample_event("evt-1", 5)).await.unwrap();

        let err = store
            .create_event(&sample_event("evt-1", 5))
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn test_commit_inserts_registration_and_bumps_revision() {
        let store = InMemoryStore::new();
        let record = store.create_event(&sample_event("evt-1", 5)).await.unwrap();

        let registration = Registration::confirmed("evt-1", "alice", now_utc());
        let commit = EventCommit::keep(&record)
            .with_confirmed_count(1)
            .insert(registration.clone());

        let updated = store
            .commit_event("evt-1", record.revision, commit)
            .await
            .unwrap();
        assert_eq!(updated.revision, 2);
        assert_eq!(updated.event.confirmed_count, 1);

        let stored = store.get_registration("evt-1", "alice").await.unwrap();
        assert_eq!(stored, Some(registration));
    }

    #[tokio::test]
    async fn test_commit_with_stale_revision_conflicts() {
        let store = InMemoryStore::new();
        let record = store.create_event(&sample_event("evt-1", 5)).await.unwrap();

        let first = EventCommit::keep(&record)
            .with_confirmed_count(1)
            .insert(Registration::confirmed("evt-1", "alice", now_utc()));
        store
            .commit_event("evt-1", record.revision, first)
            .await
            .unwrap();

        // Second commit still carries the pre-commit revision.
        let second = EventCommit::keep(&record)
            .with_confirmed_count(1)
            .insert(Registration::confirmed("evt-1", "bob", now_utc()));
        let err = store
            .commit_event("evt-1", record.revision, second)
            .await
            .unwrap_err();

        assert!(err.is_revision_conflict());
        // The losing commit applied nothing.
        assert!(
            store
                .get_registration("evt-1", "bob")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_commit_duplicate_insert_fails_whole_commit() {
        let store = InMemoryStore::new();
        let record = store.create_event(&sample_event("evt-1", 5)).await.unwrap();

        let commit = EventCommit::keep(&record)
            .with_confirmed_count(1)
            .insert(Registration::confirmed("evt-1", "alice", now_utc()));
        let record = store
            .commit_event("evt-1", record.revision, commit)
            .await
            .unwrap();

        let duplicate = EventCommit::keep(&record)
            .with_confirmed_count(2)
            .insert(Registration::confirmed("evt-1", "alice", now_utc()));
        let err = store
            .commit_event("evt-1", record.revision, duplicate)
            .await
            .unwrap_err();

        assert!(err.is_already_exists());
        // Counter update was not applied either.
        let record = store.get_event("evt-1").await.unwrap().unwrap();
        assert_eq!(record.event.confirmed_count, 1);
    }

    #[tokio::test]
    async fn test_commit_promote_flips_head() {
        let store = InMemoryStore::new();
        let mut record = store.create_event(&sample_event("evt-1", 1)).await.unwrap();

        let commit = EventCommit::keep(&record)
            .with_confirmed_count(1)
            .insert(Registration::confirmed("evt-1", "alice", now_utc()));
        record = store
            .commit_event("evt-1", record.revision, commit)
            .await
            .unwrap();

        let commit = EventCommit::keep(&record)
            .with_next_position(2)
            .insert(Registration::waitlisted("evt-1", "bob", now_utc(), 1));
        record = store
            .commit_event("evt-1", record.revision, commit)
            .await
            .unwrap();

        let commit = EventCommit::keep(&record).remove("alice").promote("bob");
        store
            .commit_event("evt-1", record.revision, commit)
            .await
            .unwrap();

        let bob = store
            .get_registration("evt-1", "bob")
            .await
            .unwrap()
            .unwrap();
        assert!(bob.is_confirmed());
        assert!(bob.waitlist_position.is_none());
        assert!(
            store
                .get_registration("evt-1", "alice")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_waitlist_ordering() {
        let store = InMemoryStore::new();
        let mut record = store.create_event(&sample_event("evt-1", 0)).await.unwrap();

        for (user, position) in [("carol", 3), ("alice", 1), ("bob", 2)] {
            let commit = EventCommit::keep(&record)
                .with_next_position(position + 1)
                .insert(Registration::waitlisted("evt-1", user, now_utc(), position));
            record = store
                .commit_event("evt-1", record.revision, commit)
                .await
                .unwrap();
        }

        let waitlist = store.waitlist_for_event("evt-1").await.unwrap();
        let users: Vec<&str> = waitlist.iter().map(|r| r.user_id.as_str()).collect();
        assert_eq!(users, vec!["alice", "bob", "carol"]);
    }

    #[tokio::test]
    async fn test_registrations_for_user_spans_events() {
        let store = InMemoryStore::new();
        for event_id in ["evt-1", "evt-2"] {
            let record = store
                .create_event(&sample_event(event_id, 5))
                .await
                .unwrap();
            let commit = EventCommit::keep(&record)
                .with_confirmed_count(1)
                .insert(Registration::confirmed(event_id, "alice", now_utc()));
            store
                .commit_event(event_id, record.revision, commit)
                .await
                .unwrap();
        }

        let registrations = store.registrations_for_user("alice").await.unwrap();
        assert_eq!(registrations.len(), 2);
        assert!(registrations.iter().all(|r| r.user_id == "alice"));
    }

    #[tokio::test]
    async fn test_registrations_for_event_status_filter() {
        let store = InMemoryStore::new();
        let mut record = store.create_event(&sample_event("evt-1", 1)).await.unwrap();

        let commit = EventCommit::keep(&record)
            .with_confirmed_count(1)
            .insert(Registration::confirmed("evt-1", "alice", now_utc()));
        record = store
            .commit_event("evt-1", record.revision, commit)
            .await
            .unwrap();

        let commit = EventCommit::keep(&record)
            .with_next_position(2)
            .insert(Registration::waitlisted("evt-1", "bob", now_utc(), 1));
        store
            .commit_event("evt-1", record.revision, commit)
            .await
            .unwrap();

        let confirmed = store
            .registrations_for_event("evt-1", Some(RegistrationStatus::Confirmed))
            .await
            .unwrap();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].user_id, "alice");

        let all = store.registrations_for_event("evt-1", None).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_update_event_patches_metadata_only() {
        let store = InMemoryStore::new();
        let record = store.create_event(&sample_event("evt-1", 5)).await.unwrap();

        let commit = EventCommit::keep(&record)
            .with_confirmed_count(1)
            .insert(Registration::confirmed("evt-1", "alice", now_utc()));
        store
            .commit_event("evt-1", record.revision, commit)
            .await
            .unwrap();

        let patch = EventPatch {
            capacity: Some(1),
            title: Some("Renamed".to_string()),
            ..Default::default()
        };
        let updated = store.update_event("evt-1", &patch).await.unwrap();

        assert_eq!(updated.event.title, "Renamed");
        assert_eq!(updated.event.capacity, 1);
        assert_eq!(updated.event.confirmed_count, 1);
        assert_eq!(updated.revision, 3);
    }

    #[tokio::test]
    async fn test_update_event_bump_invalidates_stale_commits() {
        let store = InMemoryStore::new();
        let record = store.create_event(&sample_event("evt-1", 5)).await.unwrap();

        let patch = EventPatch {
            capacity: Some(1),
            ..Default::default()
        };
        store.update_event("evt-1", &patch).await.unwrap();

        let stale = EventCommit::keep(&record)
            .with_confirmed_count(1)
            .insert(Registration::confirmed("evt-1", "alice", now_utc()));
        let err = store
            .commit_event("evt-1", record.revision, stale)
            .await
            .unwrap_err();
        assert!(err.is_revision_conflict());
    }

    #[tokio::test]
    async fn test_delete_event_drops_key_space() {
        let store = InMemoryStore::new();
        let record = store.create_event(&sample_event("evt-1", 5)).await.unwrap();
        let commit = EventCommit::keep(&record)
            .with_confirmed_count(1)
            .insert(Registration::confirmed("evt-1", "alice", now_utc()));
        store
            .commit_event("evt-1", record.revision, commit)
            .await
            .unwrap();

        store.delete_event("evt-1").await.unwrap();
        assert!(store.get_event("evt-1").await.unwrap().is_none());
        assert!(
            store
                .get_registration("evt-1", "alice")
                .await
                .unwrap()
                .is_none()
        );

        let err = store.delete_event("evt-1").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_events_with_status_filter() {
        let store = InMemoryStore::new();
        store.create_event(&sample_event("evt-1", 5)).await.unwrap();

        let mut draft = sample_event("evt-2", 5);
        draft.status = EventStatus::Draft;
        store.create_event(&draft).await.unwrap();

        let all = store.list_events(None).await.unwrap();
        assert_eq!(all.len(), 2);

        let published = store
            .list_events(Some(EventStatus::Published))
            .await
            .unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].event.event_id, "evt-1");
    }

    #[tokio::test]
    async fn test_backend_name() {
        let store = InMemoryStore::new();
        assert_eq!(store.backend_name(), "in-memory-papaya");
    }
}

//! Storage types shared by all backends.

use gatherly_core::{Event, EventStatus, Registration};
use serde::{Deserialize, Serialize};
use time::Date;

/// An event as held by the storage backend: the domain [`Event`] plus the
/// store-issued bookkeeping that the registration engine relies on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// The event itself.
    pub event: Event,
    /// Optimistic-concurrency token. Bumped by the store on every committed
    /// write to this event's key space; conditional writes are guarded on it.
    pub revision: u64,
    /// The next waitlist position ticket for this event. Issued monotonically
    /// by the store, never reused and never renumbered.
    pub next_position: u64,
}

impl EventRecord {
    /// Wraps a freshly created event.
    #[must_use]
    pub fn new(event: Event) -> Self {
        Self {
            event,
            revision: 1,
            next_position: 1,
        }
    }
}

/// A single registration operation inside an [`EventCommit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RegistrationOp {
    /// Creates a registration. Fails the whole commit with `AlreadyExists`
    /// if one is present for the same (event, user) pair.
    Insert(Registration),
    /// Flips a waitlisted registration to confirmed and clears its position.
    /// Fails the whole commit with `NotFound` if the registration is absent.
    Promote { user_id: String },
    /// Deletes a registration. Fails the whole commit with `NotFound` if it
    /// is absent.
    Remove { user_id: String },
}

/// The unit of conditional mutation for one event.
///
/// A commit replaces the event's counters and applies its registration ops as
/// one atomic step, guarded by the revision the caller observed. Either the
/// entire commit applies or none of it does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCommit {
    /// The confirmed-count value after this commit.
    pub confirmed_count: u32,
    /// The next-position counter value after this commit.
    pub next_position: u64,
    /// Registration operations applied together with the counter update.
    pub ops: Vec<RegistrationOp>,
}

impl EventCommit {
    /// Starts a commit that keeps the record's counters unchanged.
    #[must_use]
    pub fn keep(record: &EventRecord) -> Self {
        Self {
            confirmed_count: record.event.confirmed_count,
            next_position: record.next_position,
            ops: Vec::new(),
        }
    }

    /// Sets the confirmed-count value after the commit.
    #[must_use]
    pub fn with_confirmed_count(mut self, confirmed_count: u32) -> Self {
        self.confirmed_count = confirmed_count;
        self
    }

    /// Sets the next-position counter value after the commit.
    #[must_use]
    pub fn with_next_position(mut self, next_position: u64) -> Self {
        self.next_position = next_position;
        self
    }

    /// Adds a registration insert.
    #[must_use]
    pub fn insert(mut self, registration: Registration) -> Self {
        self.ops.push(RegistrationOp::Insert(registration));
        self
    }

    /// Adds a waitlist promotion.
    #[must_use]
    pub fn promote(mut self, user_id: impl Into<String>) -> Self {
        self.ops.push(RegistrationOp::Promote {
            user_id: user_id.into(),
        });
        self
    }

    /// Adds a registration removal.
    #[must_use]
    pub fn remove(mut self, user_id: impl Into<String>) -> Self {
        self.ops.push(RegistrationOp::Remove {
            user_id: user_id.into(),
        });
        self
    }
}

/// A partial metadata update for an event.
///
/// Only metadata fields appear here: the confirmed count and the position
/// counter belong to the registration engine and cannot be patched. Lowering
/// `capacity` below the current confirmed count is allowed and performs no
/// reconciliation; the capacity bound is enforced at admission time only.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<Date>,
    pub location: Option<String>,
    pub capacity: Option<u32>,
    pub organizer: Option<String>,
    pub status: Option<EventStatus>,
    pub waitlist_enabled: Option<bool>,
}

impl EventPatch {
    /// Returns `true` if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.date.is_none()
            && self.location.is_none()
            && self.capacity.is_none()
            && self.organizer.is_none()
            && self.status.is_none()
            && self.waitlist_enabled.is_none()
    }

    /// Applies the patch to an event's metadata in place.
    pub fn apply(&self, event: &mut Event) {
        if let Some(title) = &self.title {
            event.title = title.clone();
        }
        if let Some(description) = &self.description {
            event.description = Some(description.clone());
        }
        if let Some(date) = self.date {
            event.date = date;
        }
        if let Some(location) = &self.location {
            event.location = location.clone();
        }
        if let Some(capacity) = self.capacity {
            event.capacity = capacity;
        }
        if let Some(organizer) = &self.organizer {
            event.organizer = organizer.clone();
        }
        if let Some(status) = self.status {
            event.status = status;
        }
        if let Some(waitlist_enabled) = self.waitlist_enabled {
            event.waitlist_enabled = waitlist_enabled;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatherly_core::now_utc;
    use time::macros::date;

    fn sample_event() -> Event {
        Event {
            event_id: "evt-1".to_string(),
            title: "Rust Meetup".to_string(),
            description: None,
            date: date!(2025 - 09 - 01),
            location: "Main Hall".to_string(),
            capacity: 5,
            organizer: "Community".to_string(),
            status: EventStatus::Published,
            waitlist_enabled: true,
            confirmed_count: 0,
        }
    }

    #[test]
    fn test_event_record_new() {
        let record = EventRecord::new(sample_event());
        assert_eq!(record.revision, 1);
        assert_eq!(record.next_position, 1);
        assert_eq!(record.event.confirmed_count, 0);
    }

    #[test]
    fn test_event_commit_builder() {
        let record = EventRecord::new(sample_event());
        let registration = Registration::confirmed("evt-1", "alice", now_utc());

        let commit = EventCommit::keep(&record)
            .with_confirmed_count(1)
            .insert(registration.clone());

        assert_eq!(commit.confirmed_count, 1);
        assert_eq!(commit.next_position, 1);
        assert_eq!(commit.ops, vec![RegistrationOp::Insert(registration)]);
    }

    #[test]
    fn test_event_commit_promote_and_remove() {
        let record = EventRecord::new(sample_event());
        let commit = EventCommit::keep(&record).remove("alice").promote("bob");

        assert_eq!(
            commit.ops,
            vec![
                RegistrationOp::Remove {
                    user_id: "alice".to_string()
                },
                RegistrationOp::Promote {
                    user_id: "bob".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_event_patch_is_empty() {
        assert!(EventPatch::default().is_empty());

        let patch = EventPatch {
            capacity: Some(10),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_event_patch_apply_metadata_only() {
        let mut event = sample_event();
        event.confirmed_count = 3;

        let patch = EventPatch {
            title: Some("Renamed".to_string()),
            capacity: Some(2),
            waitlist_enabled: Some(false),
            ..Default::default()
        };
        patch.apply(&mut event);

        assert_eq!(event.title, "Renamed");
        assert_eq!(event.capacity, 2);
        assert!(!event.waitlist_enabled);
        // Counters are untouched even when capacity drops below them.
        assert_eq!(event.confirmed_count, 3);
    }
}

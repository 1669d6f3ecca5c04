//! Admission control: the confirm-or-waitlist-or-reject decision for new
//! registrations.

use gatherly_core::{Registration, now_utc};
use gatherly_storage::{DynRegistryStore, EventCommit, RegistryStore, StorageError};

use crate::error::RegistrationError;
use crate::retry::RetryPolicy;
use crate::waitlist::WaitlistIndex;

/// Decides the admission outcome for a registration request and applies it
/// with a single conditional commit against the event's revision.
///
/// The read-check-write sequence (read the count, compare to capacity, write
/// the registration and the count) is never applied blind: the commit is
/// guarded by the revision observed at the read, so two concurrent requests
/// racing for the last slot cannot both confirm. The loser re-reads and is
/// admitted under the rules that now apply.
#[derive(Clone)]
pub struct AdmissionController {
    store: DynRegistryStore,
    retry: RetryPolicy,
}

impl AdmissionController {
    pub fn new(store: DynRegistryStore) -> Self {
        Self::with_retry_policy(store, RetryPolicy::default())
    }

    pub fn with_retry_policy(store: DynRegistryStore, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Registers a user for an event.
    ///
    /// # Errors
    ///
    /// - `UserNotFound` / `EventNotFound` if either side of the pair is absent.
    /// - `AlreadyRegistered` if a registration exists for the pair; the
    ///   existing record is never overwritten.
    /// - `EventFull` if capacity is reached and the event has no waitlist.
    /// - `Aborted` if every attempt lost its commit race.
    pub async fn register(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> Result<Registration, RegistrationError> {
        if self.store.get_user(user_id).await?.is_none() {
            return Err(RegistrationError::user_not_found(user_id));
        }

        for attempt in 0..self.retry.attempts() {
            if attempt > 0 {
                tokio::time::sleep(self.retry.delay_for_attempt(attempt - 1)).await;
            }

            match self.try_register(event_id, user_id).await {
                Err(err) if err.is_revision_conflict() => {
                    tracing::debug!(event_id, user_id, attempt, "admission commit lost the race, retrying");
                }
                other => return other,
            }
        }

        Err(RegistrationError::aborted(event_id, self.retry.attempts()))
    }

    /// One admission attempt at the event's current revision.
    async fn try_register(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> Result<Registration, RegistrationError> {
        let record = self
            .store
            .get_event(event_id)
            .await?
            .ok_or_else(|| RegistrationError::event_not_found(event_id))?;

        if self
            .store
            .get_registration(event_id, user_id)
            .await?
            .is_some()
        {
            return Err(RegistrationError::already_registered(event_id, user_id));
        }

        let now = now_utc();
        let event = &record.event;

        let (registration, commit) = if event.has_capacity() {
            let registration = Registration::confirmed(event_id, user_id, now);
            let commit = EventCommit::keep(&record)
                .with_confirmed_count(event.confirmed_count + 1)
                .insert(registration.clone());
            (registration, commit)
        } else if !event.waitlist_enabled {
            return Err(RegistrationError::event_full(event_id));
        } else {
            let position = WaitlistIndex::next_position(&record);
            let registration = Registration::waitlisted(event_id, user_id, now, position);
            let commit = EventCommit::keep(&record)
                .with_next_position(position + 1)
                .insert(registration.clone());
            (registration, commit)
        };

        match self
            .store
            .commit_event(event_id, record.revision, commit)
            .await
        {
            Ok(_) => {
                tracing::info!(
                    event_id,
                    user_id,
                    status = %registration.status,
                    position = ?registration.waitlist_position,
                    "registration admitted"
                );
                Ok(registration)
            }
            // The insert hit a registration that appeared after our check but
            // in the same revision window; same answer as the pre-check.
            Err(StorageError::AlreadyExists { .. }) => {
                Err(RegistrationError::already_registered(event_id, user_id))
            }
            Err(StorageError::NotFound { kind, .. }) if kind == "Event" => {
                Err(RegistrationError::event_not_found(event_id))
            }
            Err(err) => Err(err.into()),
        }
    }
}

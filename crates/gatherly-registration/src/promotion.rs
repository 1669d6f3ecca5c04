//! Unregistration and waitlist promotion.

use gatherly_storage::{DynRegistryStore, EventCommit, RegistryStore, StorageError};

use crate::error::RegistrationError;
use crate::retry::RetryPolicy;
use crate::waitlist::WaitlistIndex;

/// Deletes registrations and refills vacated confirmed slots from the
/// waitlist head.
///
/// A confirmed cancellation and the promotion it triggers are one commit:
/// either both the removal and the head flip land, or neither does. Removing
/// a waitlisted entry never renumbers the remaining positions.
#[derive(Clone)]
pub struct PromotionEngine {
    store: DynRegistryStore,
    waitlist: WaitlistIndex,
    retry: RetryPolicy,
}

impl PromotionEngine {
    pub fn new(store: DynRegistryStore) -> Self {
        Self::with_retry_policy(store, RetryPolicy::default())
    }

    pub fn with_retry_policy(store: DynRegistryStore, retry: RetryPolicy) -> Self {
        let waitlist = WaitlistIndex::new(store.clone());
        Self {
            store,
            waitlist,
            retry,
        }
    }

    /// Unregisters a user from an event.
    ///
    /// # Errors
    ///
    /// - `NotRegistered` if no registration exists for the pair.
    /// - `Aborted` if every attempt lost its commit race.
    pub async fn unregister(&self, event_id: &str, user_id: &str) -> Result<(), RegistrationError> {
        for attempt in 0..self.retry.attempts() {
            if attempt > 0 {
                tokio::time::sleep(self.retry.delay_for_attempt(attempt - 1)).await;
            }

            match self.try_unregister(event_id, user_id).await {
                Err(err) if err.is_revision_conflict() => {
                    tracing::debug!(event_id, user_id, attempt, "promotion commit lost the race, retrying");
                }
                other => return other,
            }
        }

        Err(RegistrationError::aborted(event_id, self.retry.attempts()))
    }

    /// One unregistration attempt at the event's current revision.
    async fn try_unregister(&self, event_id: &str, user_id: &str) -> Result<(), RegistrationError> {
        // The revision must be captured before the registration is read: any
        // status flip after this read bumps the revision and conflicts the
        // commit below, so the decision can never act on a stale status.
        let Some(record) = self.store.get_event(event_id).await? else {
            return Err(RegistrationError::not_registered(event_id, user_id));
        };

        let registration = self
            .store
            .get_registration(event_id, user_id)
            .await?
            .ok_or_else(|| RegistrationError::not_registered(event_id, user_id))?;

        let commit = if registration.is_waitlisted() {
            // The waitlist just gets shorter; positions are tickets, not
            // ranks, so nothing is renumbered.
            EventCommit::keep(&record).remove(user_id)
        } else {
            match self.waitlist.head(event_id).await? {
                Some(head) => {
                    tracing::info!(
                        event_id,
                        vacated_by = user_id,
                        promoted = %head.user_id,
                        position = ?head.waitlist_position,
                        "promoting waitlist head into vacated slot"
                    );
                    EventCommit::keep(&record)
                        .remove(user_id)
                        .promote(head.user_id)
                }
                None => EventCommit::keep(&record)
                    .with_confirmed_count(record.event.confirmed_count.saturating_sub(1))
                    .remove(user_id),
            }
        };

        match self
            .store
            .commit_event(event_id, record.revision, commit)
            .await
        {
            Ok(_) => {
                tracing::info!(event_id, user_id, "registration removed");
                Ok(())
            }
            Err(StorageError::NotFound { kind, .. }) if kind == "Event" => {
                Err(RegistrationError::not_registered(event_id, user_id))
            }
            Err(StorageError::NotFound { kind, .. }) if kind == "Registration" => {
                Err(RegistrationError::not_registered(event_id, user_id))
            }
            Err(err) => Err(err.into()),
        }
    }
}

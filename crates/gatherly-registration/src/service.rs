//! The registration service facade consumed by the HTTP layer.

use gatherly_core::{Registration, RegistrationStatus};
use gatherly_storage::{DynRegistryStore, RegistryStore};

use crate::admission::AdmissionController;
use crate::error::RegistrationError;
use crate::promotion::PromotionEngine;
use crate::retry::RetryPolicy;

/// The operation surface of the registration engine.
///
/// Owns the store handle and the two engines; constructed once per process
/// and shared by reference.
#[derive(Clone)]
pub struct RegistrationService {
    store: DynRegistryStore,
    admission: AdmissionController,
    promotion: PromotionEngine,
}

impl RegistrationService {
    pub fn new(store: DynRegistryStore) -> Self {
        Self::with_retry_policy(store, RetryPolicy::default())
    }

    pub fn with_retry_policy(store: DynRegistryStore, retry: RetryPolicy) -> Self {
        let admission = AdmissionController::with_retry_policy(store.clone(), retry.clone());
        let promotion = PromotionEngine::with_retry_policy(store.clone(), retry);
        Self {
            store,
            admission,
            promotion,
        }
    }

    /// Registers a user for an event, confirming or waitlisting per capacity.
    pub async fn register(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> Result<Registration, RegistrationError> {
        self.admission.register(event_id, user_id).await
    }

    /// Unregisters a user from an event, promoting the waitlist head if a
    /// confirmed slot was vacated.
    pub async fn unregister(&self, event_id: &str, user_id: &str) -> Result<(), RegistrationError> {
        self.promotion.unregister(event_id, user_id).await
    }

    /// Lists all registrations held by a user.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the user does not exist.
    pub async fn list_user_registrations(
        &self,
        user_id: &str,
    ) -> Result<Vec<Registration>, RegistrationError> {
        if self.store.get_user(user_id).await?.is_none() {
            return Err(RegistrationError::user_not_found(user_id));
        }
        Ok(self.store.registrations_for_user(user_id).await?)
    }

    /// Lists registrations for an event, optionally filtered by status.
    ///
    /// An unknown event yields an empty list.
    pub async fn list_event_registrations(
        &self,
        event_id: &str,
        status: Option<RegistrationStatus>,
    ) -> Result<Vec<Registration>, RegistrationError> {
        Ok(self
            .store
            .registrations_for_event(event_id, status)
            .await?)
    }

    /// The underlying store handle.
    pub fn store(&self) -> &DynRegistryStore {
        &self.store
    }
}

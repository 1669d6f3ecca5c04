use std::sync::Arc;

use gatherly_registration::RegistrationService;
use gatherly_storage::DynRegistryStore;

/// Shared application state handed to every handler.
///
/// Constructed once at startup; cloning is cheap (everything is behind Arcs).
#[derive(Clone)]
pub struct AppState {
    pub store: DynRegistryStore,
    pub registrations: Arc<RegistrationService>,
}

impl AppState {
    pub fn new(store: DynRegistryStore) -> Self {
        let registrations = Arc::new(RegistrationService::new(store.clone()));
        Self {
            store,
            registrations,
        }
    }
}

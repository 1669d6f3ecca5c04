//! In-memory storage backend for the Gatherly registration service.
//!
//! This crate provides an in-memory implementation of the `RegistryStore`
//! trait from `gatherly-storage`, using the papaya lock-free HashMap for
//! concurrent access. Each event's whole key space (the event record plus its
//! registrations) lives in a single map slot, so the conditional
//! `commit_event` write is one atomic compare-and-swap: the revision check
//! and the slot replacement cannot interleave with a concurrent commit.
//!
//! # Example
//!
//! ```ignore
//! use gatherly_db_memory::InMemoryStore;
//! use gatherly_storage::RegistryStore;
//!
//! let store = InMemoryStore::new();
//! let record = store.create_event(&event).await?;
//! ```

mod store;

pub use store::InMemoryStore;

// Re-export the RegistryStore trait for convenience
pub use gatherly_storage::{DynRegistryStore, RegistryStore, StorageError};

/// Creates a new in-memory RegistryStore instance.
pub fn create_registry_store() -> DynRegistryStore {
    std::sync::Arc::new(InMemoryStore::new())
}

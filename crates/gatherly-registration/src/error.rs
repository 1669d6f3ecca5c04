use gatherly_storage::StorageError;
use thiserror::Error;

/// Errors surfaced by the registration engine.
///
/// Everything except `Aborted` and `Storage` is a terminal domain error and
/// is returned verbatim to the caller. `Aborted` means the bounded conflict
/// retries were exhausted; the request is safe to retry. Revision conflicts
/// themselves never escape the engine.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Event not found: {0}")]
    EventNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User {user_id} is already registered for event {event_id}")]
    AlreadyRegistered { event_id: String, user_id: String },

    #[error("Event {0} is full")]
    EventFull(String),

    #[error("User {user_id} is not registered for event {event_id}")]
    NotRegistered { event_id: String, user_id: String },

    #[error("Operation on event {event_id} aborted after {attempts} conflicting attempts")]
    Aborted { event_id: String, attempts: usize },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl RegistrationError {
    pub fn event_not_found(event_id: impl Into<String>) -> Self {
        Self::EventNotFound(event_id.into())
    }

    pub fn user_not_found(user_id: impl Into<String>) -> Self {
        Self::UserNotFound(user_id.into())
    }

    pub fn already_registered(event_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::AlreadyRegistered {
            event_id: event_id.into(),
            user_id: user_id.into(),
        }
    }

    pub fn event_full(event_id: impl Into<String>) -> Self {
        Self::EventFull(event_id.into())
    }

    pub fn not_registered(event_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::NotRegistered {
            event_id: event_id.into(),
            user_id: user_id.into(),
        }
    }

    pub fn aborted(event_id: impl Into<String>, attempts: usize) -> Self {
        Self::Aborted {
            event_id: event_id.into(),
            attempts,
        }
    }

    /// Returns `true` if this error wraps a storage revision conflict, i.e.
    /// the commit lost a race and the operation should be retried.
    pub fn is_revision_conflict(&self) -> bool {
        matches!(self, Self::Storage(err) if err.is_revision_conflict())
    }

    /// Returns `true` if the caller may safely retry the whole operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Aborted { .. }) || self.is_revision_conflict()
    }

    /// A stable machine-readable code for API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EventNotFound(_) => "event-not-found",
            Self::UserNotFound(_) => "user-not-found",
            Self::AlreadyRegistered { .. } => "already-registered",
            Self::EventFull(_) => "full",
            Self::NotRegistered { .. } => "not-registered",
            Self::Aborted { .. } => "aborted",
            Self::Storage(_) => "storage",
        }
    }
}

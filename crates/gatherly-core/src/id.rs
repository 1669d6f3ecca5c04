use thiserror::Error;

/// Maximum accepted length for user and event identifiers.
pub const MAX_ID_LEN: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("ID must not be empty")]
    Empty,
    #[error("ID exceeds {MAX_ID_LEN} characters")]
    TooLong,
    #[error("ID contains invalid character {0:?}")]
    InvalidChar(char),
}

/// Generates a fresh identifier for records created without a client-supplied ID.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Validates a client-supplied identifier.
///
/// Identifiers are limited to ASCII alphanumerics plus `-`, `_`, `.` and `@`
/// so they survive being embedded in URL paths and storage keys.
pub fn validate_id(id: &str) -> Result<(), IdError> {
    if id.is_empty() {
        return Err(IdError::Empty);
    }
    if id.len() > MAX_ID_LEN {
        return Err(IdError::TooLong);
    }
    match id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@')))
    {
        Some(c) => Err(IdError::InvalidChar(c)),
        None => Ok(()),
    }
}

//! Domain error type shared by every service.

use thiserror::Error;

use crate::store::StoreError;

/// Failure kinds surfaced by the rules engines. Every variant carries the
/// message shown to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Operation not allowed in the entity's current lifecycle state.
    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(what) => DomainError::Conflict(what),
            StoreError::Backend(msg) => DomainError::Storage(msg),
        }
    }
}

impl From<shared::password::PasswordError> for DomainError {
    fn from(err: shared::password::PasswordError) -> Self {
        match err {
            shared::password::PasswordError::TooShort => DomainError::Validation(err.to_string()),
            other => DomainError::Storage(other.to_string()),
        }
    }
}

use thiserror::Error;

/// Domain error taxonomy shared by every cell.
///
/// `NotFound` and `Validation` are terminal for the operation; `Conflict`
/// may be retried by the caller with a different time range; `InvalidState`
/// means the entity's current state forbids the operation. `Storage` wraps
/// infrastructure failures from a store implementation.
#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl SchedulingError {
    pub fn not_found(what: impl Into<String>) -> Self {
        SchedulingError::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        SchedulingError::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        SchedulingError::Conflict(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        SchedulingError::InvalidState(msg.into())
    }
}

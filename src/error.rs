//! Error taxonomy for the workout core and its store collaborator

use thiserror::Error;

/// Failure reported by a [`WorkoutStore`](crate::store::WorkoutStore)
#[derive(Debug, Error)]
pub enum StoreError {
    /// Requested record does not exist
    #[error("{0} not found")]
    NotFound(String),
    /// Store refused the request (limits, conflicting data)
    #[error("request rejected: {0}")]
    Rejected(String),
    /// Backend could not be reached or failed mid-request
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// Stored data could not be decoded
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => Self::NotFound("row".to_string()),
            rusqlite::Error::FromSqlConversionFailure(..) => Self::Corrupt(err.to_string()),
            _ => Self::Unavailable(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Corrupt(err.to_string())
    }
}

/// Errors raised by core session operations.
///
/// Every variant leaves local working state exactly as it was before the call.
/// The single partial-success path (a permanent edit that falls back to a
/// session-only edit) is reported through
/// [`EditOutcome`](crate::session::EditOutcome), not through this type.
#[derive(Debug, Error)]
pub enum WorkoutError {
    /// Missing or unparsable user input, rejected before any mutation
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
    /// Exercise id is not part of the working set
    #[error("exercise {0} is not in this session")]
    UnknownExercise(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WorkoutError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation { field, reason: reason.into() }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

pub type WorkoutResult<T> = Result<T, WorkoutError>;
pub type StoreResult<T> = Result<T, StoreError>;

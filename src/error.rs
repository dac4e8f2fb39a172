use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{dao::storage::StorageError, state::round_machine::InvalidTransition};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Wrong room password or action reserved to another player.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Malformed input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Duplicate PIN or nickname, late join, already-scored round, or a lost
    /// revision race. The caller may re-read the room and retry.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Submission for a round the player (or room) is not in.
    #[error("invalid round: {0}")]
    InvalidRound(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// A stored room record could not be turned back into a room.
    #[error("corrupt room record: {0}")]
    CorruptRecord(String),
    /// Operation exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::AlreadyExists { pin } => {
                ServiceError::Conflict(format!("PIN {pin} is already in use"))
            }
            StorageError::RevisionConflict {
                pin,
                expected,
                actual,
            } => ServiceError::Conflict(format!(
                "room {pin} was modified concurrently (expected revision {expected}, found {actual})"
            )),
            StorageError::Missing { pin } => ServiceError::NotFound(format!("room {pin} not found")),
            other @ StorageError::Unavailable { .. } => ServiceError::Unavailable(other),
        }
    }
}

impl From<InvalidTransition> for ServiceError {
    fn from(err: InvalidTransition) -> Self {
        ServiceError::InvalidRound(err.to_string())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::Conflict(message) => AppError::Conflict(message),
            ServiceError::InvalidRound(message) => {
                AppError::Conflict(format!("invalid round: {message}"))
            }
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::CorruptRecord(message) => AppError::Internal(message),
            ServiceError::Timeout => AppError::ServiceUnavailable("operation timed out".into()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

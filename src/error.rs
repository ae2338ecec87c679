use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::dao::storage::StorageError;

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Bearer credential missing, invalid, expired or bound to an unknown user.
    #[error("authentication failed")]
    AuthenticationFailed,
    /// Actor is not allowed to observe or mutate the match.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// Mutation payload is malformed or the status transition is illegal.
    #[error("invalid mutation: {0}")]
    InvalidMutation(String),
    /// Frame or body could not be decoded into a known request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// A collaborator call exceeded its timeout.
    #[error("operation timed out")]
    Timeout,
}

/// Error class reported to socket clients alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Handshake rejected.
    AuthenticationFailed,
    /// Access or mutation check failed.
    PermissionDenied,
    /// Malformed mutation or illegal transition.
    InvalidMutation,
    /// Undecodable request.
    InvalidRequest,
    /// Collaborator failed or timed out; safe to retry.
    Unavailable,
    /// Referenced match does not exist.
    NotFound,
}

impl ServiceError {
    /// Error class surfaced to clients.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::AuthenticationFailed => ErrorKind::AuthenticationFailed,
            ServiceError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            ServiceError::InvalidMutation(_) => ErrorKind::InvalidMutation,
            ServiceError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            ServiceError::Unavailable(_) | ServiceError::Degraded | ServiceError::Timeout => {
                ErrorKind::Unavailable
            }
            ServiceError::NotFound(_) => ErrorKind::NotFound,
        }
    }

    /// Message safe to show to the requester; backend details stay in the logs.
    pub fn client_message(&self) -> String {
        match self {
            ServiceError::Unavailable(_) | ServiceError::Degraded => {
                "service temporarily unavailable".into()
            }
            other => other.to_string(),
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::InvalidRequest(format!("validation failed: {err}"))
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
    #[error("{0}")]
    BadRequest(String),
    /// Missing or rejected credential.
    #[error("{0}")]
    Unauthorized(String),
    /// Authenticated but not allowed.
    #[error("{0}")]
    Forbidden(String),
    /// Requested resource not found.
    #[error("{0}")]
    NotFound(String),
    /// Service unavailable or degraded.
    #[error("{0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let message = err.client_message();
        match err.kind() {
            ErrorKind::AuthenticationFailed => AppError::Unauthorized(message),
            ErrorKind::PermissionDenied => AppError::Forbidden(message),
            ErrorKind::InvalidMutation | ErrorKind::InvalidRequest => AppError::BadRequest(message),
            ErrorKind::Unavailable => AppError::ServiceUnavailable(message),
            ErrorKind::NotFound => AppError::NotFound(message),
        }
    }
}

/// JSON body of every REST error response.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    /// Human readable description.
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

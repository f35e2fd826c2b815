//! Mapping of store and payload failures onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chamados_core::ValidationError;
use chamados_storage::StorageError;

use super::json_error;

/// Fixed message for every missing-ticket response.
pub(crate) const TICKET_NOT_FOUND: &str = "Ticket not found";

/// A request that could not be served.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ApiError {
    /// Malformed JSON or a payload that fails validation.
    #[error("{0}")]
    BadRequest(String),

    #[error("{}", TICKET_NOT_FOUND)]
    NotFound,

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::TicketNotFound { .. } => ApiError::NotFound,
            StorageError::NotFinalized { .. }
            | StorageError::UsernameTaken { .. }
            | StorageError::Invalid(_) => ApiError::BadRequest(err.to_string()),
            StorageError::Backend(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        json_error(status, &self.to_string()).into_response()
    }
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Request-level error taxonomy.
///
/// Every variant maps to a JSON `{ "message": ... }` body. Validation and
/// conflict failures carry the specific user-visible reason; internal
/// failures carry a generic per-operation message while the underlying
/// error is logged server-side only.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    /// Duplicate name or quota exhaustion. Reported to clients the same way
    /// as validation failures: 400 with the specific reason.
    #[error("{0}")]
    Conflict(String),

    /// Record absent, or present but owned by someone else. The two cases
    /// are intentionally indistinguishable in responses.
    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Internal {
        message: String,
        cause: anyhow::Error,
    },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Wraps an unexpected failure. `message` is what the client sees;
    /// `cause` only ever reaches the server log.
    pub fn internal(message: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            message: message.into(),
            cause: cause.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Validation(_) | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal { message, cause } = &self {
            error!("{}: {:#}", message, cause);
        }

        let body = Json(json!({ "message": self.to_string() }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_surface_their_reason() {
        let err = ApiError::validation("File size exceeds 50MB limit");
        assert_eq!(err.to_string(), "File size exceeds 50MB limit");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn conflicts_report_as_bad_requests() {
        let err = ApiError::conflict("A dataset with this name already exists");
        assert_eq!(err.to_string(), "A dataset with this name already exists");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_errors_hide_the_source_from_clients() {
        let err = ApiError::internal(
            "Failed to create dataset",
            anyhow::anyhow!("connection reset by peer"),
        );
        assert_eq!(err.to_string(), "Failed to create dataset");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

// Common DTOs and error mapping for the public API
//
// Every error leaves the server as `{"detail": "<message>"}`.
// Decision: Body and query extractors are wrapped in WithRejection so malformed input is a 400 detail too

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use swag_core::EventError;
use utoipa::ToSchema;

/// Standard error response for API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message describing what went wrong.
    pub detail: String,
}

impl ErrorResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Acknowledgement of an operation that has no resource to return.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusMessage {
    #[schema(example = "User is now attending the event")]
    pub message: String,
}

impl StatusMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error returned by handlers and extractors
#[derive(Debug)]
pub struct ApiError(pub EventError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            EventError::NotFound(_) => StatusCode::NOT_FOUND,
            EventError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            EventError::Forbidden(_) => StatusCode::FORBIDDEN,
            EventError::InvalidRequest(_) | EventError::Upstream(_) => StatusCode::BAD_REQUEST,
            EventError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<EventError> for ApiError {
    fn from(err: EventError) -> Self {
        Self(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self(EventError::Internal(err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(EventError::invalid(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(EventError::invalid(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self.0 {
            EventError::Internal(e) => {
                tracing::error!(error = %e, "Internal error");
                "Internal server error".to_string()
            }
            EventError::Upstream(e) => {
                tracing::warn!(error = %e, "Upstream failure");
                "Upstream request failed".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorResponse::new(detail))).into_response()
    }
}

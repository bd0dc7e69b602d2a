// Error types for event operations

use thiserror::Error;

/// Result type alias for event operations
pub type Result<T> = std::result::Result<T, EventError>;

/// Errors that can occur while reading or mutating events
#[derive(Debug, Error)]
pub enum EventError {
    /// Referenced event or user does not exist
    #[error("{0}")]
    NotFound(String),

    /// Missing or invalid credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed to perform the operation
    #[error("{0}")]
    Forbidden(String),

    /// Malformed id prefix, forbidden field edits, attempts to write official events
    #[error("{0}")]
    InvalidRequest(String),

    /// Third-party API answered with a non-success status or malformed payload
    #[error("Upstream request failed: {0}")]
    Upstream(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl EventError {
    /// Create a not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        EventError::NotFound(msg.into())
    }

    /// Create an unauthorized error
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        EventError::Unauthorized(msg.into())
    }

    /// Create a forbidden error
    pub fn forbidden(msg: impl Into<String>) -> Self {
        EventError::Forbidden(msg.into())
    }

    /// Create an invalid-request error
    pub fn invalid(msg: impl Into<String>) -> Self {
        EventError::InvalidRequest(msg.into())
    }

    /// Create an upstream error
    pub fn upstream(msg: impl Into<String>) -> Self {
        EventError::Upstream(msg.into())
    }

    /// Short machine-readable kind, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            EventError::NotFound(_) => "not_found",
            EventError::Unauthorized(_) => "unauthorized",
            EventError::Forbidden(_) => "forbidden",
            EventError::InvalidRequest(_) => "invalid_request",
            EventError::Upstream(_) => "upstream",
            EventError::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_constructors() {
        assert!(matches!(EventError::not_found("x"), EventError::NotFound(m) if m == "x"));
        assert!(matches!(EventError::invalid("bad"), EventError::InvalidRequest(_)));
        assert_eq!(EventError::forbidden("no").kind(), "forbidden");
    }

    #[test]
    fn test_internal_from_anyhow() {
        let err: EventError = anyhow::anyhow!("db down").into();
        assert_eq!(err.kind(), "internal");
        assert!(err.to_string().contains("db down"));
    }
}

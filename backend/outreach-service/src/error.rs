use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OutreachError>;

#[derive(Debug, Error)]
pub enum OutreachError {
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid display name: {0}")]
    InvalidDisplayName(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Email identity already exists for this user")]
    IdentityAlreadyExists,

    #[error("Email identity must be set up before sending")]
    IdentityRequired,

    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl OutreachError {
    /// Local validation failures never reached the network.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            OutreachError::InvalidUsername(_)
                | OutreachError::InvalidDisplayName(_)
                | OutreachError::InvalidRecipient(_)
                | OutreachError::Validation(_)
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            OutreachError::UsernameTaken | OutreachError::IdentityAlreadyExists
        )
    }

    /// Remote failures the caller may retry without re-entering input
    pub fn is_retryable(&self) -> bool {
        matches!(self, OutreachError::Upstream(_) | OutreachError::Transport(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            OutreachError::InvalidUsername(_)
            | OutreachError::InvalidDisplayName(_)
            | OutreachError::InvalidRecipient(_)
            | OutreachError::Validation(_) => StatusCode::BAD_REQUEST,
            OutreachError::UsernameTaken | OutreachError::IdentityAlreadyExists => {
                StatusCode::CONFLICT
            }
            OutreachError::IdentityRequired => StatusCode::PRECONDITION_FAILED,
            OutreachError::Unauthenticated => StatusCode::UNAUTHORIZED,
            OutreachError::Upstream(_) | OutreachError::Transport(_) => StatusCode::BAD_GATEWAY,
            OutreachError::Configuration(_) | OutreachError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable code for API clients
    pub fn code(&self) -> &'static str {
        match self {
            OutreachError::InvalidUsername(_) => "invalid_username",
            OutreachError::InvalidDisplayName(_) => "invalid_display_name",
            OutreachError::InvalidRecipient(_) => "invalid_recipient",
            OutreachError::Validation(_) => "validation_error",
            OutreachError::UsernameTaken => "username_taken",
            OutreachError::IdentityAlreadyExists => "identity_exists",
            OutreachError::IdentityRequired => "identity_required",
            OutreachError::Unauthenticated => "unauthenticated",
            OutreachError::Upstream(_) => "upstream_error",
            OutreachError::Transport(_) => "transport_error",
            OutreachError::Configuration(_) | OutreachError::Internal(_) => "internal_error",
        }
    }

    fn public_message(&self) -> String {
        match self {
            OutreachError::Configuration(_) | OutreachError::Internal(_) => {
                // Don't leak internal details
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for OutreachError {
    fn into_response(self) -> Response {
        if matches!(
            self,
            OutreachError::Configuration(_) | OutreachError::Internal(_)
        ) {
            tracing::error!(error = %self, "Request failed with internal error");
        }

        let body = ErrorBody {
            error: self.code(),
            message: self.public_message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<reqwest::Error> for OutreachError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("HTTP client error: {}", err);
        OutreachError::Upstream(err.to_string())
    }
}

impl From<serde_json::Error> for OutreachError {
    fn from(err: serde_json::Error) -> Self {
        OutreachError::Internal(format!("JSON error: {}", err))
    }
}

impl From<validator::ValidationErrors> for OutreachError {
    fn from(err: validator::ValidationErrors) -> Self {
        OutreachError::Validation(err.to_string())
    }
}

impl From<lettre::error::Error> for OutreachError {
    fn from(err: lettre::error::Error) -> Self {
        OutreachError::Transport(format!("Failed to build email message: {}", err))
    }
}

impl From<lettre::address::AddressError> for OutreachError {
    fn from(err: lettre::address::AddressError) -> Self {
        OutreachError::InvalidRecipient(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicts_map_to_409() {
        assert_eq!(OutreachError::UsernameTaken.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            OutreachError::IdentityAlreadyExists.status_code(),
            StatusCode::CONFLICT
        );
        assert!(OutreachError::UsernameTaken.is_conflict());
        assert!(!OutreachError::UsernameTaken.is_retryable());
    }

    #[test]
    fn test_taken_is_distinct_from_upstream_failure() {
        let upstream = OutreachError::Upstream("connection refused".into());
        assert!(upstream.is_retryable());
        assert!(!upstream.is_conflict());
        assert_ne!(upstream.code(), OutreachError::UsernameTaken.code());
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = OutreachError::Internal("db password=hunter2".into());
        assert_eq!(err.public_message(), "Internal server error");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_validation_classification() {
        assert!(OutreachError::InvalidUsername("too short".into()).is_validation());
        assert!(OutreachError::Validation("subject is empty".into()).is_validation());
        assert!(!OutreachError::IdentityRequired.is_validation());
    }
}

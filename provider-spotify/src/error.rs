//! Error types for the catalog fetcher

use bridge_traits::error::BridgeError;
use core_auth::AuthError;
use thiserror::Error;

/// Catalog fetcher errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// No response was received
    #[error("Network error: {0}")]
    Transport(String),

    /// The service answered with a non-2xx status
    #[error("Catalog API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// A 2xx body that matched neither the expected shape nor an error envelope
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The session could not be kept authenticated
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Endpoint URL could not be built from the configured base
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),
}

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// Message shown to the user for an HTTP status.
pub fn status_message(status: u16) -> &'static str {
    match status {
        400 => "The request could not be understood, please try again",
        401 => "The session has expired",
        403 => "The content you are trying to see is not available",
        404 => "The requested resource could not be found",
        429 => "The server received too many requests",
        500 => "The server is experiencing some issues, please try again later",
        502 => "The server proxy received an invalid response",
        503 => "All services are currently unavailable, please try again later",
        _ => "The server is unavailable, please try again later",
    }
}

impl ApiError {
    /// Build an API error whose message comes from the status table.
    pub fn from_status(status: u16) -> Self {
        ApiError::Api {
            status,
            message: status_message(status).to_string(),
        }
    }

    /// Text for an `{is_error, message}` response.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Api { message, .. } => message.clone(),
            ApiError::Auth(_) => status_message(401).to_string(),
            ApiError::Transport(_) => {
                "The network connection failed, please try again".to_string()
            }
            ApiError::Decode(_) | ApiError::InvalidUrl(_) => {
                "The server sent an unexpected response, please try again".to_string()
            }
        }
    }

    /// The user has to sign in again before retrying.
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::Auth(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            ApiError::Auth(_) => Some(401),
            _ => None,
        }
    }
}

impl From<BridgeError> for ApiError {
    fn from(error: BridgeError) -> Self {
        ApiError::Transport(error.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Network(message) => ApiError::Transport(message),
            other => ApiError::Auth(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_table() {
        assert_eq!(
            ApiError::from_status(404).user_message(),
            "The requested resource could not be found"
        );
        assert_eq!(status_message(418), status_message(599));
        assert_ne!(status_message(500), status_message(503));
    }

    #[test]
    fn test_error_display() {
        let error = ApiError::from_status(429);
        assert_eq!(
            error.to_string(),
            "Catalog API error (status 429): The server received too many requests"
        );
        assert_eq!(error.status(), Some(429));
    }

    #[test]
    fn test_auth_conversion() {
        let error: ApiError = AuthError::RefreshRejected {
            status: 400,
            message: "invalid_grant".to_string(),
        }
        .into();
        assert!(error.requires_login());
        assert_eq!(error.user_message(), "The session has expired");

        let error: ApiError = AuthError::Network("timed out".to_string()).into();
        assert!(matches!(error, ApiError::Transport(_)));
        assert!(!error.requires_login());
    }
}

use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Invalid authorization callback: {0}")]
    InvalidCallback(String),

    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    #[error("Authorization state does not match the pending request")]
    StateMismatch,

    #[error("Token exchange failed ({status}): {message}")]
    ExchangeFailed { status: u16, message: String },

    #[error("Refresh token rejected ({status}): {message}")]
    RefreshRejected { status: u16, message: String },

    #[error("Invalid token response: {0}")]
    InvalidTokenResponse(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Secure storage unavailable: {0}")]
    SecureStorageUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AuthError {
    /// The session cannot continue and the user must authorize again.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            AuthError::NotAuthenticated | AuthError::RefreshRejected { .. }
        )
    }
}

impl From<BridgeError> for AuthError {
    fn from(e: BridgeError) -> Self {
        match e {
            BridgeError::Storage(msg) => AuthError::SecureStorageUnavailable(msg),
            other => AuthError::Network(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;

use core_library::LibraryError;
use provider_spotify::ApiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Library(#[from] LibraryError),

    /// Entity has neither cached bytes nor a URL to download them from
    #[error("No {0} available")]
    Unavailable(&'static str),
}

impl SyncError {
    /// Text for the `message` field of an error response.
    pub fn user_message(&self) -> String {
        match self {
            SyncError::Api(err) => err.user_message(),
            SyncError::Library(err) if err.is_contract_violation() => {
                format!("Internal error: {}", err)
            }
            SyncError::Library(_) => "The local cache could not be read".to_string(),
            SyncError::Unavailable(_) => self.to_string(),
        }
    }

    /// Store misuse by a coordinator. Never retried.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, SyncError::Library(err) if err.is_contract_violation())
    }

    pub fn requires_login(&self) -> bool {
        matches!(self, SyncError::Api(err) if err.requires_login())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

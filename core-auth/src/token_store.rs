//! Secure Token Storage
//!
//! Persists the session's access and refresh tokens in the platform secure
//! store so a relaunch can resume without the login screen.
//!
//! Each token lives under its own key (`accessToken`, `refreshToken`). A
//! session is restorable only when both are present.
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{Credentials, TokenStore};
//! use std::sync::Arc;
//! # use bridge_traits::storage::SecureStore;
//! # async fn example(secure_store: Arc<dyn SecureStore>) -> core_auth::Result<()> {
//! let token_store = TokenStore::new(secure_store);
//! token_store.save(&Credentials::new("access", "refresh")).await?;
//! let restored = token_store.load().await?;
//! token_store.clear().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use crate::types::Credentials;
use bridge_traits::storage::SecureStore;
use std::sync::Arc;
use tracing::{debug, warn};

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Token persistence over a [`SecureStore`].
///
/// Token values are never logged.
#[derive(Clone)]
pub struct TokenStore {
    secure_store: Arc<dyn SecureStore>,
}

impl TokenStore {
    pub fn new(secure_store: Arc<dyn SecureStore>) -> Self {
        Self { secure_store }
    }

    /// Persist both tokens.
    pub async fn save(&self, credentials: &Credentials) -> Result<()> {
        self.secure_store
            .set_string(ACCESS_TOKEN_KEY, &credentials.access_token)
            .await?;
        self.secure_store
            .set_string(REFRESH_TOKEN_KEY, &credentials.refresh_token)
            .await?;
        debug!("Stored session tokens");
        Ok(())
    }

    /// Replace only the access token. The refresh token is long-lived.
    pub async fn save_access_token(&self, access_token: &str) -> Result<()> {
        self.secure_store
            .set_string(ACCESS_TOKEN_KEY, access_token)
            .await?;
        debug!("Stored refreshed access token");
        Ok(())
    }

    /// Load persisted tokens. A half-written pair counts as no session.
    pub async fn load(&self) -> Result<Option<Credentials>> {
        let access = self.secure_store.get_string(ACCESS_TOKEN_KEY).await?;
        let refresh = self.secure_store.get_string(REFRESH_TOKEN_KEY).await?;

        match (access, refresh) {
            (Some(access_token), Some(refresh_token)) => {
                Ok(Some(Credentials::new(access_token, refresh_token)))
            }
            (None, None) => Ok(None),
            _ => {
                warn!("Found incomplete token pair in secure store; ignoring it");
                Ok(None)
            }
        }
    }

    /// Remove both tokens.
    pub async fn clear(&self) -> Result<()> {
        self.secure_store.delete_secret(ACCESS_TOKEN_KEY).await?;
        self.secure_store.delete_secret(REFRESH_TOKEN_KEY).await?;
        debug!("Cleared session tokens");
        Ok(())
    }
}

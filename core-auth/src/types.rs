//! Session types
//!
//! Tokens are held in memory by the session manager and mirrored to the
//! secure store. Their `Debug` output is redacted so they never reach a log.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the session currently stands.
///
/// ```text
/// Unauthenticated ──(code exchanged)──> Authenticated
/// Authenticated ──(401)──> Refreshing ──(ok)──> Authenticated
/// Refreshing ──(refresh rejected)──> Unauthenticated
/// Authenticated ──(logout)──> Unauthenticated
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    Refreshing,
}

impl SessionState {
    /// Tokens are present, including while a refresh is running.
    pub fn has_tokens(&self) -> bool {
        !matches!(self, SessionState::Unauthenticated)
    }
}

/// Access and refresh token pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// An access token handed to a request, tagged with the refresh generation
/// it was issued in.
///
/// A caller that receives a 401 passes its lease back to
/// [`SessionManager::refresh_after_unauthorized`](crate::SessionManager::refresh_after_unauthorized).
/// If another caller already refreshed, the generation differs and the newer
/// token is returned without a second refresh call.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenLease {
    token: String,
    generation: u64,
}

impl TokenLease {
    pub(crate) fn new(token: String, generation: u64) -> Self {
        Self { token, generation }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Debug for TokenLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenLease")
            .field("token", &"[REDACTED]")
            .field("generation", &self.generation)
            .finish()
    }
}

/// Token endpoint payload.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("expires_in", &self.expires_in)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

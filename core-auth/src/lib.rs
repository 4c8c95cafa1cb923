//! # Session Module
//!
//! Owns the user's access and refresh tokens for the streaming API.
//!
//! ## Overview
//!
//! - Authorization-code flow with a custom-scheme redirect
//! - Token exchange and refresh with HTTP Basic client credentials
//! - Single-flight refresh shared by every request that hits a 401
//! - Token persistence in the platform secure store
//! - Session events on the shared [`EventBus`](core_runtime::EventBus)

pub mod error;
pub mod manager;
pub mod oauth;
pub mod token_store;
pub mod types;

pub use error::{AuthError, Result};
pub use manager::SessionManager;
pub use oauth::{AuthorizationCallback, AuthorizationState, OAuthClient, OAuthConfig};
pub use token_store::TokenStore;
pub use types::{Credentials, SessionState, TokenLease, TokenResponse};
